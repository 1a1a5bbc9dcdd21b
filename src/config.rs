//! YAML configuration for the slideshow window.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::Error;
use crate::scan::ScanOptions;

/// Period used when the configuration does not name one.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(2000);

/// Longest accepted slideshow period.
pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Root directory indexed as the image collection.
    pub photo_library_path: PathBuf,
    /// Delay before the first tick and between ticks while running.
    #[serde(with = "humantime_serde")]
    pub slideshow_interval: Duration,
    /// Whether to descend into subdirectories of the library.
    pub recursive: bool,
    /// Optional recursion limit. `None` or `Some(0)` means unlimited.
    pub max_depth: Option<usize>,
    /// Optional override for accepted extensions (case-insensitive, no dot).
    pub extensions: Option<Vec<String>>,
    /// Open the window borderless-fullscreen on the current monitor.
    pub fullscreen: bool,
    pub window_title: String,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let s = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&s)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Configuration for a bare library path, as used when no file is given.
    #[must_use]
    pub fn for_library(path: impl Into<PathBuf>) -> Self {
        Self {
            photo_library_path: path.into(),
            ..Self::default()
        }
    }

    /// Apply command-line overrides on top of file values.
    #[must_use]
    pub fn with_overrides(mut self, library: Option<PathBuf>, interval: Option<Duration>) -> Self {
        if let Some(library) = library {
            self.photo_library_path = library;
        }
        if let Some(interval) = interval {
            self.slideshow_interval = interval;
        }
        self
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self, Error> {
        if self.photo_library_path.as_os_str().is_empty() {
            return Err(Error::Invalid("photo-library-path must be set".into()));
        }
        if self.slideshow_interval.is_zero() {
            return Err(Error::Invalid(
                "slideshow-interval must be greater than zero".into(),
            ));
        }
        if self.slideshow_interval > MAX_INTERVAL {
            return Err(Error::Invalid(format!(
                "slideshow-interval must be at most {}",
                humantime::format_duration(MAX_INTERVAL)
            )));
        }
        if self.extensions.as_ref().is_some_and(Vec::is_empty) {
            return Err(Error::Invalid("extensions must not be empty".into()));
        }
        Ok(self)
    }

    #[must_use]
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            recursive: self.recursive,
            max_depth: self.max_depth,
            exts: self
                .extensions
                .as_ref()
                .map(|exts| exts.iter().map(|e| e.to_ascii_lowercase()).collect()),
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            photo_library_path: PathBuf::new(),
            slideshow_interval: DEFAULT_INTERVAL,
            recursive: true,
            max_depth: None,
            extensions: None,
            fullscreen: false,
            window_title: "Auto Slideshow".to_string(),
        }
    }
}
