//! Media index over a photo library directory.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::error::Error;
use crate::events::ImageEntry;

const DEFAULT_EXTS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "tif", "tiff"];

/// Options controlling directory scanning.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional maximum recursion depth. `None` or `Some(0)` means unlimited.
    pub max_depth: Option<usize>,
    /// Optional override for allowed extensions (lowercase, without dot).
    pub exts: Option<Vec<String>>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            max_depth: None,
            exts: None,
        }
    }
}

/// Read-only query over an image index.
///
/// Order is whatever the store yields and must stay stable for the life of
/// one collection.
pub trait MediaStore {
    fn query(&self) -> Result<Vec<ImageEntry>, Error>;
}

/// [`MediaStore`] backed by a directory walk.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
    opts: ScanOptions,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>, opts: ScanOptions) -> Self {
        Self {
            root: root.into(),
            opts,
        }
    }
}

impl MediaStore for DirectoryStore {
    fn query(&self) -> Result<Vec<ImageEntry>, Error> {
        let paths = scan_with_options(&self.root, &self.opts)?;
        debug!(root = %self.root.display(), count = paths.len(), "media index query");
        Ok(paths
            .into_iter()
            .zip(0u64..)
            .map(|(path, id)| ImageEntry::new(id, path))
            .collect())
    }
}

/// Return `true` if `path` has an allowed image extension.
#[must_use]
pub fn is_supported_image(path: &Path, exts: Option<&[String]>) -> bool {
    let Some(ext) = path
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_ascii_lowercase)
    else {
        return false;
    };
    match exts {
        Some(exts) => exts.iter().any(|e| *e == ext),
        None => DEFAULT_EXTS.contains(&ext.as_str()),
    }
}

/// Scan `root` for images using the provided options.
///
/// Entries within a directory are visited in file-name order.
///
/// # Errors
/// Returns [`Error::BadDir`] if `root` is missing or not a directory.
pub fn scan_with_options(root: &Path, opts: &ScanOptions) -> Result<Vec<PathBuf>, Error> {
    if !root.is_dir() {
        return Err(Error::BadDir(root.display().to_string()));
    }

    let mut wd = WalkDir::new(root).sort_by_file_name();
    if !opts.recursive {
        wd = wd.max_depth(1);
    } else if let Some(d) = opts.max_depth
        && d > 0
    {
        wd = wd.max_depth(d);
    }

    let mut out = Vec::new();
    for entry in wd
        .into_iter()
        .filter_entry(|e| !should_skip_dir(e))
        .flatten()
    {
        let path = entry.path();
        if path.is_file() && is_supported_image(path, opts.exts.as_deref()) {
            out.push(path.to_path_buf());
        }
    }

    Ok(out)
}

fn should_skip_dir(entry: &DirEntry) -> bool {
    // Never skip the root; tempfile roots can be dot-dirs.
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .is_some_and(|n| n.starts_with('.'))
}
