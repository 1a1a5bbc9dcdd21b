use std::path::{Path, PathBuf};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_encode};

/// Bytes left as-is in a `file://` path; everything else is escaped.
const URI_PATH: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// One image reference from the media store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    pub id: u64,
    pub path: PathBuf,
}

impl ImageEntry {
    pub fn new(id: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            path: path.into(),
        }
    }

    /// `file://` URI used as the display reference for this entry.
    #[must_use]
    pub fn display_uri(&self) -> String {
        file_uri(&self.path)
    }

    /// Short name for titles and logs.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map_or_else(|| self.path.display().to_string(), |n| n.to_string_lossy().into_owned())
    }
}

fn file_uri(path: &Path) -> String {
    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };
    let bytes = abs.as_os_str().as_encoded_bytes();
    let root = if bytes.first() == Some(&b'/') { "" } else { "/" };
    format!("file://{root}{}", percent_encode(bytes, URI_PATH))
}

/// User commands coming from the screen's three controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    Toggle,
}

/// Result of a consent request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionOutcome {
    Granted,
    Denied,
}

/// One firing of a slideshow timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Generation of the timer that produced this tick.
    pub generation: u64,
    /// 1-based count of ticks from that timer.
    pub seq: u64,
}

/// Events produced off the UI thread and handled on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    Tick(Tick),
    Permission(PermissionOutcome),
}

/// Hands events from background threads to the UI thread.
///
/// `post` returns `false` once the UI side is gone; producers stop then.
pub trait Dispatcher: Send + Sync + 'static {
    fn post(&self, event: UiEvent) -> bool;
}

impl Dispatcher for crossbeam_channel::Sender<UiEvent> {
    fn post(&self, event: UiEvent) -> bool {
        self.send(event).is_ok()
    }
}
