//! Storage-read capability for the photo library.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use tracing::{debug, info, warn};

use crate::events::{Dispatcher, PermissionOutcome, UiEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionState {
    #[default]
    Unknown,
    Granted,
    Denied,
}

impl From<PermissionOutcome> for PermissionState {
    fn from(outcome: PermissionOutcome) -> Self {
        match outcome {
            PermissionOutcome::Granted => Self::Granted,
            PermissionOutcome::Denied => Self::Denied,
        }
    }
}

/// Boundary to the host's read-permission subsystem.
pub trait PermissionGate {
    /// Current grant status; cheap enough to call on every command.
    fn check(&self) -> bool;

    /// Start the consent flow. The outcome is posted to `dispatcher` as
    /// [`UiEvent::Permission`], never returned inline.
    fn request(&self, dispatcher: Arc<dyn Dispatcher>);
}

/// Grants access when the library directory can be listed.
#[derive(Debug, Clone)]
pub struct DirectoryAccess {
    root: PathBuf,
}

impl DirectoryAccess {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

fn probe(root: &Path) -> bool {
    match fs::read_dir(root) {
        Ok(_) => true,
        Err(err) => {
            debug!(root = %root.display(), error = %err, "library not readable");
            false
        }
    }
}

fn outcome_for(root: &Path) -> PermissionOutcome {
    if probe(root) {
        PermissionOutcome::Granted
    } else {
        PermissionOutcome::Denied
    }
}

fn post_outcome(dispatcher: &dyn Dispatcher, outcome: PermissionOutcome) -> bool {
    let delivered = dispatcher.post(UiEvent::Permission(outcome));
    if !delivered {
        debug!(?outcome, "permission result dropped; ui gone");
    }
    delivered
}

impl PermissionGate for DirectoryAccess {
    fn check(&self) -> bool {
        probe(&self.root)
    }

    fn request(&self, dispatcher: Arc<dyn Dispatcher>) {
        info!(root = %self.root.display(), "requesting read access to photo library");
        let root = self.root.clone();
        let spawned = thread::Builder::new()
            .name("permission-probe".into())
            .spawn({
                let dispatcher = Arc::clone(&dispatcher);
                move || {
                    post_outcome(dispatcher.as_ref(), outcome_for(&root));
                }
            });
        if let Err(err) = spawned {
            warn!(error = %err, "failed to spawn permission probe; answering inline");
            post_outcome(dispatcher.as_ref(), outcome_for(&self.root));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn existing_directory_is_granted() {
        let tmp = tempfile::tempdir().unwrap();
        let gate = DirectoryAccess::new(tmp.path());
        assert!(gate.check());

        let (tx, rx) = crossbeam_channel::unbounded::<UiEvent>();
        gate.request(Arc::new(tx));
        let ev = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(ev, UiEvent::Permission(PermissionOutcome::Granted));
    }

    #[test]
    fn missing_directory_is_denied() {
        let tmp = tempfile::tempdir().unwrap();
        let gate = DirectoryAccess::new(tmp.path().join("gone"));
        assert!(!gate.check());

        let (tx, rx) = crossbeam_channel::unbounded::<UiEvent>();
        gate.request(Arc::new(tx));
        let ev = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(ev, UiEvent::Permission(PermissionOutcome::Denied));
    }

    #[test]
    fn outcome_posting_reports_a_vanished_ui() {
        let (tx, rx) = crossbeam_channel::unbounded::<UiEvent>();
        assert!(post_outcome(&tx, PermissionOutcome::Granted));
        assert_eq!(
            rx.try_recv().unwrap(),
            UiEvent::Permission(PermissionOutcome::Granted)
        );

        drop(rx);
        assert!(!post_outcome(&tx, PermissionOutcome::Denied));
    }
}
