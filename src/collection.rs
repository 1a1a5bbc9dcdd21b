//! Cursor over an opened image collection.

use tracing::{debug, warn};

use crate::events::ImageEntry;
use crate::scan::MediaStore;

/// An ordered result set with a movable cursor.
///
/// A freshly opened collection is positioned before the first entry. Moves
/// return `false` and leave the cursor where it was when no such position
/// exists.
#[derive(Debug, Clone)]
pub struct ImageCollection {
    items: Vec<ImageEntry>,
    pos: Option<usize>,
}

impl ImageCollection {
    #[must_use]
    pub fn from_vec(items: Vec<ImageEntry>) -> Self {
        Self { items, pos: None }
    }

    /// Number of entries contained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Current cursor position; `None` before the first move.
    #[must_use]
    pub const fn position(&self) -> Option<usize> {
        self.pos
    }

    /// Entry under the cursor.
    #[must_use]
    pub fn current(&self) -> Option<&ImageEntry> {
        self.pos.and_then(|i| self.items.get(i))
    }

    pub fn move_to_first(&mut self) -> bool {
        self.move_to(0)
    }

    pub fn move_to_last(&mut self) -> bool {
        match self.items.len() {
            0 => false,
            n => self.move_to(n - 1),
        }
    }

    pub fn move_to_next(&mut self) -> bool {
        let target = self.pos.map_or(0, |i| i + 1);
        self.move_to(target)
    }

    pub fn move_to_previous(&mut self) -> bool {
        match self.pos {
            Some(i) if i > 0 => self.move_to(i - 1),
            _ => false,
        }
    }

    fn move_to(&mut self, idx: usize) -> bool {
        if idx < self.items.len() {
            self.pos = Some(idx);
            true
        } else {
            false
        }
    }
}

/// Query `store` and wrap the result in a cursor.
///
/// An inaccessible store yields `None`; callers guard positional operations.
pub fn open_collection<S: MediaStore + ?Sized>(store: &S) -> Option<ImageCollection> {
    match store.query() {
        Ok(items) => {
            debug!(count = items.len(), "collection opened");
            Some(ImageCollection::from_vec(items))
        }
        Err(err) => {
            warn!(error = %err, "media store query failed; collection unavailable");
            None
        }
    }
}

/// Release the handle. Safe to call on an already closed handle.
pub fn close_collection(handle: &mut Option<ImageCollection>) {
    if let Some(closed) = handle.take() {
        debug!(count = closed.len(), "collection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> ImageCollection {
        ImageCollection::from_vec(vec![
            ImageEntry::new(0, "a.jpg"),
            ImageEntry::new(1, "b.jpg"),
            ImageEntry::new(2, "c.jpg"),
        ])
    }

    #[test]
    fn fresh_cursor_sits_before_first() {
        let mut c = abc();
        assert_eq!(c.position(), None);
        assert!(c.current().is_none());
        assert!(!c.move_to_previous());
        assert!(c.move_to_next());
        assert_eq!(c.position(), Some(0));
    }

    #[test]
    fn moves_stop_at_the_ends() {
        let mut c = abc();
        assert!(c.move_to_last());
        assert!(!c.move_to_next());
        assert_eq!(c.position(), Some(2));
        assert!(c.move_to_first());
        assert!(!c.move_to_previous());
        assert_eq!(c.current().map(|e| e.id), Some(0));
    }

    #[test]
    fn empty_collection_refuses_every_move() {
        let mut c = ImageCollection::from_vec(Vec::new());
        assert!(!c.move_to_first());
        assert!(!c.move_to_last());
        assert!(!c.move_to_next());
        assert!(!c.move_to_previous());
        assert!(c.current().is_none());
    }

    #[test]
    fn close_is_idempotent() {
        let mut handle = Some(abc());
        close_collection(&mut handle);
        assert!(handle.is_none());
        close_collection(&mut handle);
        assert!(handle.is_none());
    }
}
