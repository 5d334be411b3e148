//! # Snapshot Cell
//!
//! The render side publishes immutable snapshots; readers clone an `Arc` and
//! never see engine memory directly.

use std::sync::Arc;

use parking_lot::RwLock;

/// Latest-value cell for immutable snapshots.
///
/// The write lock is held only for a pointer swap.
pub struct SnapshotCell<T> {
    current: RwLock<Arc<T>>,
}

impl<T> SnapshotCell<T> {
    /// Creates a cell holding `initial`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self { current: RwLock::new(Arc::new(initial)) }
    }

    /// Replaces the published snapshot.
    pub fn publish(&self, snapshot: T) {
        let next = Arc::new(snapshot);
        *self.current.write() = next;
    }

    /// Returns the most recent snapshot.
    #[must_use]
    pub fn latest(&self) -> Arc<T> {
        Arc::clone(&self.current.read())
    }
}

impl<T: Default> Default for SnapshotCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
