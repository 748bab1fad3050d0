use crate::errors::DbError;
use crate::index::IndexManager;
use crate::storage::StorageEngine;
use crate::types::CollectionName;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::store::DocStore;

/// Shared handle to the engine's storage.
pub type SharedStorage = Arc<RwLock<Box<dyn StorageEngine>>>;

/// A named set of documents with its secondary indexes.
///
/// Lock order is `write_lock`, then `store`, then `indexes`; `storage` is taken last and
/// only for the duration of one append. Once dropped, a collection rejects every write, so
/// handles that outlive the drop cannot append to the log.
pub struct Collection {
    pub name: CollectionName,
    pub(crate) store: RwLock<DocStore>,
    pub indexes: RwLock<IndexManager>,
    pub(crate) storage: SharedStorage,
    /// Serializes find-then-modify operations (`update_one`, `delete_many`, ...).
    pub(crate) write_lock: Mutex<()>,
    dropped: AtomicBool,
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection").field("name", &self.name).field("len", &self.len()).finish()
    }
}

impl Collection {
    pub fn new(name: impl Into<CollectionName>, storage: SharedStorage) -> Self {
        Self {
            name: name.into(),
            store: RwLock::new(DocStore::new()),
            indexes: RwLock::new(IndexManager::new()),
            storage,
            write_lock: Mutex::new(()),
            dropped: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn name_str(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.read().is_empty()
    }

    #[must_use]
    pub fn is_dropped(&self) -> bool {
        self.dropped.load(Ordering::Acquire)
    }

    /// Callers hold the `store` write lock so no write is between its check and its append.
    pub(crate) fn mark_dropped(&self) {
        self.dropped.store(true, Ordering::Release);
    }

    /// # Errors
    /// Returns `DbError::NoSuchCollection` once the collection has been dropped.
    pub(crate) fn ensure_live(&self) -> Result<(), DbError> {
        if self.is_dropped() {
            return Err(DbError::NoSuchCollection(self.name.clone()));
        }
        Ok(())
    }
}
