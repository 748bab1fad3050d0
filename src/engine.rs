use crate::collection::{Collection, SharedStorage};
use crate::errors::DbError;
use crate::storage::{MemoryStorage, StorageEngine, WalStorage};
use crate::types::{CollectionName, Operation};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Owns the collections and the operation log they write through.
pub struct Engine {
    storage: SharedStorage,
    collections: RwLock<HashMap<CollectionName, Arc<Collection>>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("storage", &self.storage.read().describe())
            .field("collections", &self.list_collection_names())
            .finish()
    }
}

impl Engine {
    /// Wrap `storage` and rebuild every collection by replaying its log.
    ///
    /// # Errors
    /// Returns an error if the log cannot be read or an index in it cannot be rebuilt.
    pub fn new(storage: Box<dyn StorageEngine>) -> Result<Self, DbError> {
        let ops = storage.read_all()?;
        let engine = Self { storage: Arc::new(RwLock::new(storage)), collections: RwLock::new(HashMap::new()) };
        let replayed = ops.len();
        for op in &ops {
            engine.replay(op)?;
        }
        if replayed > 0 {
            log::info!(
                "replayed {replayed} operations from {} into {} collections",
                engine.storage.read().describe(),
                engine.collections.read().len()
            );
        }
        Ok(engine)
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self { storage: Arc::new(RwLock::new(Box::new(MemoryStorage::new()))), collections: RwLock::new(HashMap::new()) }
    }

    /// # Errors
    /// Returns an error if the log file cannot be opened or replayed.
    pub fn open_wal<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        Self::new(Box::new(WalStorage::open(path)?))
    }

    fn replay(&self, op: &Operation) -> Result<(), DbError> {
        let name = op.collection();
        match op {
            Operation::CreateCollection { .. } => {
                self.collections
                    .write()
                    .entry(name.to_string())
                    .or_insert_with(|| Arc::new(Collection::new(name, self.storage.clone())));
            }
            Operation::DropCollection { .. } => {
                self.collections.write().remove(name);
            }
            Operation::Insert { .. } | Operation::Update { .. } | Operation::Delete { .. } => {
                self.replay_target(name).replay_document_op(op);
            }
            Operation::CreateIndex { .. } | Operation::DropIndex { .. } => {
                self.replay_target(name).replay_index_op(op)?;
            }
        }
        Ok(())
    }

    // Logs written before collections were recorded explicitly still replay.
    fn replay_target(&self, name: &str) -> Arc<Collection> {
        self.collections
            .write()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Collection::new(name, self.storage.clone())))
            .clone()
    }

    /// # Errors
    /// Returns `CollectionAlreadyExists`, a `QueryError` for an invalid name, or a storage error.
    pub fn create_collection(&self, name: &str) -> Result<Arc<Collection>, DbError> {
        validate_collection_name(name)?;
        let mut cols = self.collections.write();
        if cols.contains_key(name) {
            return Err(DbError::CollectionAlreadyExists(name.to_string()));
        }
        self.storage.write().append(&Operation::CreateCollection { collection: name.to_string() })?;
        let col = Arc::new(Collection::new(name, self.storage.clone()));
        cols.insert(name.to_string(), col.clone());
        drop(cols);
        log::info!("created collection {name}");
        crate::query::telemetry::log_audit("create_collection", name, "-");
        Ok(col)
    }

    #[must_use]
    pub fn get_collection(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections.read().get(name).cloned()
    }

    /// # Errors
    /// Returns an error if the collection has to be created and that fails.
    pub fn get_or_create(&self, name: &str) -> Result<Arc<Collection>, DbError> {
        if let Some(col) = self.get_collection(name) {
            return Ok(col);
        }
        match self.create_collection(name) {
            Err(DbError::CollectionAlreadyExists(_)) => {
                self.get_collection(name).ok_or_else(|| DbError::NoSuchCollection(name.to_string()))
            }
            other => other,
        }
    }

    /// Drop a collection and its indexes. Returns false if it did not exist.
    ///
    /// # Errors
    /// Returns an error if the storage append fails.
    pub fn drop_collection(&self, name: &str) -> Result<bool, DbError> {
        let mut cols = self.collections.write();
        let Some(col) = cols.get(name).cloned() else {
            return Ok(false);
        };
        let store = col.store.write();
        self.storage.write().append(&Operation::DropCollection { collection: name.to_string() })?;
        col.mark_dropped();
        drop(store);
        cols.remove(name);
        drop(cols);
        log::info!("dropped collection {name}");
        crate::query::telemetry::log_audit("drop_collection", name, "-");
        Ok(true)
    }

    /// Collection names, sorted.
    #[must_use]
    pub fn list_collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// # Errors
    /// Returns an error if the storage flush fails.
    pub fn sync(&self) -> Result<(), DbError> {
        self.storage.write().sync()
    }

    #[must_use]
    pub fn describe_storage(&self) -> String {
        self.storage.read().describe()
    }
}

fn validate_collection_name(name: &str) -> Result<(), DbError> {
    if name.is_empty() || name.contains('$') || name.contains('\0') {
        return Err(DbError::QueryError(format!("invalid collection name '{name}'")));
    }
    Ok(())
}
