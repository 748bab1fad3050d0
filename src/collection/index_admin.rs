use super::core::Collection;
use crate::errors::DbError;
use crate::index::{IndexDescriptor, IndexSpec};
use crate::types::Operation;

impl Collection {
    /// Create and build an index from the current documents. Returns its name; an identical
    /// index that already exists is left as is.
    ///
    /// # Errors
    /// Returns an error if the spec is invalid, another index uses the same name, or the storage
    /// append fails.
    pub fn create_index(&self, spec: IndexSpec) -> Result<String, DbError> {
        spec.validate()?;
        let name = spec.name();
        let store = self.store.read();
        self.ensure_live()?;
        if let Some(existing) = self.indexes.read().get(&name) {
            if existing.spec == spec {
                return Ok(name);
            }
            return Err(DbError::IndexError(format!("index name '{name}' already in use")));
        }
        self.storage
            .write()
            .append(&Operation::CreateIndex { collection: self.name.clone(), spec: spec.clone() })?;
        self.build_index(&store, spec)?;
        drop(store);
        log::info!("created index {name} on {}", self.name);
        Ok(name)
    }

    /// # Errors
    /// Returns `DbError::IndexError` for an unknown name, or a storage error.
    pub fn drop_index(&self, name: &str) -> Result<(), DbError> {
        let _store = self.store.read();
        self.ensure_live()?;
        if self.indexes.read().get(name).is_none() {
            return Err(DbError::IndexError(format!("index not found: {name}")));
        }
        self.storage
            .write()
            .append(&Operation::DropIndex { collection: self.name.clone(), name: name.to_string() })?;
        self.indexes.write().drop_index(name);
        log::info!("dropped index {name} on {}", self.name);
        Ok(())
    }

    #[must_use]
    pub fn list_indexes(&self) -> Vec<IndexDescriptor> {
        self.indexes.read().descriptors()
    }

    fn build_index(&self, store: &super::DocStore, spec: IndexSpec) -> Result<(), DbError> {
        let name = spec.name();
        let start = std::time::Instant::now();
        let mut mgr = self.indexes.write();
        if !mgr.create_index(spec)? {
            return Ok(());
        }
        let Some(idx) = mgr.get_mut(&name) else {
            return Ok(());
        };
        for doc in store.iter() {
            idx.insert(doc.body(), &doc.id);
        }
        idx.stats.build_time_ms = start.elapsed().as_millis();
        crate::devlog!(
            "{{\"bench\":\"index\",\"op\":\"build\",\"collection\":\"{}\",\"index\":\"{}\",\"entries\":{},\"duration_ms\":{}}}",
            self.name,
            name,
            idx.stats.entries,
            crate::utils::num::u128_to_u64(idx.stats.build_time_ms)
        );
        Ok(())
    }

    /// Apply a logged index operation without logging it again.
    pub(crate) fn replay_index_op(&self, op: &Operation) -> Result<(), DbError> {
        let store = self.store.read();
        match op {
            Operation::CreateIndex { spec, .. } => self.build_index(&store, spec.clone()),
            Operation::DropIndex { name, .. } => {
                self.indexes.write().drop_index(name);
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
