use super::core::Collection;
use crate::document::Document;
use crate::errors::DbError;
use crate::index::{index_insert_all, index_remove_all};
use crate::query::telemetry;
use crate::types::{DocumentId, Operation};

impl Collection {
    /// Persist and then apply an insert.
    ///
    /// # Errors
    /// Returns an error if the collection was dropped, a document with the same id exists, or
    /// the storage append fails. Nothing is applied on error.
    pub fn insert_document(&self, document: Document) -> Result<DocumentId, DbError> {
        let mut store = self.store.write();
        self.ensure_live()?;
        if store.get(&document.id).is_some() {
            return Err(DbError::QueryError(format!("duplicate document id {}", document.id)));
        }
        self.storage
            .write()
            .append(&Operation::Insert { collection: self.name.clone(), document: document.clone() })?;
        let id = document.id.clone();
        index_insert_all(&mut self.indexes.write(), document.body(), &id);
        store.upsert(document);
        drop(store);
        telemetry::log_audit("insert", &self.name, &id.to_string());
        Ok(id)
    }

    /// Insert in order, stopping at the first failure. Earlier inserts stay applied.
    ///
    /// # Errors
    /// Returns the first insert error.
    pub fn insert_many<I: IntoIterator<Item = Document>>(&self, documents: I) -> Result<Vec<DocumentId>, DbError> {
        documents.into_iter().map(|d| self.insert_document(d)).collect()
    }

    #[must_use]
    pub fn find_document(&self, id: &DocumentId) -> Option<Document> {
        self.store.read().get(id).cloned()
    }

    /// Every document in natural order.
    #[must_use]
    pub fn documents(&self) -> Vec<Document> {
        self.store.read().iter().cloned().collect()
    }

    /// Replace the stored document with the same id. Returns false if there is none.
    ///
    /// # Errors
    /// Returns an error if the storage append fails; the stored document is then unchanged.
    pub fn update_document(&self, document: Document) -> Result<bool, DbError> {
        let mut store = self.store.write();
        self.ensure_live()?;
        let Some(old) = store.get(&document.id).cloned() else {
            return Ok(false);
        };
        self.storage
            .write()
            .append(&Operation::Update { collection: self.name.clone(), document: document.clone() })?;
        {
            let mut mgr = self.indexes.write();
            index_remove_all(&mut mgr, old.body(), &old.id);
            index_insert_all(&mut mgr, document.body(), &document.id);
        }
        let id = document.id.to_string();
        store.upsert(document);
        drop(store);
        telemetry::log_audit("update", &self.name, &id);
        Ok(true)
    }

    /// # Errors
    /// Returns an error if the storage append fails; the document then stays.
    pub fn delete_document(&self, id: &DocumentId) -> Result<bool, DbError> {
        let mut store = self.store.write();
        self.ensure_live()?;
        let Some(old) = store.get(id).cloned() else {
            return Ok(false);
        };
        self.storage
            .write()
            .append(&Operation::Delete { collection: self.name.clone(), document_id: id.clone() })?;
        index_remove_all(&mut self.indexes.write(), old.body(), id);
        store.remove(id);
        drop(store);
        telemetry::log_audit("delete", &self.name, &id.to_string());
        Ok(true)
    }

    /// Apply a logged document operation without logging it again.
    pub(crate) fn replay_document_op(&self, op: &Operation) {
        let mut store = self.store.write();
        let mut mgr = self.indexes.write();
        match op {
            Operation::Insert { document, .. } | Operation::Update { document, .. } => {
                if let Some(old) = store.get(&document.id) {
                    index_remove_all(&mut mgr, old.body(), &old.id);
                }
                index_insert_all(&mut mgr, document.body(), &document.id);
                store.upsert(document.clone());
            }
            Operation::Delete { document_id, .. } => {
                if let Some(old) = store.remove(document_id) {
                    index_remove_all(&mut mgr, old.body(), document_id);
                }
            }
            _ => {}
        }
    }
}
