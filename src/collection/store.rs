use crate::document::Document;
use crate::types::DocumentId;
use std::collections::{BTreeMap, HashMap};

/// Documents of one collection in insertion order.
///
/// Each document gets a sequence number when first inserted; replacing a document keeps its
/// number, so iteration order is stable across updates.
#[derive(Debug, Default, Clone)]
pub struct DocStore {
    next_seq: u64,
    by_seq: BTreeMap<u64, Document>,
    seq_of: HashMap<DocumentId, u64>,
}

impl DocStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new document or replace an existing one in place. Returns the previous
    /// version if there was one.
    pub fn upsert(&mut self, doc: Document) -> Option<Document> {
        if let Some(seq) = self.seq_of.get(&doc.id) {
            return self.by_seq.insert(*seq, doc);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.seq_of.insert(doc.id.clone(), seq);
        self.by_seq.insert(seq, doc);
        None
    }

    pub fn remove(&mut self, id: &DocumentId) -> Option<Document> {
        let seq = self.seq_of.remove(id)?;
        self.by_seq.remove(&seq)
    }

    #[must_use]
    pub fn get(&self, id: &DocumentId) -> Option<&Document> {
        self.seq_of.get(id).and_then(|s| self.by_seq.get(s))
    }

    #[must_use]
    pub fn seq_of(&self, id: &DocumentId) -> Option<u64> {
        self.seq_of.get(id).copied()
    }

    #[must_use]
    pub fn get_by_seq(&self, seq: u64) -> Option<&Document> {
        self.by_seq.get(&seq)
    }

    /// Natural order.
    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.by_seq.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_seq.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_seq.is_empty()
    }
}
