use crate::types::DocumentId;
use bson::Document as BsonDocument;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use super::key::{IndexKeyKind, KeyPart, key_for_field};
use super::plan::FieldBounds;
use super::{IndexSpec, IndexStats};

/// Ordered (optionally compound) index over one or more fields.
#[derive(Debug, Clone)]
pub struct BTreeIndex {
    pub spec: IndexSpec,
    pub name: String,
    pub map: BTreeMap<Vec<KeyPart>, BTreeSet<DocumentId>>,
    /// Documents holding a value the index cannot order; every scan returns them for
    /// re-checking.
    pub unkeyed: BTreeSet<DocumentId>,
    pub stats: IndexStats,
}

/// Result of walking an index: candidate ids (unordered) and how many keys were visited.
#[derive(Debug, Clone, Default)]
pub struct IndexScan {
    pub ids: Vec<DocumentId>,
    pub keys_examined: usize,
}

impl BTreeIndex {
    #[must_use]
    pub fn new(spec: IndexSpec) -> Self {
        let name = spec.name();
        Self { spec, name, map: BTreeMap::new(), unkeyed: BTreeSet::new(), stats: IndexStats::default() }
    }

    fn key_of(&self, doc: &BsonDocument) -> Option<Vec<KeyPart>> {
        self.spec
            .keys
            .iter()
            .map(|(field, order)| key_for_field(doc, field).map(|kind| KeyPart { kind, order: *order }))
            .collect()
    }

    pub fn insert(&mut self, doc: &BsonDocument, id: &DocumentId) {
        let inserted = match self.key_of(doc) {
            Some(key) => self.map.entry(key).or_default().insert(id.clone()),
            None => self.unkeyed.insert(id.clone()),
        };
        if inserted {
            self.stats.entries += 1;
        }
        self.stats.keys = self.map.len();
    }

    pub fn remove(&mut self, doc: &BsonDocument, id: &DocumentId) {
        let removed = match self.key_of(doc) {
            Some(key) => {
                let mut removed = false;
                if let Some(set) = self.map.get_mut(&key) {
                    removed = set.remove(id);
                    if set.is_empty() {
                        self.map.remove(&key);
                    }
                }
                removed
            }
            None => self.unkeyed.remove(id),
        };
        if removed {
            self.stats.entries = self.stats.entries.saturating_sub(1);
        }
        self.stats.keys = self.map.len();
    }

    /// Walk the keys selected by `bounds`, one entry per leading index field.
    /// Only the first bound positions and terminates the walk; later bounds filter keys.
    pub fn scan(&mut self, bounds: &[FieldBounds]) -> IndexScan {
        let mut out = IndexScan::default();
        let Some(first) = bounds.first() else {
            return out;
        };
        let first_order = self.spec.keys[0].1;
        let start = first.seek_kind(first_order).map(|kind| vec![KeyPart { kind, order: first_order }]);
        let iter: Box<dyn Iterator<Item = (&Vec<KeyPart>, &BTreeSet<DocumentId>)>> = match start {
            Some(s) => Box::new(self.map.range((Bound::Included(s), Bound::Unbounded))),
            None => Box::new(self.map.iter()),
        };
        for (key, ids) in iter {
            out.keys_examined += 1;
            if first.is_past_end(&key[0].kind, first_order) {
                break;
            }
            let matched = bounds.iter().zip(key.iter()).all(|(b, part)| b.contains(&part.kind));
            if matched {
                out.ids.extend(ids.iter().cloned());
            }
        }
        out.ids.extend(self.unkeyed.iter().cloned());
        if out.ids.is_empty() {
            self.stats.misses += 1;
        } else {
            self.stats.hits += 1;
        }
        out
    }

    /// Every key value currently stored for the leading field, in index order.
    #[must_use]
    pub fn leading_keys(&self) -> Vec<IndexKeyKind> {
        self.map.keys().map(|k| k[0].kind.clone()).collect()
    }
}
