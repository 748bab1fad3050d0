//! Secondary indexes. Every index is an ordered map from (possibly compound) keys to document
//! ids; single-field indexes are compound indexes of length one.

mod btree;
mod key;
mod plan;

pub use btree::{BTreeIndex, IndexScan};
pub use key::{IndexKeyKind, KeyPart, key_for_field, key_from_bson};
pub use plan::{FieldBounds, bounds_for, score};

use crate::document::ID_FIELD;
use crate::errors::DbError;
use crate::query::{Filter, Order};
use crate::types::DocumentId;
use bson::{Bson, Document as BsonDocument};
use serde::{Deserialize, Serialize};

pub const MAX_INDEX_FIELDS: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub keys: usize,
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub build_time_ms: u128,
}

/// Ordered list of `(field, direction)` pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub keys: Vec<(String, Order)>,
}

impl IndexSpec {
    /// # Errors
    /// Returns `DbError::IndexError` if `keys` is empty, too long, or names a field twice.
    pub fn new(keys: Vec<(String, Order)>) -> Result<Self, DbError> {
        let spec = Self { keys };
        spec.validate()?;
        Ok(spec)
    }

    /// `_id` is the document id, not a body field, so it cannot be indexed.
    ///
    /// # Errors
    /// Returns `DbError::IndexError` for an empty, oversized or repeating key list, or an
    /// `_id` key.
    pub fn validate(&self) -> Result<(), DbError> {
        let keys = &self.keys;
        if keys.is_empty() {
            return Err(DbError::IndexError("index needs at least one field".into()));
        }
        if keys.len() > MAX_INDEX_FIELDS {
            return Err(DbError::IndexError(format!("index has more than {MAX_INDEX_FIELDS} fields")));
        }
        for (i, (f, _)) in keys.iter().enumerate() {
            if f.is_empty() {
                return Err(DbError::IndexError("empty field name".into()));
            }
            if f == ID_FIELD {
                return Err(DbError::IndexError("cannot index _id".into()));
            }
            if keys[..i].iter().any(|(g, _)| g == f) {
                return Err(DbError::IndexError(format!("field '{f}' repeated")));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn ascending(field: &str) -> Self {
        Self { keys: vec![(field.to_string(), Order::Asc)] }
    }

    /// Conventional name, e.g. `author_1_published_year_-1`.
    #[must_use]
    pub fn name(&self) -> String {
        self.keys
            .iter()
            .map(|(f, o)| format!("{f}_{}", o.as_i32()))
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Key pattern as a document, e.g. `{author: 1, published_year: -1}`.
    #[must_use]
    pub fn key_pattern(&self) -> BsonDocument {
        let mut d = BsonDocument::new();
        for (f, o) in &self.keys {
            d.insert(f.clone(), Bson::Int32(o.as_i32()));
        }
        d
    }

    /// Parse `{field: 1, other: -1}`.
    ///
    /// # Errors
    /// Returns an error for directions other than 1 / -1 or an invalid key list.
    pub fn from_document(doc: &BsonDocument) -> Result<Self, DbError> {
        let keys = doc
            .iter()
            .map(|(k, v)| Order::from_bson(v).map(|o| (k.clone(), o)))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(keys)
    }

    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        self.keys.iter().map(|(f, _)| f.as_str()).collect()
    }
}

/// # Errors
/// Returns an error if the JSON is not an index key document.
pub fn parse_index_json(json: &str) -> Result<IndexSpec, DbError> {
    let doc = crate::utils::json::parse_json_to_bson_document(json)?;
    IndexSpec::from_document(&doc)
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexDescriptor {
    pub name: String,
    pub spec: IndexSpec,
    pub stats: IndexStats,
}

/// Chosen index and the bounds to walk it with.
#[derive(Debug, Clone)]
pub struct IndexPlan {
    pub index_name: String,
    pub key_pattern: BsonDocument,
    pub bounds: Vec<FieldBounds>,
}

#[derive(Debug, Default)]
pub struct IndexManager {
    /// Creation order; ties in planning go to the earlier index.
    pub indexes: Vec<BTreeIndex>,
}

impl IndexManager {
    #[must_use]
    pub fn new() -> Self {
        Self { indexes: Vec::new() }
    }

    /// Register an empty index. Returns false if an index with the same spec already exists.
    ///
    /// # Errors
    /// Returns an error if a different index already uses the same name.
    pub fn create_index(&mut self, spec: IndexSpec) -> Result<bool, DbError> {
        let name = spec.name();
        if let Some(existing) = self.get(&name) {
            if existing.spec == spec {
                return Ok(false);
            }
            return Err(DbError::IndexError(format!("index name '{name}' already in use")));
        }
        self.indexes.push(BTreeIndex::new(spec));
        Ok(true)
    }

    pub fn drop_index(&mut self, name: &str) -> bool {
        let before = self.indexes.len();
        self.indexes.retain(|i| i.name != name);
        before != self.indexes.len()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BTreeIndex> {
        self.indexes.iter().find(|i| i.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut BTreeIndex> {
        self.indexes.iter_mut().find(|i| i.name == name)
    }

    #[must_use]
    pub fn descriptors(&self) -> Vec<IndexDescriptor> {
        self.indexes
            .iter()
            .map(|i| IndexDescriptor { name: i.name.clone(), spec: i.spec.clone(), stats: i.stats.clone() })
            .collect()
    }

    #[must_use]
    pub fn plan(&self, filter: &Filter) -> Option<IndexPlan> {
        let mut best: Option<(usize, IndexPlan)> = None;
        for idx in &self.indexes {
            let bounds = bounds_for(&idx.spec.keys, filter);
            let s = score(&bounds);
            if s == 0 || best.as_ref().is_some_and(|(b, _)| *b >= s) {
                continue;
            }
            best = Some((
                s,
                IndexPlan { index_name: idx.name.clone(), key_pattern: idx.spec.key_pattern(), bounds },
            ));
        }
        best.map(|(_, p)| p)
    }

    pub fn execute(&mut self, plan: &IndexPlan) -> Option<IndexScan> {
        self.get_mut(&plan.index_name).map(|idx| idx.scan(&plan.bounds))
    }
}

pub fn index_insert_all(mgr: &mut IndexManager, doc: &BsonDocument, id: &DocumentId) {
    for idx in &mut mgr.indexes {
        idx.insert(doc, id);
    }
}

pub fn index_remove_all(mgr: &mut IndexManager, doc: &BsonDocument, id: &DocumentId) {
    for idx in &mut mgr.indexes {
        idx.remove(doc, id);
    }
}
