use bson::{Bson, Document as BsonDocument};
use ordered_float::OrderedFloat;
use std::cmp::Ordering;

use crate::query::Order;

/// One indexed value. Variant order mirrors the BSON comparison order used by sorts, with
/// missing fields first. Numbers of every width share `Num` so 12 and 12.0 are one key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexKeyKind {
    Missing,
    Null,
    Num(OrderedFloat<f64>),
    Str(String),
    Bool(bool),
}

impl IndexKeyKind {
    /// True when both keys belong to the same comparison family.
    #[must_use]
    pub fn same_family(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// Key for a present value; `None` for values an index cannot order (arrays, documents, ...).
#[must_use]
pub fn key_from_bson(v: &Bson) -> Option<IndexKeyKind> {
    match v {
        Bson::Null => Some(IndexKeyKind::Null),
        Bson::String(s) => Some(IndexKeyKind::Str(s.clone())),
        Bson::Boolean(b) => Some(IndexKeyKind::Bool(*b)),
        other => crate::utils::num::as_f64(other).map(|f| IndexKeyKind::Num(OrderedFloat(f))),
    }
}

/// Key for a document field, `Missing` when the path is absent.
#[must_use]
pub fn key_for_field(doc: &BsonDocument, path: &str) -> Option<IndexKeyKind> {
    match crate::query::get_path(doc, path) {
        Some(v) => key_from_bson(v),
        None => Some(IndexKeyKind::Missing),
    }
}

/// A key component carrying its field's direction so `BTreeMap` iteration follows the index
/// direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPart {
    pub kind: IndexKeyKind,
    pub order: Order,
}

impl Ord for KeyPart {
    fn cmp(&self, other: &Self) -> Ordering {
        let ord = self.kind.cmp(&other.kind);
        match self.order {
            Order::Asc => ord,
            Order::Desc => ord.reverse(),
        }
    }
}

impl PartialOrd for KeyPart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
