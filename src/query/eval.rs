use bson::{Bson, Document as BsonDocument};
use std::cmp::Ordering;

use super::types::{
    CmpOp, Filter, MAX_IN_SET, MAX_PATH_DEPTH, MAX_PROJECTION_FIELDS, MAX_SORT_FIELDS, Order,
    Projection, ProjectionMode, SortSpec,
};
use crate::document::{Document, ID_FIELD};
use crate::errors::DbError;
use crate::utils::num::{as_f64, is_number};

/// Evaluate `filter` against a plain document, where `_id` is an ordinary field.
#[must_use]
pub fn eval_filter(doc: &BsonDocument, filter: &Filter) -> bool {
    eval_at(doc, None, filter)
}

/// Evaluate `filter` against a stored document; `_id` resolves to the document id.
#[must_use]
pub fn eval_document(doc: &Document, filter: &Filter) -> bool {
    if mentions_id(filter) {
        let id = doc.id_bson();
        eval_at(doc.body(), Some(&id), filter)
    } else {
        eval_at(doc.body(), None, filter)
    }
}

fn mentions_id(filter: &Filter) -> bool {
    match filter {
        Filter::True => false,
        Filter::And(fs) | Filter::Or(fs) | Filter::Nor(fs) => fs.iter().any(mentions_id),
        Filter::Not(f) => mentions_id(f),
        Filter::Exists { path, .. }
        | Filter::In { path, .. }
        | Filter::Nin { path, .. }
        | Filter::Cmp { path, .. } => path == ID_FIELD,
        #[cfg(feature = "regex")]
        Filter::Regex { path, .. } => path == ID_FIELD,
    }
}

fn lookup<'a>(doc: &'a BsonDocument, id: Option<&'a Bson>, path: &str) -> Option<&'a Bson> {
    match id {
        Some(id) if path == ID_FIELD => Some(id),
        _ => get_path(doc, path),
    }
}

fn eval_at(doc: &BsonDocument, id: Option<&Bson>, filter: &Filter) -> bool {
    match filter {
        Filter::True => true,
        Filter::And(fs) => fs.iter().all(|f| eval_at(doc, id, f)),
        Filter::Or(fs) => fs.iter().any(|f| eval_at(doc, id, f)),
        Filter::Nor(fs) => !fs.iter().any(|f| eval_at(doc, id, f)),
        Filter::Not(f) => !eval_at(doc, id, f),
        Filter::Exists { path, exists } => lookup(doc, id, path).is_some() == *exists,
        Filter::In { path, values } => is_in_set(lookup(doc, id, path), values),
        Filter::Nin { path, values } => !is_in_set(lookup(doc, id, path), values),
        Filter::Cmp { path, op, value } => {
            let field = lookup(doc, id, path);
            match op {
                CmpOp::Eq => matches_eq(field, value),
                CmpOp::Ne => !matches_eq(field, value),
                CmpOp::Gt => matches_range(field, value, |o| o == Ordering::Greater),
                CmpOp::Gte => matches_range(field, value, |o| o != Ordering::Less),
                CmpOp::Lt => matches_range(field, value, |o| o == Ordering::Less),
                CmpOp::Lte => matches_range(field, value, |o| o != Ordering::Greater),
            }
        }
        #[cfg(feature = "regex")]
        Filter::Regex { path, pattern, case_insensitive } => {
            if let Some(Bson::String(s)) = lookup(doc, id, path) {
                let mut re = regex::RegexBuilder::new(pattern);
                re.case_insensitive(*case_insensitive);
                re.build().is_ok_and(|r| r.is_match(s))
            } else {
                false
            }
        }
    }
}

/// Equality with numbers compared by value. A `null` operand also matches a missing field,
/// and an array field matches when any element is equal.
fn matches_eq(field: Option<&Bson>, value: &Bson) -> bool {
    match field {
        None => matches!(value, Bson::Null),
        Some(v) if values_equal(v, value) => true,
        Some(Bson::Array(items)) => items.iter().any(|x| values_equal(x, value)),
        Some(_) => false,
    }
}

fn matches_range(field: Option<&Bson>, value: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    match field {
        Some(Bson::Array(items)) if !matches!(value, Bson::Array(_)) => {
            items.iter().any(|x| compare_same_family(x, value).is_some_and(&accept))
        }
        Some(v) => compare_same_family(v, value).is_some_and(accept),
        None => false,
    }
}

#[must_use]
pub fn values_equal(a: &Bson, b: &Bson) -> bool {
    if is_number(a) && is_number(b) {
        return as_f64(a) == as_f64(b);
    }
    a == b
}

/// Ordering for range operators; values of different type families never compare.
fn compare_same_family(a: &Bson, b: &Bson) -> Option<Ordering> {
    if is_number(a) && is_number(b) {
        return as_f64(a)?.partial_cmp(&as_f64(b)?);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn is_in_set(v: Option<&Bson>, set: &[Bson]) -> bool {
    set.iter().take(MAX_IN_SET).any(|x| matches_eq(v, x))
}

#[must_use]
pub fn compare_docs(a: &BsonDocument, b: &BsonDocument, sort: &[SortSpec]) -> Ordering {
    compare_at(a, None, b, None, sort)
}

/// Sort order between stored documents; `_id` sorts by the document id.
#[must_use]
pub fn compare_documents(a: &Document, b: &Document, sort: &[SortSpec]) -> Ordering {
    if sort.iter().take(MAX_SORT_FIELDS).any(|s| s.field == ID_FIELD) {
        let (ia, ib) = (a.id_bson(), b.id_bson());
        compare_at(a.body(), Some(&ia), b.body(), Some(&ib), sort)
    } else {
        compare_at(a.body(), None, b.body(), None, sort)
    }
}

fn compare_at(
    a: &BsonDocument,
    a_id: Option<&Bson>,
    b: &BsonDocument,
    b_id: Option<&Bson>,
    sort: &[SortSpec],
) -> Ordering {
    for s in sort.iter().take(MAX_SORT_FIELDS) {
        let ord = match (lookup(a, a_id, &s.field), lookup(b, b_id, &s.field)) {
            (Some(x), Some(y)) => compare_bson(x, y),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return if s.order == Order::Asc { ord } else { ord.reverse() };
        }
    }
    Ordering::Equal
}

/// Total order over BSON values used by sorts: numbers by value, same-type values
/// naturally, everything else by type rank.
#[must_use]
pub fn compare_bson(a: &Bson, b: &Bson) -> Ordering {
    if is_number(a) && is_number(b) {
        let x = as_f64(a).unwrap_or(f64::NAN);
        let y = as_f64(b).unwrap_or(f64::NAN);
        return x.total_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.cmp(y),
        (Bson::Document(x), Bson::Document(y)) => compare_subdocs(x, y),
        (Bson::Array(x), Bson::Array(y)) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let o = compare_bson(l, r);
                if o != Ordering::Equal {
                    return o;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn compare_subdocs(x: &BsonDocument, y: &BsonDocument) -> Ordering {
    for ((kx, vx), (ky, vy)) in x.iter().zip(y.iter()) {
        let o = kx.cmp(ky).then_with(|| compare_bson(vx, vy));
        if o != Ordering::Equal {
            return o;
        }
    }
    x.len().cmp(&y.len())
}

fn type_rank(v: &Bson) -> u8 {
    match v {
        Bson::MinKey => 0,
        Bson::Null | Bson::Undefined => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::String(_) | Bson::Symbol(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::Binary(_) => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::Timestamp(_) => 10,
        Bson::RegularExpression(_) => 11,
        Bson::MaxKey => 255,
        _ => 12,
    }
}

/// Resolve a dotted path such as `info.visits`.
#[must_use]
pub fn get_path<'a>(doc: &'a BsonDocument, path: &str) -> Option<&'a Bson> {
    if path.is_empty() || path.len() > 1024 {
        return None;
    }
    let mut cur = doc;
    let mut parts = path.split('.').enumerate().peekable();
    while let Some((depth, part)) = parts.next() {
        if depth >= MAX_PATH_DEPTH {
            return None;
        }
        let v = cur.get(part)?;
        if parts.peek().is_none() {
            return Some(v);
        }
        match v {
            Bson::Document(d) => cur = d,
            _ => return None,
        }
    }
    None
}

/// Write `value` at a dotted path, creating missing intermediate documents. Returns true if
/// the stored value changed.
///
/// # Errors
/// Returns `DbError::QueryError` if an intermediate segment holds something other than a
/// document; nothing is written in that case.
pub(crate) fn set_path(root: &mut BsonDocument, path: &str, value: Bson) -> Result<bool, DbError> {
    match path.split_once('.') {
        None => {
            let old = root.insert(path.to_string(), value.clone());
            Ok(old.as_ref() != Some(&value))
        }
        Some((head, rest)) => match root.get_mut(head) {
            Some(Bson::Document(d)) => set_path(d, rest, value),
            Some(other) => Err(DbError::QueryError(format!(
                "cannot create field '{rest}' inside non-document '{head}' ({:?})",
                other.element_type()
            ))),
            None => {
                let mut child = BsonDocument::new();
                set_path(&mut child, rest, value)?;
                root.insert(head.to_string(), Bson::Document(child));
                Ok(true)
            }
        },
    }
}

/// Remove a dotted path. Returns true if something was removed.
pub(crate) fn unset_path(root: &mut BsonDocument, path: &str) -> bool {
    match path.split_once('.') {
        None => root.remove(path).is_some(),
        Some((head, rest)) => match root.get_mut(head) {
            Some(Bson::Document(d)) => unset_path(d, rest),
            _ => false,
        },
    }
}

/// Apply `projection` to a stored document, exposing its id as `_id` when requested.
#[must_use]
pub fn project_document(doc: &Document, projection: &Projection) -> BsonDocument {
    let body = doc.body();
    let mut out = BsonDocument::new();
    if projection.include_id {
        out.insert(ID_FIELD, doc.id_bson());
    }
    let fields = projection.fields.iter().filter(|f| f.as_str() != ID_FIELD).take(MAX_PROJECTION_FIELDS);
    match projection.mode {
        ProjectionMode::Include => {
            for f in fields {
                // `out` only holds documents along paths copied from `body`.
                if let Some(v) = get_path(body, f) {
                    let _ = set_path(&mut out, f, v.clone());
                }
            }
        }
        ProjectionMode::Exclude => {
            for (k, v) in body {
                if k != ID_FIELD {
                    out.insert(k.clone(), v.clone());
                }
            }
            for f in fields {
                unset_path(&mut out, f);
            }
        }
    }
    out
}

/// Projection over a plain document (aggregation rows), where `_id` is an ordinary field.
#[must_use]
pub fn project_fields(doc: &BsonDocument, projection: &Projection) -> BsonDocument {
    let fields = projection.fields.iter().filter(|f| f.as_str() != ID_FIELD).take(MAX_PROJECTION_FIELDS);
    let mut out = BsonDocument::new();
    match projection.mode {
        ProjectionMode::Include => {
            if projection.include_id
                && let Some(id) = doc.get(ID_FIELD)
            {
                out.insert(ID_FIELD, id.clone());
            }
            for f in fields {
                if let Some(v) = get_path(doc, f) {
                    let _ = set_path(&mut out, f, v.clone());
                }
            }
        }
        ProjectionMode::Exclude => {
            out = doc.clone();
            if !projection.include_id {
                out.remove(ID_FIELD);
            }
            for f in fields {
                unset_path(&mut out, f);
            }
        }
    }
    out
}
