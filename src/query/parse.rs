//! MongoDB-shaped filters, updates, sorts and projections, from BSON or JSON.

use bson::{Bson, Document as BsonDocument};

use super::types::{
    CmpOp, Filter, MAX_IN_SET, MAX_PROJECTION_FIELDS, MAX_SORT_FIELDS, Order, Projection,
    ProjectionMode, SortSpec, UpdateDoc,
};
use crate::document::ID_FIELD;
use crate::errors::DbError;
use crate::utils::json::parse_json_to_bson_document;

const MAX_UPDATE_FIELDS: usize = 128;
const MAX_FILTER_DEPTH: usize = 32;

fn query_err(msg: impl Into<String>) -> DbError {
    DbError::QueryError(msg.into())
}

/// Parse `{genre: "Fiction", published_year: {$gt: 1950}}`; keys combine with AND.
///
/// # Errors
/// Returns `DbError::QueryError` for unknown operators or malformed operands.
pub fn parse_filter(doc: &BsonDocument) -> Result<Filter, DbError> {
    parse_filter_at(doc, 0)
}

fn parse_filter_at(doc: &BsonDocument, depth: usize) -> Result<Filter, DbError> {
    if depth > MAX_FILTER_DEPTH {
        return Err(query_err("filter nested too deeply"));
    }
    let mut parts = Vec::new();
    for (key, value) in doc {
        match key.as_str() {
            "$and" | "$or" | "$nor" => {
                let Bson::Array(items) = value else {
                    return Err(query_err(format!("{key} expects an array")));
                };
                if items.is_empty() {
                    return Err(query_err(format!("{key} expects a non-empty array")));
                }
                let subs = items
                    .iter()
                    .map(|item| match item {
                        Bson::Document(d) => parse_filter_at(d, depth + 1),
                        _ => Err(query_err(format!("{key} entries must be documents"))),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                parts.push(match key.as_str() {
                    "$and" => Filter::And(subs),
                    "$or" => Filter::Or(subs),
                    _ => Filter::Nor(subs),
                });
            }
            k if k.starts_with('$') => return Err(query_err(format!("unknown top-level operator {k}"))),
            path => parts.push(parse_field(path, value, depth)?),
        }
    }
    Ok(match parts.len() {
        0 => Filter::True,
        1 => parts.remove(0),
        _ => Filter::And(parts),
    })
}

fn is_operator_doc(v: &Bson) -> Option<&BsonDocument> {
    match v {
        Bson::Document(d) if d.keys().next().is_some_and(|k| k.starts_with('$')) => Some(d),
        _ => None,
    }
}

fn parse_field(path: &str, value: &Bson, depth: usize) -> Result<Filter, DbError> {
    let Some(ops) = is_operator_doc(value) else {
        return Ok(Filter::Cmp { path: path.to_string(), op: CmpOp::Eq, value: value.clone() });
    };
    let mut parts = Vec::new();
    #[cfg(feature = "regex")]
    let mut pattern: Option<String> = None;
    #[cfg(feature = "regex")]
    let mut options = String::new();
    for (op, arg) in ops {
        let cmp = |op: CmpOp| Filter::Cmp { path: path.to_string(), op, value: arg.clone() };
        match op.as_str() {
            "$eq" => parts.push(cmp(CmpOp::Eq)),
            "$ne" => parts.push(cmp(CmpOp::Ne)),
            "$gt" => parts.push(cmp(CmpOp::Gt)),
            "$gte" => parts.push(cmp(CmpOp::Gte)),
            "$lt" => parts.push(cmp(CmpOp::Lt)),
            "$lte" => parts.push(cmp(CmpOp::Lte)),
            "$in" | "$nin" => {
                let Bson::Array(values) = arg else {
                    return Err(query_err(format!("{op} expects an array")));
                };
                if values.len() > MAX_IN_SET {
                    return Err(query_err(format!("{op} accepts at most {MAX_IN_SET} values")));
                }
                let path = path.to_string();
                let values = values.clone();
                parts.push(if op == "$in" { Filter::In { path, values } } else { Filter::Nin { path, values } });
            }
            "$exists" => {
                let exists = match arg {
                    Bson::Boolean(b) => *b,
                    other => crate::utils::num::as_f64(other).is_some_and(|n| n != 0.0),
                };
                parts.push(Filter::Exists { path: path.to_string(), exists });
            }
            "$not" => {
                if is_operator_doc(arg).is_none() {
                    return Err(query_err("$not expects an operator document"));
                }
                if depth >= MAX_FILTER_DEPTH {
                    return Err(query_err("filter nested too deeply"));
                }
                parts.push(Filter::Not(Box::new(parse_field(path, arg, depth + 1)?)));
            }
            #[cfg(feature = "regex")]
            "$regex" => {
                let Bson::String(p) = arg else {
                    return Err(query_err("$regex expects a string"));
                };
                pattern = Some(p.clone());
            }
            #[cfg(feature = "regex")]
            "$options" => {
                let Bson::String(o) = arg else {
                    return Err(query_err("$options expects a string"));
                };
                options.clone_from(o);
            }
            other if !other.starts_with('$') => {
                return Err(query_err(format!("cannot mix operators and fields under '{path}'")));
            }
            other => return Err(query_err(format!("unknown operator {other}"))),
        }
    }
    #[cfg(feature = "regex")]
    if let Some(pattern) = pattern {
        if regex::Regex::new(&pattern).is_err() {
            return Err(query_err(format!("invalid regex '{pattern}'")));
        }
        parts.push(Filter::Regex { path: path.to_string(), pattern, case_insensitive: options.contains('i') });
    }
    Ok(match parts.len() {
        0 => return Err(query_err(format!("no operator for '{path}'"))),
        1 => parts.remove(0),
        _ => Filter::And(parts),
    })
}

/// # Errors
/// Returns an error if `json` is not a valid filter document.
pub fn parse_filter_json(json: &str) -> Result<Filter, DbError> {
    parse_filter(&parse_json_to_bson_document(json)?)
}

/// Parse `{$set: {...}, $inc: {...}, $unset: {...}}`.
///
/// # Errors
/// Returns an error for replacement-style documents, unknown operators, an empty update
/// or a non-numeric `$inc`.
pub fn parse_update(doc: &BsonDocument) -> Result<UpdateDoc, DbError> {
    let mut out = UpdateDoc::default();
    for (op, arg) in doc {
        let Bson::Document(fields) = arg else {
            return Err(query_err(format!("{op} expects a document")));
        };
        if fields.len() > MAX_UPDATE_FIELDS {
            return Err(query_err(format!("{op} touches more than {MAX_UPDATE_FIELDS} fields")));
        }
        match op.as_str() {
            "$set" => out.set.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone()))),
            "$inc" => out.inc.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone()))),
            "$unset" => out.unset.extend(fields.keys().cloned()),
            k if k.starts_with('$') => return Err(query_err(format!("unknown update operator {k}"))),
            _ => return Err(query_err("update documents must use $set, $inc or $unset")),
        }
    }
    out.validate()?;
    Ok(out)
}

/// # Errors
/// Returns an error if `json` is not a valid update document.
pub fn parse_update_json(json: &str) -> Result<UpdateDoc, DbError> {
    parse_update(&parse_json_to_bson_document(json)?)
}

/// Parse `{price: -1, title: 1}`.
///
/// # Errors
/// Returns an error for directions other than 1 / -1 or more than the allowed number of keys.
pub fn parse_sort(doc: &BsonDocument) -> Result<Vec<SortSpec>, DbError> {
    if doc.len() > MAX_SORT_FIELDS {
        return Err(query_err(format!("sort accepts at most {MAX_SORT_FIELDS} keys")));
    }
    doc.iter()
        .map(|(field, dir)| Order::from_bson(dir).map(|order| SortSpec { field: field.clone(), order }))
        .collect()
}

/// # Errors
/// Returns an error if `json` is not a valid sort document.
pub fn parse_sort_json(json: &str) -> Result<Vec<SortSpec>, DbError> {
    parse_sort(&parse_json_to_bson_document(json)?)
}

fn truthy(v: &Bson) -> Result<bool, DbError> {
    match v {
        Bson::Boolean(b) => Ok(*b),
        other => crate::utils::num::as_f64(other)
            .map(|n| n != 0.0)
            .ok_or_else(|| query_err(format!("projection values must be 0/1 or booleans, got {other}"))),
    }
}

/// Parse `{title: 1, price: 1, _id: 0}` or `{genre: 0}`. Inclusion and exclusion cannot be
/// mixed, except for `_id`.
///
/// # Errors
/// Returns an error for mixed modes, non-boolean values or too many fields.
pub fn parse_projection(doc: &BsonDocument) -> Result<Projection, DbError> {
    if doc.len() > MAX_PROJECTION_FIELDS {
        return Err(query_err(format!("projection accepts at most {MAX_PROJECTION_FIELDS} fields")));
    }
    let mut include_id = true;
    let mut mode: Option<ProjectionMode> = None;
    let mut fields = Vec::new();
    for (field, v) in doc {
        let on = truthy(v)?;
        if field == ID_FIELD {
            include_id = on;
            continue;
        }
        let this = if on { ProjectionMode::Include } else { ProjectionMode::Exclude };
        match mode {
            Some(m) if m != this => {
                return Err(query_err("cannot mix inclusion and exclusion in a projection"));
            }
            _ => mode = Some(this),
        }
        fields.push(field.clone());
    }
    // `{_id: 1}` alone keeps only the id; `{_id: 0}` alone keeps everything else.
    let mode = mode.unwrap_or(if include_id { ProjectionMode::Include } else { ProjectionMode::Exclude });
    Ok(Projection { mode, fields, include_id })
}

/// # Errors
/// Returns an error if `json` is not a valid projection document.
pub fn parse_projection_json(json: &str) -> Result<Projection, DbError> {
    parse_projection(&parse_json_to_bson_document(json)?)
}
