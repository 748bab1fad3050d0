use crate::errors::DbError;
use bson::{Bson, Document as BsonDocument};
use serde_json::Value;

/// Convert a JSON value into BSON without interpreting extended-JSON keys,
/// so query operators such as `$regex` or `$date` stay plain document keys.
/// Integers become Int32 when they fit, Int64 otherwise.
#[must_use]
pub fn json_to_bson(val: &Value) -> Bson {
    match val {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i32::try_from(i).map_or(Bson::Int64(i), Bson::Int32)
            } else if let Some(u) = n.as_u64() {
                i64::try_from(u).map_or_else(|_| Bson::Double(u as f64), Bson::Int64)
            } else {
                Bson::Double(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => Bson::String(s.clone()),
        Value::Array(a) => Bson::Array(a.iter().map(json_to_bson).collect()),
        Value::Object(m) => {
            let mut d = BsonDocument::new();
            for (k, v) in m {
                d.insert(k.clone(), json_to_bson(v));
            }
            Bson::Document(d)
        }
    }
}

/// Convert a serde_json::Value that must be an object into a bson::Document.
///
/// # Errors
/// Returns `DbError::QueryError` if the value is not a JSON object.
pub fn json_value_to_bson_document(val: &Value) -> Result<BsonDocument, DbError> {
    match json_to_bson(val) {
        Bson::Document(d) => Ok(d),
        _ => Err(DbError::QueryError("expected JSON object".into())),
    }
}

/// Parse a JSON string into a bson::Document. The JSON must be a top-level object.
///
/// # Errors
/// Returns an error if the text is not valid JSON or not an object.
pub fn parse_json_to_bson_document(json: &str) -> Result<BsonDocument, DbError> {
    let val: Value = serde_json::from_str(json)?;
    json_value_to_bson_document(&val)
}

/// Parse a JSON string that must be a top-level array of objects.
///
/// # Errors
/// Returns an error if the text is not a JSON array of objects.
pub fn parse_json_to_bson_array(json: &str) -> Result<Vec<BsonDocument>, DbError> {
    let val: Value = serde_json::from_str(json)?;
    let arr = val.as_array().ok_or_else(|| DbError::QueryError("expected JSON array".into()))?;
    arr.iter().map(json_value_to_bson_document).collect()
}
