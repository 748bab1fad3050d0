use bson::{Bson, Document as BsonDocument};
use ordered_float::OrderedFloat;

use super::types::{Expr, MAX_EXPR_DEPTH};
use crate::errors::DbError;
use crate::query::get_path;
use crate::utils::num::{as_f64, int_bson};

fn agg_err(msg: impl Into<String>) -> DbError {
    DbError::AggregateError(msg.into())
}

/// Evaluate `expr` against `doc`. Missing fields evaluate to null.
///
/// # Errors
/// Returns `DbError::AggregateError` for type mismatches and division by zero.
pub fn eval_expr(doc: &BsonDocument, expr: &Expr) -> Result<Bson, DbError> {
    eval_at(doc, expr, 0)
}

fn eval_at(doc: &BsonDocument, expr: &Expr, depth: usize) -> Result<Bson, DbError> {
    if depth > MAX_EXPR_DEPTH {
        return Err(agg_err("expression nested too deeply"));
    }
    let eval = |e: &Expr| eval_at(doc, e, depth + 1);
    match expr {
        Expr::Field(path) => Ok(get_path(doc, path).cloned().unwrap_or(Bson::Null)),
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Concat(parts) => {
            let mut out = String::new();
            for p in parts {
                match eval(p)? {
                    Bson::Null | Bson::Undefined => return Ok(Bson::Null),
                    Bson::String(s) => out.push_str(&s),
                    other => return Err(agg_err(format!("$concat only supports strings, got {other}"))),
                }
            }
            Ok(Bson::String(out))
        }
        Expr::ToString(inner) => to_display_string(&eval(inner)?),
        Expr::Add(parts) => fold_numbers(parts.iter().map(eval), "$add", Num::Int(0), Num::add),
        Expr::Multiply(parts) => fold_numbers(parts.iter().map(eval), "$multiply", Num::Int(1), Num::mul),
        Expr::Divide(a, b) => {
            let (a, b) = (eval(a)?, eval(b)?);
            if is_nullish(&a) || is_nullish(&b) {
                return Ok(Bson::Null);
            }
            let (Some(x), Some(y)) = (as_f64(&a), as_f64(&b)) else {
                return Err(agg_err("$divide only supports numeric types"));
            };
            if y == 0.0 {
                return Err(agg_err("can't $divide by zero"));
            }
            Ok(Bson::Double(x / y))
        }
        Expr::Floor(inner) => match eval(inner)? {
            v @ (Bson::Null | Bson::Undefined | Bson::Int32(_) | Bson::Int64(_)) => Ok(v),
            Bson::Double(f) => Ok(Bson::Double(f.floor())),
            other => Err(agg_err(format!("$floor only supports numeric types, got {other}"))),
        },
        Expr::Object(fields) => {
            let mut out = BsonDocument::new();
            for (k, e) in fields {
                out.insert(k.clone(), eval(e)?);
            }
            Ok(Bson::Document(out))
        }
    }
}

const fn is_nullish(v: &Bson) -> bool {
    matches!(v, Bson::Null | Bson::Undefined)
}

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn from_bson(v: &Bson) -> Option<Self> {
        match v {
            Bson::Int32(i) => Some(Self::Int(i64::from(*i))),
            Bson::Int64(i) => Some(Self::Int(*i)),
            other => as_f64(other).map(Self::Float),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn to_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    fn add(self, other: Self) -> Self {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.checked_add(b).map_or(Self::Float(self.to_f64() + other.to_f64()), Self::Int),
            _ => Self::Float(self.to_f64() + other.to_f64()),
        }
    }

    fn mul(self, other: Self) -> Self {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.checked_mul(b).map_or(Self::Float(self.to_f64() * other.to_f64()), Self::Int),
            _ => Self::Float(self.to_f64() * other.to_f64()),
        }
    }

    fn into_bson(self) -> Bson {
        match self {
            Self::Int(i) => int_bson(i),
            Self::Float(f) => Bson::Double(f),
        }
    }
}

fn fold_numbers(
    values: impl Iterator<Item = Result<Bson, DbError>>,
    op: &str,
    init: Num,
    f: fn(Num, Num) -> Num,
) -> Result<Bson, DbError> {
    let mut acc = init;
    for v in values {
        let v = v?;
        if is_nullish(&v) {
            return Ok(Bson::Null);
        }
        let n = Num::from_bson(&v).ok_or_else(|| agg_err(format!("{op} only supports numeric types, got {v}")))?;
        acc = f(acc, n);
    }
    Ok(acc.into_bson())
}

/// `$toString`: integral doubles print without a fractional part (1950.0 -> "1950").
///
/// # Errors
/// Returns an error for documents, arrays and other values without a string form.
pub fn to_display_string(v: &Bson) -> Result<Bson, DbError> {
    let s = match v {
        Bson::Null | Bson::Undefined => return Ok(Bson::Null),
        Bson::String(s) => s.clone(),
        Bson::Int32(i) => i.to_string(),
        Bson::Int64(i) => i.to_string(),
        Bson::Double(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{f:.0}"),
        Bson::Double(f) => f.to_string(),
        Bson::Decimal128(d) => d.to_string(),
        Bson::Boolean(b) => b.to_string(),
        Bson::ObjectId(o) => o.to_hex(),
        Bson::DateTime(dt) => dt.try_to_rfc3339_string().map_err(|e| agg_err(e.to_string()))?,
        other => return Err(agg_err(format!("unsupported conversion to string from {other}"))),
    };
    Ok(Bson::String(s))
}

/// Decade label for a year, e.g. 1949 -> `"1940s"`.
#[must_use]
pub fn decade_label(year: i64) -> String {
    format!("{}s", year.div_euclid(10) * 10)
}

/// Hashable form of a group key. Numbers compare by value so 12 and 12.0 share a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum GroupKey {
    Null,
    Num(OrderedFloat<f64>),
    Str(String),
    Bool(bool),
    Doc(Vec<(String, GroupKey)>),
    Array(Vec<GroupKey>),
    Other(String),
}

impl GroupKey {
    pub(crate) fn from_bson(v: &Bson) -> Self {
        match v {
            Bson::Null | Bson::Undefined => Self::Null,
            Bson::String(s) => Self::Str(s.clone()),
            Bson::Boolean(b) => Self::Bool(*b),
            Bson::Document(d) => Self::Doc(d.iter().map(|(k, v)| (k.clone(), Self::from_bson(v))).collect()),
            Bson::Array(a) => Self::Array(a.iter().map(Self::from_bson).collect()),
            other => as_f64(other).map_or_else(|| Self::Other(format!("{other:?}")), |f| Self::Num(OrderedFloat(f))),
        }
    }
}
