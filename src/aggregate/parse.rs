use bson::{Bson, Document as BsonDocument};

use super::types::{Accumulator, Expr, GroupStage, MAX_EXPR_DEPTH, MAX_PIPELINE_STAGES, Pipeline, Stage};
use crate::document::ID_FIELD;
use crate::errors::DbError;
use crate::query::{parse_filter, parse_projection, parse_sort};
use crate::utils::json::parse_json_to_bson_array;
use crate::utils::num::bson_to_usize;

fn agg_err(msg: impl Into<String>) -> DbError {
    DbError::AggregateError(msg.into())
}

/// Parse `[{$group: {...}}, {$sort: {...}}, ...]`.
///
/// # Errors
/// Returns `DbError::AggregateError` for unknown stages or malformed arguments, and query
/// errors from `$match` / `$sort` / `$project` bodies.
pub fn parse_pipeline(stages: &[BsonDocument]) -> Result<Pipeline, DbError> {
    if stages.len() > MAX_PIPELINE_STAGES {
        return Err(agg_err(format!("pipeline exceeds {MAX_PIPELINE_STAGES} stages")));
    }
    let stages = stages.iter().map(parse_stage).collect::<Result<Vec<_>, _>>()?;
    Ok(Pipeline { stages })
}

/// # Errors
/// Returns an error if `json` is not an array of stage documents.
pub fn parse_pipeline_json(json: &str) -> Result<Pipeline, DbError> {
    parse_pipeline(&parse_json_to_bson_array(json)?)
}

fn parse_stage(doc: &BsonDocument) -> Result<Stage, DbError> {
    let mut it = doc.iter();
    let (Some((name, arg)), None) = (it.next(), it.next()) else {
        return Err(agg_err("a pipeline stage must have exactly one field"));
    };
    let body = || match arg {
        Bson::Document(d) => Ok(d),
        _ => Err(agg_err(format!("{name} expects a document"))),
    };
    let count = || {
        bson_to_usize(arg).ok_or_else(|| agg_err(format!("{name} expects a non-negative integer")))
    };
    match name.as_str() {
        "$match" => Ok(Stage::Match(parse_filter(body()?)?)),
        "$group" => parse_group(body()?).map(Stage::Group),
        "$sort" => {
            let keys = parse_sort(body()?)?;
            if keys.is_empty() {
                return Err(agg_err("$sort needs at least one key"));
            }
            Ok(Stage::Sort(keys))
        }
        "$skip" => count().map(Stage::Skip),
        "$limit" => match count()? {
            0 => Err(agg_err("$limit must be positive")),
            n => Ok(Stage::Limit(n)),
        },
        "$project" => Ok(Stage::Project(parse_projection(body()?)?)),
        other => Err(agg_err(format!("unsupported stage {other}"))),
    }
}

fn parse_group(doc: &BsonDocument) -> Result<GroupStage, DbError> {
    let key = doc.get(ID_FIELD).ok_or_else(|| agg_err("$group requires an _id expression"))?;
    let mut group = GroupStage::by(parse_expr(key)?);
    for (name, spec) in doc {
        if name == ID_FIELD {
            continue;
        }
        if name.starts_with('$') || name.contains('.') {
            return Err(agg_err(format!("invalid output field '{name}'")));
        }
        let Bson::Document(spec) = spec else {
            return Err(agg_err(format!("'{name}' must be an accumulator object")));
        };
        let mut it = spec.iter();
        let (Some((op, arg)), None) = (it.next(), it.next()) else {
            return Err(agg_err(format!("'{name}' must name exactly one accumulator")));
        };
        let e = parse_expr(arg)?;
        let acc = match op.as_str() {
            "$sum" => Accumulator::Sum(e),
            "$avg" => Accumulator::Avg(e),
            "$min" => Accumulator::Min(e),
            "$max" => Accumulator::Max(e),
            "$first" => Accumulator::First(e),
            "$last" => Accumulator::Last(e),
            other => return Err(agg_err(format!("unknown accumulator {other}"))),
        };
        group.fields.push((name.clone(), acc));
    }
    Ok(group)
}

/// Parse an expression: `"$field"`, a literal, an operator object or an embedded document.
///
/// # Errors
/// Returns `DbError::AggregateError` for unknown operators or wrong arities.
pub fn parse_expr(v: &Bson) -> Result<Expr, DbError> {
    parse_expr_at(v, 0)
}

fn parse_expr_at(v: &Bson, depth: usize) -> Result<Expr, DbError> {
    if depth > MAX_EXPR_DEPTH {
        return Err(agg_err("expression nested too deeply"));
    }
    match v {
        Bson::String(s) if s.starts_with("$$") => Err(agg_err(format!("variables are not supported: {s}"))),
        Bson::String(s) if s.starts_with('$') => match &s[1..] {
            "" => Err(agg_err("empty field path")),
            path => Ok(Expr::Field(path.to_string())),
        },
        Bson::Document(d) if d.keys().next().is_some_and(|k| k.starts_with('$')) => parse_operator(d, depth),
        Bson::Document(d) => d
            .iter()
            .map(|(k, v)| parse_expr_at(v, depth + 1).map(|e| (k.clone(), e)))
            .collect::<Result<Vec<_>, _>>()
            .map(Expr::Object),
        other => Ok(Expr::Literal(other.clone())),
    }
}

fn parse_operator(d: &BsonDocument, depth: usize) -> Result<Expr, DbError> {
    let mut it = d.iter();
    let (Some((op, arg)), None) = (it.next(), it.next()) else {
        return Err(agg_err("an expression object must have exactly one operator"));
    };
    let list = || -> Result<Vec<Expr>, DbError> {
        match arg {
            Bson::Array(items) => items.iter().map(|i| parse_expr_at(i, depth + 1)).collect(),
            _ => Err(agg_err(format!("{op} expects an array"))),
        }
    };
    // unary operators accept `x` or `[x]`
    let unary = || -> Result<Box<Expr>, DbError> {
        match arg {
            Bson::Array(items) if items.len() == 1 => Ok(Box::new(parse_expr_at(&items[0], depth + 1)?)),
            Bson::Array(_) => Err(agg_err(format!("{op} takes exactly one argument"))),
            other => Ok(Box::new(parse_expr_at(other, depth + 1)?)),
        }
    };
    match op.as_str() {
        "$literal" => Ok(Expr::Literal(arg.clone())),
        "$concat" => list().map(Expr::Concat),
        "$add" => list().map(Expr::Add),
        "$multiply" => list().map(Expr::Multiply),
        "$divide" => {
            let mut args = list()?;
            if args.len() != 2 {
                return Err(agg_err("$divide takes exactly two arguments"));
            }
            let b = args.pop();
            let a = args.pop();
            match (a, b) {
                (Some(a), Some(b)) => Ok(Expr::Divide(Box::new(a), Box::new(b))),
                _ => Err(agg_err("$divide takes exactly two arguments")),
            }
        }
        "$floor" => unary().map(Expr::Floor),
        "$toString" => unary().map(Expr::ToString),
        other => Err(agg_err(format!("unknown expression operator {other}"))),
    }
}
