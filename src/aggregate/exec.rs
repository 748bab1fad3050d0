use bson::{Bson, Document as BsonDocument};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Instant;

use super::expr::{GroupKey, eval_expr};
use super::types::{Accumulator, GroupStage, MAX_PIPELINE_STAGES, Pipeline, Stage};
use crate::collection::Collection;
use crate::document::ID_FIELD;
use crate::errors::DbError;
use crate::query::{Filter, compare_bson, compare_docs, eval_filter, paginate, project_fields, telemetry, to_row};
use crate::utils::num::{as_f64, int_bson, u128_to_u64, usize_to_u64};

/// Run `pipeline` over the documents of `col`, in natural order.
///
/// # Errors
/// Returns `DbError::AggregateError` if an expression fails or the pipeline is too long.
pub fn aggregate(col: &Collection, pipeline: &Pipeline) -> Result<Vec<BsonDocument>, DbError> {
    if pipeline.stages.len() > MAX_PIPELINE_STAGES {
        return Err(DbError::AggregateError(format!("pipeline exceeds {MAX_PIPELINE_STAGES} stages")));
    }
    let start = Instant::now();
    // A leading $match can use the collection's indexes.
    let (leading, rest) = match pipeline.stages.split_first() {
        Some((Stage::Match(f), rest)) => (f.clone(), rest),
        _ => (Filter::True, pipeline.stages.as_slice()),
    };
    let sel = crate::query::find_documents(col, &leading, &crate::query::FindOptions::default());
    let rows: Vec<BsonDocument> = sel.iter().map(|d| to_row(d, None)).collect();
    let out = run_stages(rows, rest)?;
    let dur_ms = start.elapsed().as_millis();
    crate::devlog!(
        "{{\"bench\":\"aggregate\",\"collection\":\"{}\",\"stages\":{},\"duration_ms\":{},\"result_count\":{}}}",
        col.name,
        usize_to_u64(pipeline.stages.len()),
        u128_to_u64(dur_ms),
        usize_to_u64(out.len())
    );
    telemetry::log_query(&col.name, "aggregate", &format!("{:?}", pipeline.stages), dur_ms, out.len());
    Ok(out)
}

/// Run stages over already materialized rows.
///
/// # Errors
/// Returns `DbError::AggregateError` if an expression fails.
pub fn run_stages(mut rows: Vec<BsonDocument>, stages: &[Stage]) -> Result<Vec<BsonDocument>, DbError> {
    for stage in stages {
        rows = match stage {
            Stage::Match(f) => rows.into_iter().filter(|r| eval_filter(r, f)).collect(),
            Stage::Group(g) => group(&rows, g)?,
            Stage::Sort(keys) => {
                rows.sort_by(|a, b| compare_docs(a, b, keys));
                rows
            }
            Stage::Skip(n) => paginate(rows, Some(*n), None),
            Stage::Limit(n) => paginate(rows, None, Some(*n)),
            Stage::Project(p) => rows.iter().map(|r| project_fields(r, p)).collect(),
        };
    }
    Ok(rows)
}

#[derive(Debug)]
enum AccState {
    Sum { int: i64, float: f64, is_float: bool },
    Avg { total: f64, n: u64 },
    Min(Option<Bson>),
    Max(Option<Bson>),
    First(Option<Bson>),
    Last(Bson),
}

impl AccState {
    fn new(acc: &Accumulator) -> Self {
        match acc {
            Accumulator::Sum(_) => Self::Sum { int: 0, float: 0.0, is_float: false },
            Accumulator::Avg(_) => Self::Avg { total: 0.0, n: 0 },
            Accumulator::Min(_) => Self::Min(None),
            Accumulator::Max(_) => Self::Max(None),
            Accumulator::First(_) => Self::First(None),
            Accumulator::Last(_) => Self::Last(Bson::Null),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn push(&mut self, v: Bson) {
        match self {
            Self::Sum { int, float, is_float } => match v {
                Bson::Int32(_) | Bson::Int64(_) => {
                    let i = crate::utils::num::as_i64(&v).unwrap_or(0);
                    match int.checked_add(i) {
                        Some(s) => *int = s,
                        None => {
                            *is_float = true;
                            *float += i as f64;
                        }
                    }
                }
                other => {
                    if let Some(f) = as_f64(&other) {
                        *is_float = true;
                        *float += f;
                    }
                }
            },
            Self::Avg { total, n } => {
                if let Some(f) = as_f64(&v) {
                    *total += f;
                    *n += 1;
                }
            }
            Self::Min(cur) => {
                if !matches!(v, Bson::Null | Bson::Undefined)
                    && cur.as_ref().is_none_or(|c| compare_bson(&v, c) == Ordering::Less)
                {
                    *cur = Some(v);
                }
            }
            Self::Max(cur) => {
                if !matches!(v, Bson::Null | Bson::Undefined)
                    && cur.as_ref().is_none_or(|c| compare_bson(&v, c) == Ordering::Greater)
                {
                    *cur = Some(v);
                }
            }
            Self::First(cur) => {
                if cur.is_none() {
                    *cur = Some(v);
                }
            }
            Self::Last(cur) => *cur = v,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish(self) -> Bson {
        match self {
            Self::Sum { int, is_float: false, .. } => int_bson(int),
            Self::Sum { int, float, is_float: true } => Bson::Double(int as f64 + float),
            Self::Avg { n: 0, .. } => Bson::Null,
            Self::Avg { total, n } => Bson::Double(total / n as f64),
            Self::Min(v) | Self::Max(v) | Self::First(v) => v.unwrap_or(Bson::Null),
            Self::Last(v) => v,
        }
    }
}

const fn acc_expr(acc: &Accumulator) -> &super::types::Expr {
    match acc {
        Accumulator::Sum(e)
        | Accumulator::Avg(e)
        | Accumulator::Min(e)
        | Accumulator::Max(e)
        | Accumulator::First(e)
        | Accumulator::Last(e) => e,
    }
}

/// Groups come out in order of first appearance.
fn group(rows: &[BsonDocument], g: &GroupStage) -> Result<Vec<BsonDocument>, DbError> {
    let mut slots: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<(Bson, Vec<AccState>)> = Vec::new();
    for row in rows {
        let key = eval_expr(row, &g.key)?;
        let slot = *slots.entry(GroupKey::from_bson(&key)).or_insert_with(|| {
            groups.push((key.clone(), g.fields.iter().map(|(_, a)| AccState::new(a)).collect()));
            groups.len() - 1
        });
        for ((_, acc), state) in g.fields.iter().zip(groups[slot].1.iter_mut()) {
            state.push(eval_expr(row, acc_expr(acc))?);
        }
    }
    Ok(groups
        .into_iter()
        .map(|(key, states)| {
            let mut out = BsonDocument::new();
            out.insert(ID_FIELD, key);
            for ((name, _), state) in g.fields.iter().zip(states) {
                out.insert(name.clone(), state.finish());
            }
            out
        })
        .collect())
}
