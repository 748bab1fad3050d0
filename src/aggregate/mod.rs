//! Aggregation pipelines: `$match`, `$group`, `$sort`, `$skip`, `$limit` and `$project`
//! over the rows of one collection.

mod exec;
mod expr;
mod parse;
mod types;

pub use exec::{aggregate, run_stages};
pub use expr::{decade_label, eval_expr, to_display_string};
pub use parse::{parse_expr, parse_pipeline, parse_pipeline_json};
pub use types::{Accumulator, Expr, GroupStage, Pipeline, Stage};
