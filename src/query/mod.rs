pub mod telemetry;

mod cursor;
mod eval;
mod exec;
mod explain;
mod parse;
mod types;

pub use cursor::Cursor;
pub use eval::{
    compare_bson, compare_docs, compare_documents, eval_document, eval_filter, get_path, project_document,
    project_fields, values_equal,
};
pub(crate) use exec::paginate;
pub use exec::{
    apply_update, count_docs, delete_many, delete_one, find_docs, find_documents, find_one, to_row,
    update_many, update_one,
};
pub use explain::{ExecutionStats, ExplainReport, ExplainVerbosity, PlanStage, QueryPlanner, explain_find};
pub use parse::{
    parse_filter, parse_filter_json, parse_projection, parse_projection_json, parse_sort,
    parse_sort_json, parse_update, parse_update_json,
};
pub use types::{
    CmpOp, DeleteReport, Filter, FindOptions, Order, Projection, ProjectionMode, SortSpec,
    UpdateDoc, UpdateReport,
};
