//! Query plan reports in the shape of MongoDB's `explain()` output.

use bson::Document as BsonDocument;
use serde::Serialize;
use std::str::FromStr;
use std::time::Instant;

use super::exec::{order_and_page, select};
use super::types::{Filter, FindOptions};
use crate::collection::Collection;
use crate::errors::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ExplainVerbosity {
    QueryPlanner,
    ExecutionStats,
}

impl FromStr for ExplainVerbosity {
    type Err = DbError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queryPlanner" => Ok(Self::QueryPlanner),
            "executionStats" => Ok(Self::ExecutionStats),
            other => Err(DbError::QueryError(format!("unknown explain verbosity '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStage {
    pub stage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_pattern: Option<BsonDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_stage: Option<Box<PlanStage>>,
}

impl PlanStage {
    fn leaf(stage: &str) -> Self {
        Self { stage: stage.to_string(), index_name: None, key_pattern: None, input_stage: None }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPlanner {
    pub namespace: String,
    pub parsed_query: String,
    pub winning_plan: PlanStage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStats {
    pub n_returned: u64,
    pub total_keys_examined: u64,
    pub total_docs_examined: u64,
    pub execution_time_millis: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainReport {
    pub query_planner: QueryPlanner,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_stats: Option<ExecutionStats>,
}

impl ExplainReport {
    /// Name of the index the winning plan scans, if any.
    #[must_use]
    pub fn index_used(&self) -> Option<&str> {
        let mut stage = Some(&self.query_planner.winning_plan);
        while let Some(s) = stage {
            if let Some(name) = &s.index_name {
                return Some(name);
            }
            stage = s.input_stage.as_deref();
        }
        None
    }

    /// Stage names from the root down, e.g. `["FETCH", "IXSCAN"]`.
    #[must_use]
    pub fn stages(&self) -> Vec<&str> {
        let mut out = Vec::new();
        let mut stage = Some(&self.query_planner.winning_plan);
        while let Some(s) = stage {
            out.push(s.stage.as_str());
            stage = s.input_stage.as_deref();
        }
        out
    }

    /// # Errors
    /// Returns `DbError::Json` if serialization fails.
    pub fn to_json(&self) -> Result<String, DbError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Plan (and with `ExecutionStats`, run) a find without returning its rows.
#[must_use]
pub fn explain_find(
    col: &Collection,
    filter: &Filter,
    opts: &FindOptions,
    verbosity: ExplainVerbosity,
) -> ExplainReport {
    let start = Instant::now();
    let winning_plan = match col.indexes.read().plan(filter) {
        Some(p) => PlanStage {
            input_stage: Some(Box::new(PlanStage {
                stage: "IXSCAN".into(),
                index_name: Some(p.index_name),
                key_pattern: Some(p.key_pattern),
                input_stage: None,
            })),
            ..PlanStage::leaf("FETCH")
        },
        None => PlanStage::leaf("COLLSCAN"),
    };
    let query_planner =
        QueryPlanner { namespace: col.name.clone(), parsed_query: format!("{filter:?}"), winning_plan };
    let execution_stats = (verbosity == ExplainVerbosity::ExecutionStats).then(|| {
        let mut sel = select(col, filter, None);
        let returned = order_and_page(std::mem::take(&mut sel.docs), opts).len();
        ExecutionStats {
            n_returned: crate::utils::num::usize_to_u64(returned),
            total_keys_examined: crate::utils::num::usize_to_u64(sel.keys_examined),
            total_docs_examined: crate::utils::num::usize_to_u64(sel.docs_examined),
            execution_time_millis: crate::utils::num::u128_to_u64(start.elapsed().as_millis()),
        }
    });
    ExplainReport { query_planner, execution_stats }
}
