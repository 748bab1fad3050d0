//! Query timing and write auditing. Lines go through the `log` facade to the metrics and
//! audit targets configured in `utils::logger`; counters are process-wide.

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::utils::logger::{AUDIT_TARGET, METRICS_TARGET};

pub const DEFAULT_SLOW_QUERY_MS: u64 = 500;

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub slow_query_ms: u64,
    pub enable_audit: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { slow_query_ms: DEFAULT_SLOW_QUERY_MS, enable_audit: true }
    }
}

#[derive(Default)]
pub struct Metrics {
    pub queries_total: AtomicU64,
    pub queries_slow_total: AtomicU64,
    pub writes_total: AtomicU64,
    pub aggregations_total: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub queries_total: u64,
    pub queries_slow_total: u64,
    pub writes_total: u64,
    pub aggregations_total: u64,
}

#[derive(Default)]
pub struct Telemetry {
    pub cfg: RwLock<TelemetryConfig>,
    pub metrics: Metrics,
    audit_sink: RwLock<Option<Arc<RwLock<Vec<String>>>>>,
}

pub(crate) static TELEMETRY: std::sync::LazyLock<Telemetry> =
    std::sync::LazyLock::new(Telemetry::default);

pub fn set_slow_query_ms(ms: u64) {
    TELEMETRY.cfg.write().slow_query_ms = ms;
}

#[must_use]
pub fn slow_query_ms() -> u64 {
    TELEMETRY.cfg.read().slow_query_ms
}

pub fn set_audit_enabled(enabled: bool) {
    TELEMETRY.cfg.write().enable_audit = enabled;
}

/// Capture audit lines in memory in addition to logging them.
pub fn set_audit_sink_for_tests(sink: Arc<RwLock<Vec<String>>>) {
    *TELEMETRY.audit_sink.write() = Some(sink);
}

fn now_ts() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Record one read. Returns true when the query crossed the slow threshold.
pub fn log_query(collection: &str, kind: &str, filter_dbg: &str, duration_ms: u128, returned: usize) -> bool {
    TELEMETRY.metrics.queries_total.fetch_add(1, Ordering::Relaxed);
    if kind == "aggregate" {
        TELEMETRY.metrics.aggregations_total.fetch_add(1, Ordering::Relaxed);
    }
    let threshold = TELEMETRY.cfg.read().slow_query_ms;
    let slow = u64::try_from(duration_ms).map_or(true, |ms| ms >= threshold);
    let line = serde_json::json!({
        "ts": now_ts(),
        "collection": collection,
        "kind": kind,
        "filter": filter_dbg,
        "duration_ms": u64::try_from(duration_ms).unwrap_or(u64::MAX),
        "returned": returned,
        "slow": slow,
    })
    .to_string();
    if slow {
        TELEMETRY.metrics.queries_slow_total.fetch_add(1, Ordering::Relaxed);
        log::warn!(target: METRICS_TARGET, "{line}");
    } else {
        log::info!(target: METRICS_TARGET, "{line}");
    }
    slow
}

/// Record one write against `collection`.
pub fn log_audit(op: &str, collection: &str, doc_id: &str) {
    TELEMETRY.metrics.writes_total.fetch_add(1, Ordering::Relaxed);
    if !TELEMETRY.cfg.read().enable_audit {
        return;
    }
    let line = serde_json::json!({
        "ts": now_ts(), "op": op, "collection": collection, "doc_id": doc_id
    })
    .to_string();
    let sink = TELEMETRY.audit_sink.read().clone();
    if let Some(sink) = sink {
        sink.write().push(line.clone());
    }
    log::info!(target: AUDIT_TARGET, "{line}");
}

#[must_use]
pub fn metrics_snapshot() -> MetricsSnapshot {
    let m = &TELEMETRY.metrics;
    MetricsSnapshot {
        queries_total: m.queries_total.load(Ordering::Relaxed),
        queries_slow_total: m.queries_slow_total.load(Ordering::Relaxed),
        writes_total: m.writes_total.load(Ordering::Relaxed),
        aggregations_total: m.aggregations_total.load(Ordering::Relaxed),
    }
}

/// Counters in Prometheus text exposition format.
#[must_use]
pub fn metrics_text() -> String {
    let m = metrics_snapshot();
    format!(
        "bookshelf_queries_total {}\n\
         bookshelf_queries_slow_total {}\n\
         bookshelf_writes_total {}\n\
         bookshelf_aggregations_total {}\n",
        m.queries_total, m.queries_slow_total, m.writes_total, m.aggregations_total,
    )
}
