//! SQL plan construction for the query API.
//!
//! Plans are plain data: a statement with `?` placeholders plus the bind
//! values in order. Building them is pure so the routing rules (rollup
//! selection, aggregation rewrite, filter accretion, limit defaults) are
//! testable without a store. Caller input only ever travels through binds,
//! never through string interpolation.

use crate::error::QueryError;
use crate::query::envelope::{LogsRequest, MetricsRequest, TracesRequest};

/// Default row limit for trace and log queries.
pub const DEFAULT_LIMIT: u64 = 100;

/// Window age (from now back to the requested start) beyond which reads
/// leave the raw table.
pub const RAW_WINDOW_DAYS: u64 = 30;

/// Window age beyond which reads leave the 5-minute rollup for the 1-hour
/// rollup.
pub const ROLLUP_5M_WINDOW_DAYS: u64 = 90;

const DAY_NS: u64 = 86_400 * 1_000_000_000;

const SPAN_COLUMNS: &str = "timestamp, trace_id, span_id, parent_span_id, span_name, span_kind, \
     service_name, start_time, end_time, duration_ns, status_code, status_message, \
     attributes, resource_attributes, events, links, scope_name, scope_version";

const LOG_COLUMNS: &str = "timestamp, observed_timestamp, severity_number, severity_text, body, \
     body_type, service_name, host_name, trace_id, span_id, trace_flags, attributes, \
     resource_attributes, scope_name, scope_version";

/// A bind value in statement order.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Str(String),
    I64(i64),
    U64(u64),
}

/// A statement plus its binds, ready for the store client.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub sql: String,
    pub binds: Vec<BindValue>,
}

/// Accreted filter predicates. Unspecified filters are omitted entirely,
/// never defaulted to wildcards.
#[derive(Debug, Default)]
struct FilterSet {
    predicates: Vec<String>,
    binds: Vec<BindValue>,
}

impl FilterSet {
    fn push(&mut self, predicate: &str, bind: BindValue) {
        self.predicates.push(predicate.to_string());
        self.binds.push(bind);
    }

    fn where_clause(&self) -> String {
        if self.predicates.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.predicates.join(" AND "))
        }
    }
}

/// Physical source for a metrics read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsTable {
    Raw,
    Rollup5m,
    Rollup1h,
}

impl MetricsTable {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            MetricsTable::Raw => "otel_metrics",
            MetricsTable::Rollup5m => "otel_metrics_5m",
            MetricsTable::Rollup1h => "otel_metrics_1h",
        }
    }
}

/// Pick the physical table by how far back the window starts.
#[must_use]
pub fn select_metrics_table(start_time_ns: u64, now_ns: u64) -> MetricsTable {
    let age_ns = now_ns.saturating_sub(start_time_ns);
    if age_ns <= RAW_WINDOW_DAYS * DAY_NS {
        MetricsTable::Raw
    } else if age_ns <= ROLLUP_5M_WINDOW_DAYS * DAY_NS {
        MetricsTable::Rollup5m
    } else {
        MetricsTable::Rollup1h
    }
}

/// Requested aggregation over metric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Avg,
    Min,
    Max,
    Sum,
}

impl Aggregation {
    /// Parse the request field; absent means `avg`, anything outside the
    /// supported set is a bad request.
    pub fn parse(raw: Option<&str>) -> Result<Self, QueryError> {
        match raw {
            None | Some("avg") => Ok(Aggregation::Avg),
            Some("min") => Ok(Aggregation::Min),
            Some("max") => Ok(Aggregation::Max),
            Some("sum") => Ok(Aggregation::Sum),
            Some(other) => Err(QueryError::BadRequest(format!(
                "unsupported aggregation {other:?}, expected one of avg, min, max, sum"
            ))),
        }
    }

    /// Value expression over the raw table.
    #[must_use]
    pub fn raw_expr(self) -> &'static str {
        match self {
            Aggregation::Avg => "avg(value)",
            Aggregation::Min => "min(value)",
            Aggregation::Max => "max(value)",
            Aggregation::Sum => "sum(value)",
        }
    }

    /// Rewritten expression over the pre-aggregated rollup columns.
    #[must_use]
    pub fn rollup_expr(self) -> &'static str {
        match self {
            Aggregation::Avg => "avg(value_avg)",
            Aggregation::Min => "min(value_min)",
            Aggregation::Max => "max(value_max)",
            Aggregation::Sum => "sum(value_sum)",
        }
    }
}

/// Build the metrics read: table by window age, aggregation rewritten for
/// rollups, fixed 5-minute buckets whatever the source table.
pub fn metrics_plan(req: &MetricsRequest, now_ns: u64) -> Result<QueryPlan, QueryError> {
    if req.end_time < req.start_time {
        return Err(QueryError::BadRequest(
            "end_time precedes start_time".to_string(),
        ));
    }
    let aggregation = Aggregation::parse(req.aggregation.as_deref())?;
    let table = select_metrics_table(req.start_time, now_ns);
    let value_expr = match table {
        MetricsTable::Raw => aggregation.raw_expr(),
        MetricsTable::Rollup5m | MetricsTable::Rollup1h => aggregation.rollup_expr(),
    };

    let mut filters = FilterSet::default();
    filters.push("metric_name = ?", BindValue::Str(req.metric_name.clone()));
    filters.push(
        "timestamp >= fromUnixTimestamp64Nano(?)",
        BindValue::I64(req.start_time as i64),
    );
    filters.push(
        "timestamp <= fromUnixTimestamp64Nano(?)",
        BindValue::I64(req.end_time as i64),
    );
    if let Some(service_name) = &req.service_name {
        filters.push("service_name = ?", BindValue::Str(service_name.clone()));
    }

    let sql = format!(
        "SELECT toUnixTimestamp(toStartOfFiveMinutes(timestamp)) AS bucket, {value_expr} AS value \
         FROM {table}{where_clause} GROUP BY bucket ORDER BY bucket",
        table = table.name(),
        where_clause = filters.where_clause(),
    );

    Ok(QueryPlan {
        sql,
        binds: filters.binds,
    })
}

/// Build the trace search. `window` optionally narrows the scan when the
/// caller filtered by trace id and the trace index knows the trace bounds.
#[must_use]
pub fn traces_plan(req: &TracesRequest, window: Option<(u64, u64)>) -> QueryPlan {
    let mut filters = FilterSet::default();
    if let Some(trace_id) = &req.trace_id {
        filters.push("trace_id = ?", BindValue::Str(trace_id.clone()));
    }
    if let Some(service_name) = &req.service_name {
        filters.push("service_name = ?", BindValue::Str(service_name.clone()));
    }
    let (start_time, end_time) = match (req.start_time, req.end_time) {
        (start, end) if start.is_some() || end.is_some() => (start, end),
        _ => (window.map(|w| w.0), window.map(|w| w.1)),
    };
    if let Some(start) = start_time {
        filters.push(
            "timestamp >= fromUnixTimestamp64Nano(?)",
            BindValue::I64(start as i64),
        );
    }
    if let Some(end) = end_time {
        filters.push(
            "timestamp <= fromUnixTimestamp64Nano(?)",
            BindValue::I64(end as i64),
        );
    }
    if let Some(min_duration) = req.min_duration {
        filters.push("duration_ns >= ?", BindValue::U64(min_duration));
    }
    if let Some(max_duration) = req.max_duration {
        filters.push("duration_ns <= ?", BindValue::U64(max_duration));
    }

    let sql = format!(
        "SELECT {SPAN_COLUMNS} FROM otel_traces{where_clause} \
         ORDER BY timestamp DESC LIMIT {limit}",
        where_clause = filters.where_clause(),
        limit = req.limit.unwrap_or(DEFAULT_LIMIT),
    );

    QueryPlan {
        sql,
        binds: filters.binds,
    }
}

/// Build the log search.
#[must_use]
pub fn logs_plan(req: &LogsRequest) -> QueryPlan {
    let mut filters = FilterSet::default();
    filters.push(
        "timestamp >= fromUnixTimestamp64Nano(?)",
        BindValue::I64(req.start_time as i64),
    );
    filters.push(
        "timestamp <= fromUnixTimestamp64Nano(?)",
        BindValue::I64(req.end_time as i64),
    );
    if let Some(service_name) = &req.service_name {
        filters.push("service_name = ?", BindValue::Str(service_name.clone()));
    }
    if let Some(severity) = &req.severity {
        filters.push("severity_text = ?", BindValue::Str(severity.clone()));
    }
    if let Some(search_text) = &req.search_text {
        filters.push(
            "body LIKE concat('%', ?, '%')",
            BindValue::Str(search_text.clone()),
        );
    }
    if let Some(trace_id) = &req.trace_id {
        filters.push("trace_id = ?", BindValue::Str(trace_id.clone()));
    }

    let sql = format!(
        "SELECT {LOG_COLUMNS} FROM otel_logs{where_clause} \
         ORDER BY timestamp DESC LIMIT {limit}",
        where_clause = filters.where_clause(),
        limit = req.limit.unwrap_or(DEFAULT_LIMIT),
    );

    QueryPlan {
        sql,
        binds: filters.binds,
    }
}

/// Build the service stats read: fixed one-hour lookback over raw spans.
#[must_use]
pub fn service_stats_plan() -> QueryPlan {
    QueryPlan {
        sql: "SELECT service_name, count() AS span_count, avg(duration_ns) AS avg_duration_ns, \
              quantile(0.95)(duration_ns) AS p95_duration_ns, \
              countIf(status_code = 'error') AS error_count \
              FROM otel_traces WHERE timestamp >= now() - INTERVAL 1 HOUR \
              GROUP BY service_name ORDER BY span_count DESC"
            .to_string(),
        binds: Vec::new(),
    }
}

/// Look up the per-trace roll-up row for one trace.
#[must_use]
pub fn trace_index_plan(trace_id: &str) -> QueryPlan {
    QueryPlan {
        sql: "SELECT trace_id, start_time, end_time, service_names, root_service_name, \
              root_span_name, duration_ns, span_count, has_error \
              FROM otel_trace_index WHERE trace_id = ? LIMIT 1"
            .to_string(),
        binds: vec![BindValue::Str(trace_id.to_string())],
    }
}
