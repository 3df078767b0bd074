//! Query execution against the columnar store.
//!
//! Plans are built by [`crate::query::plan`]; this adapter binds their
//! parameters, streams rows back, and decodes them into response envelopes.

use chrono::Utc;
use clickhouse::Client;
use serde::Deserialize;
use tracing::debug;

use crate::adapter::clickhouse::convert::{fixed_bytes_to_string, pairs_to_map};
use crate::adapter::clickhouse::rows::{EventTuple, LinkTuple};
use crate::domain::TraceIndex;
use crate::error::QueryError;
use crate::port::{BoxFuture, TelemetryReader};
use crate::query::envelope::{
    DataPoint, LogView, LogsRequest, LogsResponse, MetricsRequest, MetricsResponse, ServiceStat,
    SpanEventView, SpanLinkView, SpanView, TracesRequest, TracesResponse,
};
use crate::query::plan::{self, BindValue, QueryPlan};

/// Read-side adapter sharing the pooled client with the writer.
pub struct ClickHouseReader {
    client: Client,
}

impl ClickHouseReader {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn bound_query(&self, query_plan: &QueryPlan) -> clickhouse::query::Query {
        let mut query = self.client.query(&query_plan.sql);
        for bind in &query_plan.binds {
            query = match bind {
                BindValue::Str(s) => query.bind(s.as_str()),
                BindValue::I64(v) => query.bind(*v),
                BindValue::U64(v) => query.bind(*v),
            };
        }
        query
    }

    /// Look up the trace roll-up to bound a single-trace scan. The index is
    /// an optimization; lookup failures degrade to an unbounded scan.
    async fn trace_window(&self, trace_id: &str) -> Option<(u64, u64)> {
        let query_plan = plan::trace_index_plan(trace_id);
        match self
            .bound_query(&query_plan)
            .fetch_optional::<TraceIndexRow>()
            .await
        {
            Ok(Some(row)) => {
                let index = TraceIndex::from(row);
                Some((index.start_time, index.end_time))
            }
            Ok(None) => None,
            Err(e) => {
                debug!(error = %e, "trace index lookup failed, scanning unbounded");
                None
            }
        }
    }
}

impl TelemetryReader for ClickHouseReader {
    fn query_traces(&self, req: TracesRequest) -> BoxFuture<'_, Result<TracesResponse, QueryError>> {
        Box::pin(async move {
            let window = match (&req.trace_id, req.start_time, req.end_time) {
                (Some(trace_id), None, None) => self.trace_window(trace_id).await,
                _ => None,
            };
            let query_plan = plan::traces_plan(&req, window);

            let mut cursor = self.bound_query(&query_plan).fetch::<QuerySpanRow>()?;
            let mut spans = Vec::new();
            while let Some(row) = cursor.next().await? {
                spans.push(SpanView::from(row));
            }
            let total = spans.len() as u64;
            Ok(TracesResponse { spans, total })
        })
    }

    fn query_metrics(
        &self,
        req: MetricsRequest,
    ) -> BoxFuture<'_, Result<MetricsResponse, QueryError>> {
        Box::pin(async move {
            let now_ns = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX) as u64;
            let query_plan = plan::metrics_plan(&req, now_ns)?;

            let mut cursor = self.bound_query(&query_plan).fetch::<MetricBucketRow>()?;
            let mut data_points = Vec::new();
            while let Some(row) = cursor.next().await? {
                data_points.push(DataPoint {
                    timestamp: u64::from(row.bucket) * 1_000_000_000,
                    value: row.value,
                });
            }
            Ok(MetricsResponse {
                metric_name: req.metric_name,
                data_points,
            })
        })
    }

    fn query_logs(&self, req: LogsRequest) -> BoxFuture<'_, Result<LogsResponse, QueryError>> {
        Box::pin(async move {
            let query_plan = plan::logs_plan(&req);

            let mut cursor = self.bound_query(&query_plan).fetch::<QueryLogRow>()?;
            let mut logs = Vec::new();
            while let Some(row) = cursor.next().await? {
                logs.push(LogView::from(row));
            }
            let total = logs.len() as u64;
            Ok(LogsResponse { logs, total })
        })
    }

    fn service_stats(&self) -> BoxFuture<'_, Result<Vec<ServiceStat>, QueryError>> {
        Box::pin(async move {
            let query_plan = plan::service_stats_plan();
            let rows = self
                .bound_query(&query_plan)
                .fetch_all::<ServiceStatRow>()
                .await?;
            Ok(rows.into_iter().map(ServiceStat::from).collect())
        })
    }
}

// =========================================================================
// Result row shapes. Field order matches the SELECT column lists in
// `query::plan`; RowBinary decoding is positional.
// =========================================================================

#[derive(clickhouse::Row, Deserialize, Debug)]
struct QuerySpanRow {
    timestamp: i64,
    trace_id: [u8; 32],
    span_id: [u8; 16],
    parent_span_id: String,
    span_name: String,
    span_kind: String,
    service_name: String,
    start_time: i64,
    end_time: i64,
    duration_ns: u64,
    status_code: String,
    status_message: String,
    attributes: Vec<(String, String)>,
    resource_attributes: Vec<(String, String)>,
    events: Vec<EventTuple>,
    links: Vec<LinkTuple>,
    scope_name: String,
    scope_version: String,
}

impl From<QuerySpanRow> for SpanView {
    fn from(row: QuerySpanRow) -> Self {
        let events = row
            .events
            .into_iter()
            .map(|(timestamp, name, attributes)| SpanEventView {
                timestamp: timestamp.max(0) as u64,
                name,
                attributes: pairs_to_map(attributes),
            })
            .collect();
        let links = row
            .links
            .into_iter()
            .map(|(trace_id, span_id, trace_state, attributes)| SpanLinkView {
                trace_id,
                span_id,
                trace_state,
                attributes: pairs_to_map(attributes),
            })
            .collect();

        Self {
            timestamp: row.timestamp.max(0) as u64,
            trace_id: fixed_bytes_to_string(&row.trace_id),
            span_id: fixed_bytes_to_string(&row.span_id),
            parent_span_id: row.parent_span_id,
            span_name: row.span_name,
            span_kind: row.span_kind,
            service_name: row.service_name,
            start_time: row.start_time.max(0) as u64,
            end_time: row.end_time.max(0) as u64,
            duration_ns: row.duration_ns,
            status_code: row.status_code,
            status_message: row.status_message,
            attributes: pairs_to_map(row.attributes),
            resource_attributes: pairs_to_map(row.resource_attributes),
            events,
            links,
            scope_name: row.scope_name,
            scope_version: row.scope_version,
        }
    }
}

#[derive(clickhouse::Row, Deserialize, Debug)]
struct QueryLogRow {
    timestamp: i64,
    observed_timestamp: i64,
    severity_number: u8,
    severity_text: String,
    body: String,
    body_type: String,
    service_name: String,
    host_name: String,
    trace_id: [u8; 32],
    span_id: [u8; 16],
    trace_flags: u8,
    attributes: Vec<(String, String)>,
    resource_attributes: Vec<(String, String)>,
    scope_name: String,
    scope_version: String,
}

impl From<QueryLogRow> for LogView {
    fn from(row: QueryLogRow) -> Self {
        Self {
            timestamp: row.timestamp.max(0) as u64,
            observed_timestamp: row.observed_timestamp.max(0) as u64,
            severity_number: row.severity_number,
            severity_text: row.severity_text,
            body: row.body,
            body_type: row.body_type,
            service_name: row.service_name,
            host_name: row.host_name,
            trace_id: fixed_bytes_to_string(&row.trace_id),
            span_id: fixed_bytes_to_string(&row.span_id),
            trace_flags: row.trace_flags,
            attributes: pairs_to_map(row.attributes),
            resource_attributes: pairs_to_map(row.resource_attributes),
            scope_name: row.scope_name,
            scope_version: row.scope_version,
        }
    }
}

#[derive(clickhouse::Row, Deserialize, Debug)]
struct MetricBucketRow {
    bucket: u32,
    value: f64,
}

#[derive(clickhouse::Row, Deserialize, Debug)]
struct ServiceStatRow {
    service_name: String,
    span_count: u64,
    avg_duration_ns: f64,
    p95_duration_ns: f64,
    error_count: u64,
}

impl From<ServiceStatRow> for ServiceStat {
    fn from(row: ServiceStatRow) -> Self {
        Self {
            service_name: row.service_name,
            span_count: row.span_count,
            avg_duration_ns: row.avg_duration_ns,
            p95_duration_ns: row.p95_duration_ns,
            error_count: row.error_count,
        }
    }
}

#[derive(clickhouse::Row, Deserialize, Debug)]
struct TraceIndexRow {
    trace_id: [u8; 32],
    start_time: i64,
    end_time: i64,
    service_names: Vec<String>,
    root_service_name: String,
    root_span_name: String,
    duration_ns: u64,
    span_count: u64,
    has_error: bool,
}

impl From<TraceIndexRow> for TraceIndex {
    fn from(row: TraceIndexRow) -> Self {
        Self {
            trace_id: fixed_bytes_to_string(&row.trace_id),
            start_time: row.start_time.max(0) as u64,
            end_time: row.end_time.max(0) as u64,
            service_names: row.service_names,
            root_service_name: row.root_service_name,
            root_span_name: row.root_span_name,
            duration_ns: row.duration_ns,
            span_count: row.span_count,
            has_error: row.has_error,
        }
    }
}
