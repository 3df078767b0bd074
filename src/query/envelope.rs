//! Request and response envelopes for the query API.
//!
//! Every timestamp and duration is in nanoseconds since the Unix epoch.
//! Enum-like fields coming back from the store (span kind, status code,
//! body type) are passed through as the raw stored strings.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `POST /api/v1/traces`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TracesRequest {
    pub trace_id: Option<String>,
    pub service_name: Option<String>,
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
    pub min_duration: Option<u64>,
    pub max_duration: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TracesResponse {
    pub spans: Vec<SpanView>,
    pub total: u64,
}

/// A span row as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct SpanView {
    pub timestamp: u64,
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: String,
    pub span_name: String,
    pub span_kind: String,
    pub service_name: String,
    pub start_time: u64,
    pub end_time: u64,
    pub duration_ns: u64,
    pub status_code: String,
    pub status_message: String,
    pub attributes: HashMap<String, String>,
    pub resource_attributes: HashMap<String, String>,
    pub events: Vec<SpanEventView>,
    pub links: Vec<SpanLinkView>,
    pub scope_name: String,
    pub scope_version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpanEventView {
    pub timestamp: u64,
    pub name: String,
    pub attributes: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpanLinkView {
    pub trace_id: String,
    pub span_id: String,
    pub trace_state: String,
    pub attributes: HashMap<String, String>,
}

/// `POST /api/v1/metrics`
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsRequest {
    pub metric_name: String,
    pub service_name: Option<String>,
    pub start_time: u64,
    pub end_time: u64,
    pub aggregation: Option<String>,
    /// Accepted for compatibility; bucketing is fixed at five minutes.
    #[serde(default)]
    pub step: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsResponse {
    pub metric_name: String,
    pub data_points: Vec<DataPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataPoint {
    /// Bucket start, nanoseconds since the Unix epoch.
    pub timestamp: u64,
    pub value: f64,
}

/// `POST /api/v1/logs`
#[derive(Debug, Clone, Deserialize)]
pub struct LogsRequest {
    pub service_name: Option<String>,
    pub start_time: u64,
    pub end_time: u64,
    pub severity: Option<String>,
    pub search_text: Option<String>,
    pub trace_id: Option<String>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogsResponse {
    pub logs: Vec<LogView>,
    pub total: u64,
}

/// A log row as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct LogView {
    pub timestamp: u64,
    pub observed_timestamp: u64,
    pub severity_number: u8,
    pub severity_text: String,
    pub body: String,
    pub body_type: String,
    pub service_name: String,
    pub host_name: String,
    pub trace_id: String,
    pub span_id: String,
    pub trace_flags: u8,
    pub attributes: HashMap<String, String>,
    pub resource_attributes: HashMap<String, String>,
    pub scope_name: String,
    pub scope_version: String,
}

/// `GET /api/v1/services/stats`
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStat {
    pub service_name: String,
    pub span_count: u64,
    pub avg_duration_ns: f64,
    pub p95_duration_ns: f64,
    pub error_count: u64,
}
