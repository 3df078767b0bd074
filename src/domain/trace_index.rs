//! Per-trace roll-up maintained by the store.

use serde::{Deserialize, Serialize};

/// Derived per-trace summary from the `otel_trace_index` materialized view.
///
/// The store aggregates this from span rows; the core only reads it (the
/// trace query path uses it to bound scans for a single trace).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceIndex {
    /// Trace ID (32-char lowercase hex string)
    pub trace_id: String,

    /// Minimum span start timestamp in the trace (nanoseconds)
    pub start_time: u64,

    /// Maximum span end timestamp in the trace (nanoseconds)
    pub end_time: u64,

    /// Names of the services that contributed spans
    pub service_names: Vec<String>,

    /// Service owning the root span (empty if no root span was seen)
    pub root_service_name: String,

    /// Name of the root span (the span with an empty parent id)
    pub root_span_name: String,

    /// `end_time - start_time`
    pub duration_ns: u64,

    /// Number of spans in the trace
    pub span_count: u64,

    /// True iff any span carries an error status
    pub has_error: bool,
}
