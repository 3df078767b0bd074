//! Trace span records following the OTel Trace Data Model.
//! See: https://opentelemetry.io/docs/specs/otel/trace/api/#span

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::ServiceIdentity;

/// One unit of traced work.
///
/// `duration_ns` always equals `end_time - start_time`; the decoder rejects
/// spans where that subtraction would underflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    /// Start timestamp (nanoseconds since Unix epoch)
    pub timestamp: u64,

    /// Trace ID (32-char lowercase hex string)
    pub trace_id: String,

    /// Span ID (16-char lowercase hex string)
    pub span_id: String,

    /// Parent Span ID (empty string if root span)
    pub parent_span_id: String,

    /// Span name/operation name
    pub span_name: String,

    /// Span kind
    pub span_kind: SpanKind,

    /// Start timestamp (nanoseconds since Unix epoch)
    pub start_time: u64,

    /// End timestamp (nanoseconds since Unix epoch)
    pub end_time: u64,

    /// Duration in nanoseconds (`end_time - start_time`)
    pub duration_ns: u64,

    /// Status code
    pub status_code: SpanStatusCode,

    /// Status message (for error status)
    pub status_message: String,

    /// Service identity from resource attributes
    pub service: ServiceIdentity,

    /// Span attributes, flattened to strings
    pub attributes: HashMap<String, String>,

    /// Resource attributes, flattened to strings
    pub resource_attributes: HashMap<String, String>,

    /// Span events, in wire order
    pub events: Vec<SpanEvent>,

    /// Span links, in wire order
    pub links: Vec<SpanLink>,

    /// Instrumentation scope name (empty string allowed, never absent)
    pub scope_name: String,

    /// Instrumentation scope version
    pub scope_version: String,
}

/// Event nested in a span.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanEvent {
    /// Event timestamp (nanoseconds since Unix epoch)
    pub timestamp: u64,
    /// Event name
    pub name: String,
    /// Event attributes
    pub attributes: HashMap<String, String>,
}

/// Link nested in a span.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanLink {
    /// Linked trace ID
    pub trace_id: String,
    /// Linked span ID
    pub span_id: String,
    /// W3C trace state
    pub trace_state: String,
    /// Link attributes
    pub attributes: HashMap<String, String>,
}

/// Span kind. OTLP `SPAN_KIND_UNSPECIFIED` is treated as `Internal`,
/// matching the OTel spec's guidance for absent kinds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    #[default]
    Internal,
    Server,
    Client,
    Producer,
    Consumer,
}

impl SpanKind {
    /// The store's enum spelling.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SpanKind::Internal => "internal",
            SpanKind::Server => "server",
            SpanKind::Client => "client",
            SpanKind::Producer => "producer",
            SpanKind::Consumer => "consumer",
        }
    }
}

impl From<i32> for SpanKind {
    fn from(value: i32) -> Self {
        match value {
            2 => SpanKind::Server,
            3 => SpanKind::Client,
            4 => SpanKind::Producer,
            5 => SpanKind::Consumer,
            _ => SpanKind::Internal,
        }
    }
}

/// Span status code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpanStatusCode {
    #[default]
    Unset,
    Ok,
    Error,
}

impl SpanStatusCode {
    /// The store's enum spelling.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SpanStatusCode::Unset => "unset",
            SpanStatusCode::Ok => "ok",
            SpanStatusCode::Error => "error",
        }
    }
}

impl From<i32> for SpanStatusCode {
    fn from(value: i32) -> Self {
        match value {
            1 => SpanStatusCode::Ok,
            2 => SpanStatusCode::Error,
            _ => SpanStatusCode::Unset,
        }
    }
}
