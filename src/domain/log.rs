//! Log records following the OTel Log Data Model.
//! See: https://opentelemetry.io/docs/specs/otel/logs/data-model/

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::ServiceIdentity;

/// A single log record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Timestamp when the event occurred (nanoseconds since Unix epoch)
    pub timestamp: u64,

    /// Timestamp when the event was observed (nanoseconds since Unix epoch)
    pub observed_timestamp: u64,

    /// Severity number (1-24, see OTel spec; 0 when unspecified)
    pub severity_number: u8,

    /// Severity text (e.g., "INFO", "ERROR")
    pub severity_text: String,

    /// Log body, rendered to its string representation
    pub body: String,

    /// How the body was encoded on the wire
    pub body_type: LogBodyType,

    /// Service identity from resource attributes
    pub service: ServiceIdentity,

    /// `host.name` resource attribute
    pub host_name: String,

    /// Trace ID for correlation (32-char hex, empty when uncorrelated)
    pub trace_id: String,

    /// Span ID for correlation (16-char hex, empty when uncorrelated)
    pub span_id: String,

    /// Trace flags (W3C Trace Context)
    pub trace_flags: u8,

    /// Log attributes, flattened to strings
    pub attributes: HashMap<String, String>,

    /// Resource attributes, flattened to strings
    pub resource_attributes: HashMap<String, String>,

    /// Instrumentation scope name
    pub scope_name: String,

    /// Instrumentation scope version
    pub scope_version: String,
}

/// Wire encoding of a log body.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogBodyType {
    #[default]
    String,
    Json,
    Bytes,
}

impl LogBodyType {
    /// The store's enum spelling.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LogBodyType::String => "string",
            LogBodyType::Json => "json",
            LogBodyType::Bytes => "bytes",
        }
    }
}
