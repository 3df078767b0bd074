//! Normalized in-memory records for the three telemetry signals.
//!
//! Records are produced by the OTLP decoder, cross the signal queues as
//! immutable values, and are referenced by a batch until the columnar
//! writer has committed it.

mod log;
mod metric;
mod span;
mod trace_index;

pub use log::{LogBodyType, LogRecord};
pub use metric::{Metric, MetricType};
pub use span::{Span, SpanEvent, SpanKind, SpanLink, SpanStatusCode};
pub use trace_index::TraceIndex;

use serde::{Deserialize, Serialize};

/// Service identity extracted from OTLP resource attributes.
///
/// Missing resource keys yield empty strings, never absence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceIdentity {
    /// `service.name`
    pub name: String,
    /// `service.namespace`
    pub namespace: String,
    /// `service.instance.id`
    pub instance_id: String,
    /// `deployment.environment`
    pub environment: String,
}

/// The three ingestion signals. Used to key queues, workers, and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Spans,
    Metrics,
    Logs,
}

impl Signal {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Signal::Spans => "spans",
            Signal::Metrics => "metrics",
            Signal::Logs => "logs",
        }
    }

    /// Target table for this signal's inserts.
    #[must_use]
    pub fn table(self) -> &'static str {
        match self {
            Signal::Spans => "otel_traces",
            Signal::Metrics => "otel_metrics",
            Signal::Logs => "otel_logs",
        }
    }
}
