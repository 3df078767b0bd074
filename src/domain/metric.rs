//! Metric data point records following the OTel Metrics Data Model.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::ServiceIdentity;

/// A single metric data point.
///
/// For histograms, `bucket_counts.len() == explicit_bounds.len() + 1` holds
/// for every record the decoder emits; violating points are skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metric {
    /// Point timestamp (nanoseconds since Unix epoch)
    pub timestamp: u64,

    /// Metric name
    pub metric_name: String,

    /// Metric type
    pub metric_type: MetricType,

    /// Point value. For histograms and summaries this is the reported sum.
    pub value: f64,

    /// Service identity from resource attributes
    pub service: ServiceIdentity,

    /// Point attributes, flattened to strings
    pub attributes: HashMap<String, String>,

    /// Resource attributes, flattened to strings
    pub resource_attributes: HashMap<String, String>,

    /// Histogram bucket counts (empty for non-histogram points)
    pub bucket_counts: Vec<u64>,

    /// Histogram explicit bounds, strictly ascending
    pub explicit_bounds: Vec<f64>,

    /// Instrumentation scope name
    pub scope_name: String,

    /// Instrumentation scope version
    pub scope_version: String,
}

/// Metric type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    #[default]
    Gauge,
    Counter,
    Histogram,
    Summary,
}

impl MetricType {
    /// The store's enum spelling.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MetricType::Gauge => "gauge",
            MetricType::Counter => "counter",
            MetricType::Histogram => "histogram",
            MetricType::Summary => "summary",
        }
    }
}
