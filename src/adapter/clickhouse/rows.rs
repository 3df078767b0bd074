// Nanosecond timestamps (u64) intentionally cast to i64 for ClickHouse.
// This won't overflow until year 2262.
#![allow(clippy::cast_possible_wrap)]

//! Row structs for the three insert tables.
//!
//! Field order is the declared column order of the target table; the
//! RowBinary wire format is positional. Events and links travel as
//! `Array(Tuple(...))` columns preserving field order.

use crate::adapter::clickhouse::convert::{map_to_pairs, string_to_fixed_bytes};
use crate::domain::{LogRecord, Metric, Span};
use serde::{Deserialize, Serialize};

/// `(timestamp, name, attributes)` per span event.
pub type EventTuple = (i64, String, Vec<(String, String)>);

/// `(trace_id, span_id, trace_state, attributes)` per span link.
pub type LinkTuple = (String, String, String, Vec<(String, String)>);

/// Row for the `otel_traces` table.
#[derive(clickhouse::Row, Serialize, Deserialize, Clone, Debug)]
pub struct SpanRow {
    pub timestamp: i64, // DateTime64(9)
    pub trace_id: [u8; 32],  // FixedString(32)
    pub span_id: [u8; 16],   // FixedString(16)
    pub parent_span_id: String, // empty for root spans
    pub span_name: String,
    pub span_kind: String, // LowCardinality(String)
    pub service_name: String,
    pub service_namespace: String,
    pub service_instance_id: String,
    pub deployment_environment: String,
    pub start_time: i64,
    pub end_time: i64,
    pub duration_ns: u64,
    pub status_code: String, // LowCardinality(String)
    pub status_message: String,
    pub attributes: Vec<(String, String)>, // Map(String, String)
    pub resource_attributes: Vec<(String, String)>,
    pub events: Vec<EventTuple>, // Array(Tuple(DateTime64(9), String, Map(String, String)))
    pub links: Vec<LinkTuple>,   // Array(Tuple(String, String, String, Map(String, String)))
    pub scope_name: String,
    pub scope_version: String,
}

impl From<Span> for SpanRow {
    fn from(span: Span) -> Self {
        let events = span
            .events
            .into_iter()
            .map(|e| (e.timestamp as i64, e.name, map_to_pairs(e.attributes)))
            .collect();
        let links = span
            .links
            .into_iter()
            .map(|l| (l.trace_id, l.span_id, l.trace_state, map_to_pairs(l.attributes)))
            .collect();

        Self {
            timestamp: span.timestamp as i64,
            trace_id: string_to_fixed_bytes::<32>(&span.trace_id),
            span_id: string_to_fixed_bytes::<16>(&span.span_id),
            parent_span_id: span.parent_span_id,
            span_name: span.span_name,
            span_kind: span.span_kind.as_str().to_string(),
            service_name: span.service.name,
            service_namespace: span.service.namespace,
            service_instance_id: span.service.instance_id,
            deployment_environment: span.service.environment,
            start_time: span.start_time as i64,
            end_time: span.end_time as i64,
            duration_ns: span.duration_ns,
            status_code: span.status_code.as_str().to_string(),
            status_message: span.status_message,
            attributes: map_to_pairs(span.attributes),
            resource_attributes: map_to_pairs(span.resource_attributes),
            events,
            links,
            scope_name: span.scope_name,
            scope_version: span.scope_version,
        }
    }
}

/// Row for the `otel_metrics` table.
#[derive(clickhouse::Row, Serialize, Deserialize, Clone, Debug)]
pub struct MetricRow {
    pub timestamp: i64, // DateTime64(9)
    pub metric_name: String,
    pub metric_type: String, // LowCardinality(String)
    pub value: f64,
    pub service_name: String,
    pub service_namespace: String,
    pub service_instance_id: String,
    pub deployment_environment: String,
    pub attributes: Vec<(String, String)>,
    pub resource_attributes: Vec<(String, String)>,
    pub bucket_counts: Vec<u64>,   // Array(UInt64)
    pub explicit_bounds: Vec<f64>, // Array(Float64)
    pub scope_name: String,
    pub scope_version: String,
}

impl From<Metric> for MetricRow {
    fn from(metric: Metric) -> Self {
        Self {
            timestamp: metric.timestamp as i64,
            metric_name: metric.metric_name,
            metric_type: metric.metric_type.as_str().to_string(),
            value: metric.value,
            service_name: metric.service.name,
            service_namespace: metric.service.namespace,
            service_instance_id: metric.service.instance_id,
            deployment_environment: metric.service.environment,
            attributes: map_to_pairs(metric.attributes),
            resource_attributes: map_to_pairs(metric.resource_attributes),
            bucket_counts: metric.bucket_counts,
            explicit_bounds: metric.explicit_bounds,
            scope_name: metric.scope_name,
            scope_version: metric.scope_version,
        }
    }
}

/// Row for the `otel_logs` table.
#[derive(clickhouse::Row, Serialize, Deserialize, Clone, Debug)]
pub struct LogRow {
    pub timestamp: i64,          // DateTime64(9)
    pub observed_timestamp: i64, // DateTime64(9)
    pub severity_number: u8,
    pub severity_text: String, // LowCardinality(String)
    pub body: String,
    pub body_type: String, // LowCardinality(String)
    pub service_name: String,
    pub service_namespace: String,
    pub service_instance_id: String,
    pub deployment_environment: String,
    pub host_name: String,
    pub trace_id: [u8; 32], // FixedString(32), all-zero when uncorrelated
    pub span_id: [u8; 16],  // FixedString(16)
    pub trace_flags: u8,
    pub attributes: Vec<(String, String)>,
    pub resource_attributes: Vec<(String, String)>,
    pub scope_name: String,
    pub scope_version: String,
}

impl From<LogRecord> for LogRow {
    fn from(log: LogRecord) -> Self {
        Self {
            timestamp: log.timestamp as i64,
            observed_timestamp: log.observed_timestamp as i64,
            severity_number: log.severity_number,
            severity_text: log.severity_text,
            body: log.body,
            body_type: log.body_type.as_str().to_string(),
            service_name: log.service.name,
            service_namespace: log.service.namespace,
            service_instance_id: log.service.instance_id,
            deployment_environment: log.service.environment,
            host_name: log.host_name,
            trace_id: string_to_fixed_bytes::<32>(&log.trace_id),
            span_id: string_to_fixed_bytes::<16>(&log.span_id),
            trace_flags: log.trace_flags,
            attributes: map_to_pairs(log.attributes),
            resource_attributes: map_to_pairs(log.resource_attributes),
            scope_name: log.scope_name,
            scope_version: log.scope_version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        LogBodyType, MetricType, ServiceIdentity, SpanEvent, SpanKind, SpanLink, SpanStatusCode,
    };
    use std::collections::HashMap;

    fn service() -> ServiceIdentity {
        ServiceIdentity {
            name: "checkout".to_string(),
            namespace: "shop".to_string(),
            instance_id: "i-1".to_string(),
            environment: "prod".to_string(),
        }
    }

    fn make_span() -> Span {
        Span {
            timestamp: 1_700_000_000_000_000_000,
            trace_id: "0102030405060708090a0b0c0d0e0f10".to_string(),
            span_id: "0102030405060708".to_string(),
            parent_span_id: String::new(),
            span_name: "GET /api/users".to_string(),
            span_kind: SpanKind::Server,
            start_time: 1_700_000_000_000_000_000,
            end_time: 1_700_000_000_100_000_000,
            duration_ns: 100_000_000,
            status_code: SpanStatusCode::Ok,
            status_message: String::new(),
            service: service(),
            attributes: {
                let mut m = HashMap::new();
                m.insert("http.method".to_string(), "GET".to_string());
                m
            },
            resource_attributes: {
                let mut m = HashMap::new();
                m.insert("service.name".to_string(), "checkout".to_string());
                m
            },
            events: vec![SpanEvent {
                timestamp: 1_700_000_000_001_000_000,
                name: "exception".to_string(),
                attributes: {
                    let mut m = HashMap::new();
                    m.insert("exception.type".to_string(), "TimeoutError".to_string());
                    m
                },
            }],
            links: vec![SpanLink {
                trace_id: "11111111111111111111111111111111".to_string(),
                span_id: "2222222222222222".to_string(),
                trace_state: "vendor=1".to_string(),
                attributes: HashMap::new(),
            }],
            scope_name: "my-scope".to_string(),
            scope_version: "1.2.3".to_string(),
        }
    }

    #[test]
    fn golden_span_row_from_span() {
        let row = SpanRow::from(make_span());

        assert_eq!(row.timestamp, 1_700_000_000_000_000_000_i64);
        assert_eq!(
            row.trace_id,
            string_to_fixed_bytes::<32>("0102030405060708090a0b0c0d0e0f10")
        );
        assert_eq!(row.span_id, string_to_fixed_bytes::<16>("0102030405060708"));
        assert_eq!(row.parent_span_id, "");
        assert_eq!(row.span_kind, "server");
        assert_eq!(row.status_code, "ok");
        assert_eq!(row.service_name, "checkout");
        assert_eq!(row.service_namespace, "shop");
        assert_eq!(row.deployment_environment, "prod");
        assert_eq!(row.duration_ns, 100_000_000);
        assert_eq!(row.end_time - row.start_time, row.duration_ns as i64);
    }

    #[test]
    fn test_span_row_events_as_tuples_preserve_order() {
        let mut span = make_span();
        span.events.push(SpanEvent {
            timestamp: 1_700_000_000_002_000_000,
            name: "retry".to_string(),
            attributes: HashMap::new(),
        });
        let row = SpanRow::from(span);
        assert_eq!(row.events.len(), 2);
        assert_eq!(row.events[0].1, "exception");
        assert_eq!(row.events[0].0, 1_700_000_000_001_000_000_i64);
        assert_eq!(
            row.events[0].2,
            vec![("exception.type".to_string(), "TimeoutError".to_string())]
        );
        assert_eq!(row.events[1].1, "retry");
    }

    #[test]
    fn test_span_row_links_as_tuples() {
        let row = SpanRow::from(make_span());
        assert_eq!(row.links.len(), 1);
        let (trace_id, span_id, trace_state, attributes) = &row.links[0];
        assert_eq!(trace_id, "11111111111111111111111111111111");
        assert_eq!(span_id, "2222222222222222");
        assert_eq!(trace_state, "vendor=1");
        assert!(attributes.is_empty());
    }

    #[test]
    fn test_span_row_kind_and_status_spellings() {
        for (kind, expected) in [
            (SpanKind::Internal, "internal"),
            (SpanKind::Server, "server"),
            (SpanKind::Client, "client"),
            (SpanKind::Producer, "producer"),
            (SpanKind::Consumer, "consumer"),
        ] {
            let mut span = make_span();
            span.span_kind = kind;
            assert_eq!(SpanRow::from(span).span_kind, expected);
        }
        for (status, expected) in [
            (SpanStatusCode::Unset, "unset"),
            (SpanStatusCode::Ok, "ok"),
            (SpanStatusCode::Error, "error"),
        ] {
            let mut span = make_span();
            span.status_code = status;
            assert_eq!(SpanRow::from(span).status_code, expected);
        }
    }

    fn make_metric() -> Metric {
        Metric {
            timestamp: 1_700_000_000_000_000_000,
            metric_name: "request_latency".to_string(),
            metric_type: MetricType::Histogram,
            value: 4.5,
            service: service(),
            attributes: HashMap::new(),
            resource_attributes: HashMap::new(),
            bucket_counts: vec![1, 2, 3],
            explicit_bounds: vec![0.5, 1.0],
            scope_name: String::new(),
            scope_version: String::new(),
        }
    }

    #[test]
    fn golden_metric_row_from_metric() {
        let row = MetricRow::from(make_metric());
        assert_eq!(row.timestamp, 1_700_000_000_000_000_000_i64);
        assert_eq!(row.metric_name, "request_latency");
        assert_eq!(row.metric_type, "histogram");
        assert_eq!(row.value, 4.5);
        assert_eq!(row.bucket_counts, vec![1, 2, 3]);
        assert_eq!(row.explicit_bounds, vec![0.5, 1.0]);
        assert_eq!(row.bucket_counts.len(), row.explicit_bounds.len() + 1);
    }

    fn make_log() -> LogRecord {
        LogRecord {
            timestamp: 1_700_000_000_000_000_000,
            observed_timestamp: 1_700_000_000_100_000_000,
            severity_number: 13,
            severity_text: "WARN".to_string(),
            body: "Connection timeout".to_string(),
            body_type: LogBodyType::String,
            service: service(),
            host_name: "node-3".to_string(),
            trace_id: "abcdef0123456789abcdef0123456789".to_string(),
            span_id: "1234567890abcdef".to_string(),
            trace_flags: 1,
            attributes: {
                let mut m = HashMap::new();
                m.insert("error.type".to_string(), "timeout".to_string());
                m
            },
            resource_attributes: HashMap::new(),
            scope_name: "my-scope".to_string(),
            scope_version: "1.2.3".to_string(),
        }
    }

    #[test]
    fn golden_log_row_from_log_record() {
        let row = LogRow::from(make_log());
        assert_eq!(row.timestamp, 1_700_000_000_000_000_000_i64);
        assert_eq!(row.observed_timestamp, 1_700_000_000_100_000_000_i64);
        assert_eq!(row.severity_number, 13);
        assert_eq!(row.severity_text, "WARN");
        assert_eq!(row.body, "Connection timeout");
        assert_eq!(row.body_type, "string");
        assert_eq!(row.host_name, "node-3");
        assert_eq!(
            row.trace_id,
            string_to_fixed_bytes::<32>("abcdef0123456789abcdef0123456789")
        );
        assert_eq!(
            row.attributes,
            vec![("error.type".to_string(), "timeout".to_string())]
        );
    }

    #[test]
    fn test_log_row_empty_trace_context_is_zero_bytes() {
        let mut log = make_log();
        log.trace_id = String::new();
        log.span_id = String::new();
        let row = LogRow::from(log);
        assert_eq!(row.trace_id, [0u8; 32]);
        assert_eq!(row.span_id, [0u8; 16]);
    }
}
