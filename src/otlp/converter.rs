//! Converter from OpenTelemetry protocol to internal domain records.
//!
//! The converter never fails a whole envelope: malformed individual records
//! are skipped and surface in [`DecodeOutcome::invalid`].

use std::collections::HashMap;

use opentelemetry_proto::tonic::{
    collector::{
        logs::v1::ExportLogsServiceRequest, metrics::v1::ExportMetricsServiceRequest,
        trace::v1::ExportTraceServiceRequest,
    },
    common::v1::{AnyValue, KeyValue, any_value},
    logs::v1::LogRecord as OtlpLogRecord,
    metrics::v1::{HistogramDataPoint, NumberDataPoint, metric, number_data_point},
};

use crate::domain::{
    LogBodyType, LogRecord, Metric, MetricType, ServiceIdentity, Span, SpanEvent, SpanKind,
    SpanLink, SpanStatusCode,
};

/// Result of decoding one export envelope: the records that passed
/// validation plus the count of records that were skipped.
#[derive(Debug)]
pub struct DecodeOutcome<T> {
    pub records: Vec<T>,
    pub invalid: u64,
}

impl<T> DecodeOutcome<T> {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            invalid: 0,
        }
    }
}

/// Convert an OTLP trace request into span records.
#[must_use]
pub fn convert_spans(request: &ExportTraceServiceRequest) -> DecodeOutcome<Span> {
    let mut out = DecodeOutcome::new();

    for resource_spans in &request.resource_spans {
        let resource_attrs = resource_spans
            .resource
            .as_ref()
            .map(|r| convert_attributes(&r.attributes))
            .unwrap_or_default();
        let service = extract_service_identity(&resource_attrs);

        for scope_spans in &resource_spans.scope_spans {
            let scope = scope_spans.scope.as_ref();
            let scope_name = scope.map(|s| s.name.clone()).unwrap_or_default();
            let scope_version = scope.map(|s| s.version.clone()).unwrap_or_default();

            for span in &scope_spans.spans {
                match convert_single_span(span, &resource_attrs, &service, &scope_name, &scope_version)
                {
                    Some(record) => out.records.push(record),
                    None => out.invalid += 1,
                }
            }
        }
    }

    out
}

fn convert_single_span(
    span: &opentelemetry_proto::tonic::trace::v1::Span,
    resource_attrs: &HashMap<String, String>,
    service: &ServiceIdentity,
    scope_name: &str,
    scope_version: &str,
) -> Option<Span> {
    // A span that ends before it starts cannot satisfy the duration
    // invariant and is skipped.
    if span.end_time_unix_nano < span.start_time_unix_nano {
        return None;
    }
    let duration_ns = span.end_time_unix_nano - span.start_time_unix_nano;

    let events = span
        .events
        .iter()
        .map(|e| SpanEvent {
            timestamp: e.time_unix_nano,
            name: e.name.clone(),
            attributes: convert_attributes(&e.attributes),
        })
        .collect();

    let links = span
        .links
        .iter()
        .map(|l| SpanLink {
            trace_id: encode_id::<16>(&l.trace_id),
            span_id: encode_id::<8>(&l.span_id),
            trace_state: l.trace_state.clone(),
            attributes: convert_attributes(&l.attributes),
        })
        .collect();

    Some(Span {
        timestamp: span.start_time_unix_nano,
        trace_id: encode_id::<16>(&span.trace_id),
        span_id: encode_id::<8>(&span.span_id),
        parent_span_id: encode_optional_id::<8>(&span.parent_span_id),
        span_name: span.name.clone(),
        span_kind: SpanKind::from(span.kind),
        start_time: span.start_time_unix_nano,
        end_time: span.end_time_unix_nano,
        duration_ns,
        status_code: span
            .status
            .as_ref()
            .map(|s| SpanStatusCode::from(s.code))
            .unwrap_or_default(),
        status_message: span
            .status
            .as_ref()
            .map(|s| s.message.clone())
            .unwrap_or_default(),
        service: service.clone(),
        attributes: convert_attributes(&span.attributes),
        resource_attributes: resource_attrs.clone(),
        events,
        links,
        scope_name: scope_name.to_string(),
        scope_version: scope_version.to_string(),
    })
}

/// Convert an OTLP metrics request into data point records.
///
/// Each OTLP data point becomes one record. Exponential histograms are not
/// part of the stored type set and count as invalid, as do histogram points
/// whose bucket/bound arrays disagree.
#[must_use]
pub fn convert_metrics(request: &ExportMetricsServiceRequest) -> DecodeOutcome<Metric> {
    let mut out = DecodeOutcome::new();

    for resource_metrics in &request.resource_metrics {
        let resource_attrs = resource_metrics
            .resource
            .as_ref()
            .map(|r| convert_attributes(&r.attributes))
            .unwrap_or_default();
        let service = extract_service_identity(&resource_attrs);

        for scope_metrics in &resource_metrics.scope_metrics {
            let scope = scope_metrics.scope.as_ref();
            let scope_name = scope.map(|s| s.name.clone()).unwrap_or_default();
            let scope_version = scope.map(|s| s.version.clone()).unwrap_or_default();

            for m in &scope_metrics.metrics {
                convert_single_metric(
                    m,
                    &resource_attrs,
                    &service,
                    &scope_name,
                    &scope_version,
                    &mut out,
                );
            }
        }
    }

    out
}

fn convert_single_metric(
    m: &opentelemetry_proto::tonic::metrics::v1::Metric,
    resource_attrs: &HashMap<String, String>,
    service: &ServiceIdentity,
    scope_name: &str,
    scope_version: &str,
    out: &mut DecodeOutcome<Metric>,
) {
    let base = |timestamp: u64, metric_type: MetricType, value: f64, attrs: &[KeyValue]| Metric {
        timestamp,
        metric_name: m.name.clone(),
        metric_type,
        value,
        service: service.clone(),
        attributes: convert_attributes(attrs),
        resource_attributes: resource_attrs.clone(),
        bucket_counts: Vec::new(),
        explicit_bounds: Vec::new(),
        scope_name: scope_name.to_string(),
        scope_version: scope_version.to_string(),
    };

    match &m.data {
        Some(metric::Data::Gauge(gauge)) => {
            for dp in &gauge.data_points {
                out.records.push(base(
                    dp.time_unix_nano,
                    MetricType::Gauge,
                    number_value(dp),
                    &dp.attributes,
                ));
            }
        }
        Some(metric::Data::Sum(sum)) => {
            for dp in &sum.data_points {
                out.records.push(base(
                    dp.time_unix_nano,
                    MetricType::Counter,
                    number_value(dp),
                    &dp.attributes,
                ));
            }
        }
        Some(metric::Data::Histogram(histogram)) => {
            for dp in &histogram.data_points {
                if !histogram_point_is_valid(dp) {
                    out.invalid += 1;
                    continue;
                }
                let mut record = base(
                    dp.time_unix_nano,
                    MetricType::Histogram,
                    dp.sum.unwrap_or(0.0),
                    &dp.attributes,
                );
                record.bucket_counts = dp.bucket_counts.clone();
                record.explicit_bounds = dp.explicit_bounds.clone();
                out.records.push(record);
            }
        }
        Some(metric::Data::Summary(summary)) => {
            for dp in &summary.data_points {
                out.records.push(base(
                    dp.time_unix_nano,
                    MetricType::Summary,
                    dp.sum,
                    &dp.attributes,
                ));
            }
        }
        Some(metric::Data::ExponentialHistogram(histogram)) => {
            out.invalid += histogram.data_points.len() as u64;
        }
        None => out.invalid += 1,
    }
}

fn number_value(dp: &NumberDataPoint) -> f64 {
    match &dp.value {
        Some(number_data_point::Value::AsDouble(d)) => *d,
        Some(number_data_point::Value::AsInt(i)) => *i as f64,
        None => 0.0,
    }
}

fn histogram_point_is_valid(dp: &HistogramDataPoint) -> bool {
    dp.bucket_counts.len() == dp.explicit_bounds.len() + 1
}

/// Convert an OTLP logs request into log records.
#[must_use]
pub fn convert_log_records(request: &ExportLogsServiceRequest) -> DecodeOutcome<LogRecord> {
    let mut out = DecodeOutcome::new();

    for resource_logs in &request.resource_logs {
        let resource_attrs = resource_logs
            .resource
            .as_ref()
            .map(|r| convert_attributes(&r.attributes))
            .unwrap_or_default();
        let service = extract_service_identity(&resource_attrs);
        let host_name = resource_attrs.get("host.name").cloned().unwrap_or_default();

        for scope_logs in &resource_logs.scope_logs {
            let scope = scope_logs.scope.as_ref();
            let scope_name = scope.map(|s| s.name.clone()).unwrap_or_default();
            let scope_version = scope.map(|s| s.version.clone()).unwrap_or_default();

            for record in &scope_logs.log_records {
                out.records.push(convert_single_log(
                    record,
                    &resource_attrs,
                    &service,
                    &host_name,
                    &scope_name,
                    &scope_version,
                ));
            }
        }
    }

    out
}

fn convert_single_log(
    record: &OtlpLogRecord,
    resource_attrs: &HashMap<String, String>,
    service: &ServiceIdentity,
    host_name: &str,
    scope_name: &str,
    scope_version: &str,
) -> LogRecord {
    // Collectors commonly leave the event timestamp unset; fall back to the
    // observation time so the record remains queryable by range.
    let timestamp = if record.time_unix_nano == 0 {
        record.observed_time_unix_nano
    } else {
        record.time_unix_nano
    };

    let (body, body_type) = extract_body(record.body.as_ref());

    LogRecord {
        timestamp,
        observed_timestamp: record.observed_time_unix_nano,
        severity_number: record.severity_number.clamp(0, 24) as u8,
        severity_text: record.severity_text.clone(),
        body,
        body_type,
        service: service.clone(),
        host_name: host_name.to_string(),
        trace_id: encode_optional_id::<16>(&record.trace_id),
        span_id: encode_optional_id::<8>(&record.span_id),
        trace_flags: record.flags as u8,
        attributes: convert_attributes(&record.attributes),
        resource_attributes: resource_attrs.clone(),
        scope_name: scope_name.to_string(),
        scope_version: scope_version.to_string(),
    }
}

/// Extract the service identity quadruple from flattened resource
/// attributes. Missing keys yield empty strings.
#[must_use]
pub fn extract_service_identity(resource_attrs: &HashMap<String, String>) -> ServiceIdentity {
    let get = |key: &str| resource_attrs.get(key).cloned().unwrap_or_default();
    ServiceIdentity {
        name: get("service.name"),
        namespace: get("service.namespace"),
        instance_id: get("service.instance.id"),
        environment: get("deployment.environment"),
    }
}

/// Flatten OTLP attributes to a string map. Duplicate keys collapse,
/// last one wins.
#[must_use]
pub fn convert_attributes(attrs: &[KeyValue]) -> HashMap<String, String> {
    attrs
        .iter()
        .map(|kv| (kv.key.clone(), flatten_any_value(kv.value.as_ref())))
        .collect()
}

/// Render an `AnyValue` to its canonical string form: strings verbatim,
/// numbers in decimal, booleans as `true`/`false`, bytes as hex, arrays and
/// maps as JSON, absent values as the empty string.
#[must_use]
pub fn flatten_any_value(value: Option<&AnyValue>) -> String {
    let Some(value) = value.and_then(|v| v.value.as_ref()) else {
        return String::new();
    };
    match value {
        any_value::Value::StringValue(s) => s.clone(),
        any_value::Value::BoolValue(b) => b.to_string(),
        any_value::Value::IntValue(i) => i.to_string(),
        any_value::Value::DoubleValue(d) => d.to_string(),
        any_value::Value::BytesValue(b) => hex::encode(b),
        any_value::Value::ArrayValue(_) | any_value::Value::KvlistValue(_) => {
            any_value_to_json(value).to_string()
        }
    }
}

fn any_value_to_json(value: &any_value::Value) -> serde_json::Value {
    match value {
        any_value::Value::StringValue(s) => serde_json::Value::String(s.clone()),
        any_value::Value::BoolValue(b) => serde_json::Value::Bool(*b),
        any_value::Value::IntValue(i) => serde_json::Value::from(*i),
        any_value::Value::DoubleValue(d) => {
            serde_json::Number::from_f64(*d).map_or(serde_json::Value::Null, serde_json::Value::Number)
        }
        any_value::Value::BytesValue(b) => serde_json::Value::String(hex::encode(b)),
        any_value::Value::ArrayValue(arr) => serde_json::Value::Array(
            arr.values
                .iter()
                .map(|v| {
                    v.value
                        .as_ref()
                        .map_or(serde_json::Value::Null, any_value_to_json)
                })
                .collect(),
        ),
        any_value::Value::KvlistValue(kvs) => serde_json::Value::Object(
            kvs.values
                .iter()
                .map(|kv| {
                    (
                        kv.key.clone(),
                        kv.value
                            .as_ref()
                            .and_then(|v| v.value.as_ref())
                            .map_or(serde_json::Value::Null, any_value_to_json),
                    )
                })
                .collect(),
        ),
    }
}

fn extract_body(body: Option<&AnyValue>) -> (String, LogBodyType) {
    let Some(value) = body.and_then(|v| v.value.as_ref()) else {
        return (String::new(), LogBodyType::String);
    };
    match value {
        any_value::Value::BytesValue(b) => (hex::encode(b), LogBodyType::Bytes),
        any_value::Value::ArrayValue(_) | any_value::Value::KvlistValue(_) => {
            (any_value_to_json(value).to_string(), LogBodyType::Json)
        }
        _ => (flatten_any_value(body), LogBodyType::String),
    }
}

/// Hex-encode an id of `N` raw bytes to a `2N`-char lowercase string,
/// zero-padding or truncating irregular input.
fn encode_id<const N: usize>(bytes: &[u8]) -> String {
    if bytes.len() == N {
        return hex::encode(bytes);
    }
    let mut padded = [0u8; N];
    let start = N.saturating_sub(bytes.len());
    let copy_len = bytes.len().min(N);
    padded[start..start + copy_len].copy_from_slice(&bytes[..copy_len]);
    hex::encode(padded)
}

/// Like [`encode_id`], but absent ids (zero-length or all-zero bytes)
/// encode as the empty string.
fn encode_optional_id<const N: usize>(bytes: &[u8]) -> String {
    if bytes.is_empty() || bytes.iter().all(|&b| b == 0) {
        return String::new();
    }
    encode_id::<N>(bytes)
}
