//! OTLP ingress round-trips: protobuf envelope in, normalized records at
//! the sink, envelope success even when individual records are dropped.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum_test::TestServer;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::collector::trace::v1::trace_service_server::TraceService;
use opentelemetry_proto::tonic::common::v1::{AnyValue, KeyValue, any_value};
use opentelemetry_proto::tonic::resource::v1::Resource;
use opentelemetry_proto::tonic::trace::v1::{ResourceSpans, ScopeSpans, Span as OtlpSpan, Status};
use prost::Message;
use tokio_util::sync::CancellationToken;

use sluice::domain::Span;
use sluice::error::WriteError;
use sluice::otlp::grpc::OtlpGrpcService;
use sluice::otlp::{OtlpState, otlp_routes};
use sluice::pipeline::{Pipeline, PipelineConfig, PipelineSinks, WorkerConfig};
use sluice::port::{BoxFuture, RecordSink};

/// Captures flushed spans for assertions.
struct SpanCaptureSink {
    spans: Mutex<Vec<Span>>,
}

impl RecordSink<Span> for SpanCaptureSink {
    fn table(&self) -> &'static str {
        "otel_traces"
    }

    fn insert_batch<'a>(
        &'a self,
        batch: &'a [Span],
        _cancel: CancellationToken,
    ) -> BoxFuture<'a, Result<(), WriteError>> {
        Box::pin(async move {
            self.spans.lock().unwrap().extend_from_slice(batch);
            Ok(())
        })
    }
}

struct NullSink {
    table: &'static str,
    records: AtomicUsize,
}

impl<T: Send + Sync> RecordSink<T> for NullSink {
    fn table(&self) -> &'static str {
        self.table
    }

    fn insert_batch<'a>(
        &'a self,
        batch: &'a [T],
        _cancel: CancellationToken,
    ) -> BoxFuture<'a, Result<(), WriteError>> {
        Box::pin(async move {
            self.records.fetch_add(batch.len(), Ordering::SeqCst);
            Ok(())
        })
    }
}

fn capture_pipeline() -> (Arc<Pipeline>, Arc<SpanCaptureSink>) {
    let capture = Arc::new(SpanCaptureSink {
        spans: Mutex::new(Vec::new()),
    });
    let config = PipelineConfig {
        queue_size: 1024,
        enqueue_timeout: Duration::from_millis(100),
        worker_count: 1,
        worker: WorkerConfig {
            batch_size: 1,
            batch_timeout: Duration::from_secs(10),
            ..WorkerConfig::default()
        },
    };
    let pipeline = Pipeline::start(
        &config,
        PipelineSinks {
            spans: capture.clone(),
            metrics: Arc::new(NullSink {
                table: "otel_metrics",
                records: AtomicUsize::new(0),
            }),
            logs: Arc::new(NullSink {
                table: "otel_logs",
                records: AtomicUsize::new(0),
            }),
        },
    );
    (Arc::new(pipeline), capture)
}

fn seed_trace_request() -> ExportTraceServiceRequest {
    let start = 1_700_000_000_000_000_000_u64;
    ExportTraceServiceRequest {
        resource_spans: vec![ResourceSpans {
            resource: Some(Resource {
                attributes: vec![KeyValue {
                    key: "service.name".to_string(),
                    value: Some(AnyValue {
                        value: Some(any_value::Value::StringValue("users".to_string())),
                    }),
                }],
                ..Default::default()
            }),
            scope_spans: vec![ScopeSpans {
                spans: vec![OtlpSpan {
                    trace_id: (0x01..=0x10).collect(),
                    span_id: (0x01..=0x08).collect(),
                    name: "GET /api/users".to_string(),
                    start_time_unix_nano: start,
                    end_time_unix_nano: start + 100_000_000,
                    status: Some(Status {
                        code: 1,
                        ..Default::default()
                    }),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }],
    }
}

async fn wait_for_spans(capture: &SpanCaptureSink, n: usize, deadline: Duration) -> Vec<Span> {
    let started = std::time::Instant::now();
    loop {
        {
            let spans = capture.spans.lock().unwrap();
            if spans.len() >= n {
                return spans.clone();
            }
        }
        assert!(
            started.elapsed() < deadline,
            "sink never received {n} spans"
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

#[tokio::test]
async fn test_span_round_trip_over_http() {
    let (pipeline, capture) = capture_pipeline();
    let server = TestServer::new(otlp_routes(OtlpState { pipeline })).unwrap();

    let response = server
        .post("/v1/traces")
        .content_type("application/x-protobuf")
        .bytes(seed_trace_request().encode_to_vec().into())
        .await;
    response.assert_status_ok();

    let spans = wait_for_spans(&capture, 1, Duration::from_millis(100)).await;
    let span = &spans[0];
    assert_eq!(span.trace_id, "0102030405060708090a0b0c0d0e0f10");
    assert_eq!(span.span_name, "GET /api/users");
    assert_eq!(span.duration_ns, 100_000_000);
    assert_eq!(span.status_code.as_str(), "ok");
    assert_eq!(span.service.name, "users");
}

#[tokio::test]
async fn test_span_round_trip_over_grpc() {
    let (pipeline, capture) = capture_pipeline();
    let service = OtlpGrpcService::new(pipeline);

    let response = service
        .export(tonic::Request::new(seed_trace_request()))
        .await
        .unwrap();
    let _ = response.into_inner();

    let spans = wait_for_spans(&capture, 1, Duration::from_millis(100)).await;
    assert_eq!(spans[0].trace_id, "0102030405060708090a0b0c0d0e0f10");
}

#[tokio::test]
async fn test_undecodable_body_is_a_bad_request() {
    let (pipeline, _capture) = capture_pipeline();
    let server = TestServer::new(otlp_routes(OtlpState { pipeline })).unwrap();

    let response = server
        .post("/v1/traces")
        .content_type("application/x-protobuf")
        .bytes(vec![0xff, 0xff, 0xff, 0xff].into())
        .await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_empty_envelope_is_success() {
    let (pipeline, capture) = capture_pipeline();
    let server = TestServer::new(otlp_routes(OtlpState { pipeline })).unwrap();

    let response = server
        .post("/v1/traces")
        .content_type("application/x-protobuf")
        .bytes(ExportTraceServiceRequest::default().encode_to_vec().into())
        .await;
    response.assert_status_ok();
    assert!(capture.spans.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_envelope_with_invalid_span_still_succeeds() {
    let (pipeline, capture) = capture_pipeline();
    let server = TestServer::new(otlp_routes(OtlpState { pipeline })).unwrap();

    let mut request = seed_trace_request();
    // A span that ends before it starts rides along with the valid one.
    request.resource_spans[0].scope_spans[0].spans.push(OtlpSpan {
        trace_id: vec![9; 16],
        span_id: vec![9; 8],
        name: "broken".to_string(),
        start_time_unix_nano: 200,
        end_time_unix_nano: 100,
        ..Default::default()
    });

    let response = server
        .post("/v1/traces")
        .content_type("application/x-protobuf")
        .bytes(request.encode_to_vec().into())
        .await;
    response.assert_status_ok();

    let spans = wait_for_spans(&capture, 1, Duration::from_millis(100)).await;
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].span_name, "GET /api/users");
}
