//! OTLP HTTP receiver.
//!
//! Supports:
//! - POST /v1/traces (OTLP HTTP/protobuf)
//! - POST /v1/metrics (OTLP HTTP/protobuf)
//! - POST /v1/logs (OTLP HTTP/protobuf)
//!
//! Only an undecodable body fails a request. Records dropped on a full
//! queue are counted, never surfaced: the envelope still succeeds.

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::post,
};
use opentelemetry_proto::tonic::collector::{
    logs::v1::{ExportLogsServiceRequest, ExportLogsServiceResponse},
    metrics::v1::{ExportMetricsServiceRequest, ExportMetricsServiceResponse},
    trace::v1::{ExportTraceServiceRequest, ExportTraceServiceResponse},
};
use prost::Message;
use tracing::{error, instrument};

use crate::domain::Signal;
use crate::otlp::converter::{convert_log_records, convert_metrics, convert_spans};
use crate::pipeline::Pipeline;
use crate::telemetry;

const PROTOBUF_CONTENT_TYPE: (header::HeaderName, &str) =
    (header::CONTENT_TYPE, "application/x-protobuf");

/// Application state for OTLP HTTP handlers.
#[derive(Clone)]
pub struct OtlpState {
    pub pipeline: Arc<Pipeline>,
}

/// Create the Axum router for the OTLP HTTP endpoints.
pub fn otlp_routes(state: OtlpState) -> Router {
    Router::new()
        .route("/v1/traces", post(receive_traces))
        .route("/v1/metrics", post(receive_metrics))
        .route("/v1/logs", post(receive_logs))
        .with_state(state)
}

fn encoded<T: Message + Default>(response: &T) -> Bytes {
    let mut buf = Vec::with_capacity(response.encoded_len());
    let _ = response.encode(&mut buf);
    Bytes::from(buf)
}

#[instrument(skip(state, body), fields(body_size = body.len()))]
async fn receive_traces(State(state): State<OtlpState>, body: Bytes) -> impl IntoResponse {
    let request = match ExportTraceServiceRequest::decode(body) {
        Ok(req) => req,
        Err(e) => {
            error!(error = %e, "Failed to decode OTLP traces request");
            return (StatusCode::BAD_REQUEST, [PROTOBUF_CONTENT_TYPE], Bytes::new());
        }
    };

    let outcome = convert_spans(&request);
    if outcome.invalid > 0 {
        telemetry::records_invalid(Signal::Spans, outcome.invalid);
    }
    state.pipeline.ingest_spans(outcome.records).await;

    (
        StatusCode::OK,
        [PROTOBUF_CONTENT_TYPE],
        encoded(&ExportTraceServiceResponse::default()),
    )
}

#[instrument(skip(state, body), fields(body_size = body.len()))]
async fn receive_metrics(State(state): State<OtlpState>, body: Bytes) -> impl IntoResponse {
    let request = match ExportMetricsServiceRequest::decode(body) {
        Ok(req) => req,
        Err(e) => {
            error!(error = %e, "Failed to decode OTLP metrics request");
            return (StatusCode::BAD_REQUEST, [PROTOBUF_CONTENT_TYPE], Bytes::new());
        }
    };

    let outcome = convert_metrics(&request);
    if outcome.invalid > 0 {
        telemetry::records_invalid(Signal::Metrics, outcome.invalid);
    }
    state.pipeline.ingest_metrics(outcome.records).await;

    (
        StatusCode::OK,
        [PROTOBUF_CONTENT_TYPE],
        encoded(&ExportMetricsServiceResponse::default()),
    )
}

#[instrument(skip(state, body), fields(body_size = body.len()))]
async fn receive_logs(State(state): State<OtlpState>, body: Bytes) -> impl IntoResponse {
    let request = match ExportLogsServiceRequest::decode(body) {
        Ok(req) => req,
        Err(e) => {
            error!(error = %e, "Failed to decode OTLP logs request");
            return (StatusCode::BAD_REQUEST, [PROTOBUF_CONTENT_TYPE], Bytes::new());
        }
    };

    let outcome = convert_log_records(&request);
    if outcome.invalid > 0 {
        telemetry::records_invalid(Signal::Logs, outcome.invalid);
    }
    state.pipeline.ingest_logs(outcome.records).await;

    (
        StatusCode::OK,
        [PROTOBUF_CONTENT_TYPE],
        encoded(&ExportLogsServiceResponse::default()),
    )
}
