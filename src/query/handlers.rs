//! Axum handlers for the query API.
//!
//! Bad envelopes (JSON parse failures, unknown aggregations) map to 400
//! with the decoder's message; store failures map to 500 and increment the
//! query error counter.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use tracing::error;

use crate::error::QueryError;
use crate::port::TelemetryReader;
use crate::query::envelope::{
    LogsRequest, LogsResponse, MetricsRequest, MetricsResponse, ServiceStat, TracesRequest,
    TracesResponse,
};
use crate::telemetry;

/// Build the `/api/v1` router over a store reader.
pub fn query_routes(reader: Arc<dyn TelemetryReader>) -> Router {
    Router::new()
        .route("/api/v1/traces", post(query_traces))
        .route("/api/v1/metrics", post(query_metrics))
        .route("/api/v1/logs", post(query_logs))
        .route("/api/v1/services/stats", get(service_stats))
        .with_state(reader)
}

async fn query_traces(
    State(reader): State<Arc<dyn TelemetryReader>>,
    Json(req): Json<TracesRequest>,
) -> Result<Json<TracesResponse>, (StatusCode, String)> {
    reader
        .query_traces(req)
        .await
        .map(Json)
        .map_err(|e| error_response("traces", e))
}

async fn query_metrics(
    State(reader): State<Arc<dyn TelemetryReader>>,
    Json(req): Json<MetricsRequest>,
) -> Result<Json<MetricsResponse>, (StatusCode, String)> {
    reader
        .query_metrics(req)
        .await
        .map(Json)
        .map_err(|e| error_response("metrics", e))
}

async fn query_logs(
    State(reader): State<Arc<dyn TelemetryReader>>,
    Json(req): Json<LogsRequest>,
) -> Result<Json<LogsResponse>, (StatusCode, String)> {
    reader
        .query_logs(req)
        .await
        .map(Json)
        .map_err(|e| error_response("logs", e))
}

async fn service_stats(
    State(reader): State<Arc<dyn TelemetryReader>>,
) -> Result<Json<Vec<ServiceStat>>, (StatusCode, String)> {
    reader
        .service_stats()
        .await
        .map(Json)
        .map_err(|e| error_response("services/stats", e))
}

fn error_response(endpoint: &'static str, err: QueryError) -> (StatusCode, String) {
    match err {
        QueryError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
        QueryError::Store(message) => {
            telemetry::query_error(endpoint);
            error!(endpoint, error = %message, "query failed");
            (StatusCode::INTERNAL_SERVER_ERROR, message)
        }
    }
}
