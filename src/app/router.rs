use std::sync::Arc;

use axum::{Router, routing::get};

use crate::app::health::{ReadyState, health_handler, ready_handler};
use crate::otlp::{OtlpState, otlp_routes};
use crate::pipeline::Pipeline;
use crate::port::TelemetryReader;
use crate::query::query_routes;
use crate::telemetry;

/// Build the operational HTTP router: health, readiness, self-metrics, and
/// the query API.
pub fn ops_router(
    reader: Arc<dyn TelemetryReader>,
    ready: ReadyState,
    health_path: &str,
    ready_path: &str,
) -> Router {
    let probes = Router::new()
        .route(health_path, get(health_handler))
        .route(ready_path, get(ready_handler).with_state(ready));

    let metrics = Router::new().route("/metrics", get(|| async { telemetry::gather() }));

    Router::new()
        .merge(probes)
        .merge(metrics)
        .merge(query_routes(reader))
}

/// Build the OTLP HTTP ingest router.
pub fn ingest_router(pipeline: Arc<Pipeline>) -> Router {
    otlp_routes(OtlpState { pipeline })
}
