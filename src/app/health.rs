//! Liveness and readiness handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

/// Readiness flag with atomic publication. Flipping it is idempotent.
#[derive(Clone, Default)]
pub struct ReadyState(Arc<AtomicBool>);

impl ReadyState {
    pub fn set_ready(&self, ready: bool) {
        self.0.store(ready, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Liveness probe: always OK.
pub async fn health_handler() -> &'static str {
    "OK"
}

/// Readiness probe: 200 while serving, 503 during startup and drain.
pub async fn ready_handler(State(ready): State<ReadyState>) -> impl IntoResponse {
    if ready.is_ready() {
        (StatusCode::OK, "Ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Not Ready")
    }
}
