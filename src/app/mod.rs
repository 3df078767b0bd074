pub mod health;
mod router;
pub mod server;
mod state;
pub mod tracing;

pub use router::{ingest_router, ops_router};
pub use state::AppState;

use crate::config;
use crate::error::SluiceError;
use crate::telemetry;

/// Application entry point. Initializes tracing and the counter registry,
/// loads configuration, and starts the servers.
pub async fn run() -> Result<(), SluiceError> {
    // Handle healthcheck subcommand (for Docker healthcheck in distroless image)
    if std::env::args().nth(1).as_deref() == Some("healthcheck") {
        match crate::healthcheck().await {
            Ok(()) => std::process::exit(0),
            Err(e) => {
                eprintln!("Healthcheck failed: {e}");
                std::process::exit(1)
            }
        }
    }

    let settings =
        config::get_configuration().map_err(|e| SluiceError::Config(e.to_string()))?;
    tracing::init_tracing(&settings.log_level);
    telemetry::init().map_err(|e| SluiceError::Telemetry(e.to_string()))?;
    ::tracing::info!("Loaded settings");

    let app_state = state::AppState::from_settings(&settings);

    server::serve(&settings, app_state).await
}
