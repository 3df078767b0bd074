use crate::app::router;
use crate::app::state::AppState;
use crate::config::Settings;
use crate::error::SluiceError;
use crate::otlp::grpc::serve_grpc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Start the three transports and drive the two-phase shutdown.
///
/// Phase one flips readiness off; phase two stops accepting OTLP input and
/// the query API. Only then are the workers signalled, so every accepted
/// record still gets a flush attempt within the shutdown deadline.
pub async fn serve(settings: &Settings, state: AppState) -> Result<(), SluiceError> {
    let transport_shutdown = CancellationToken::new();

    // Operational server: health, readiness, metrics, query API.
    let ops_bind_addr = format!("0.0.0.0:{}", settings.http_port);
    let ops_listener = tokio::net::TcpListener::bind(&ops_bind_addr)
        .await
        .map_err(|e| SluiceError::Bind {
            address: ops_bind_addr.clone(),
            source: e,
        })?;
    info!("Query/ops server listening on {}", ops_listener.local_addr()?);
    info!("  - GET  {}              (liveness)", settings.health_path);
    info!("  - GET  {}               (readiness)", settings.ready_path);
    info!("  - GET  /metrics             (self-metrics)");
    info!("  - POST /api/v1/traces       (trace search)");
    info!("  - POST /api/v1/metrics      (metric range query)");
    info!("  - POST /api/v1/logs         (log search)");
    info!("  - GET  /api/v1/services/stats");

    // OTLP HTTP receiver.
    let ingest_bind_addr = format!("0.0.0.0:{}", settings.otlp_http_port);
    let ingest_listener = tokio::net::TcpListener::bind(&ingest_bind_addr)
        .await
        .map_err(|e| SluiceError::Bind {
            address: ingest_bind_addr.clone(),
            source: e,
        })?;
    info!(
        "OTLP HTTP server listening on {}",
        ingest_listener.local_addr()?
    );
    info!("  - POST /v1/traces   (OTLP traces)");
    info!("  - POST /v1/metrics  (OTLP metrics)");
    info!("  - POST /v1/logs     (OTLP logs)");

    let ops_app = router::ops_router(
        state.reader.clone(),
        state.ready.clone(),
        &settings.health_path,
        &settings.ready_path,
    );
    let ingest_app = router::ingest_router(state.pipeline.clone());

    // OTLP gRPC collector.
    let grpc_handle = tokio::spawn(serve_grpc(
        state.pipeline.clone(),
        settings.otlp_grpc_port,
        transport_shutdown.clone(),
    ));

    let ingest_shutdown = transport_shutdown.clone();
    let ingest_handle = tokio::spawn(async move {
        axum::serve(ingest_listener, ingest_app)
            .with_graceful_shutdown(ingest_shutdown.cancelled_owned())
            .await
    });

    // Every transport is bound; start answering readiness probes.
    state.ready.set_ready(true);

    let ready = state.ready.clone();
    let stop_transports = transport_shutdown.clone();
    axum::serve(ops_listener, ops_app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            ready.set_ready(false);
            stop_transports.cancel();
        })
        .await?;

    match ingest_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("OTLP HTTP server error: {e}"),
        Err(e) => error!("OTLP HTTP server task failed: {e}"),
    }
    match grpc_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("OTLP gRPC server error: {e}"),
        Err(e) => error!("OTLP gRPC server task failed: {e}"),
    }

    // Transports are closed; drain the workers, then drop the store client.
    state.pipeline.shutdown(settings.shutdown_timeout()).await;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for SIGTERM or SIGINT (Ctrl+C) for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, initiating graceful shutdown"),
        () = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}
