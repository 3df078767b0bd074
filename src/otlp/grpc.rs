//! OTLP gRPC collectors for the three standard service interfaces.
//!
//! The services share the HTTP path's decoder and producer API and always
//! answer an empty export response; queue drops never fail an envelope.

use std::net::SocketAddr;
use std::sync::Arc;

use opentelemetry_proto::tonic::collector::{
    logs::v1::{
        ExportLogsServiceRequest, ExportLogsServiceResponse,
        logs_service_server::{LogsService, LogsServiceServer},
    },
    metrics::v1::{
        ExportMetricsServiceRequest, ExportMetricsServiceResponse,
        metrics_service_server::{MetricsService, MetricsServiceServer},
    },
    trace::v1::{
        ExportTraceServiceRequest, ExportTraceServiceResponse,
        trace_service_server::{TraceService, TraceServiceServer},
    },
};
use tonic::{Request, Response, Status};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::domain::Signal;
use crate::error::SluiceError;
use crate::otlp::converter::{convert_log_records, convert_metrics, convert_spans};
use crate::pipeline::Pipeline;
use crate::telemetry;

/// Shared state behind the three collector services.
#[derive(Clone)]
pub struct OtlpGrpcService {
    pipeline: Arc<Pipeline>,
}

impl OtlpGrpcService {
    #[must_use]
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }
}

#[tonic::async_trait]
impl TraceService for OtlpGrpcService {
    async fn export(
        &self,
        request: Request<ExportTraceServiceRequest>,
    ) -> Result<Response<ExportTraceServiceResponse>, Status> {
        let outcome = convert_spans(request.get_ref());
        if outcome.invalid > 0 {
            telemetry::records_invalid(Signal::Spans, outcome.invalid);
        }
        self.pipeline.ingest_spans(outcome.records).await;
        Ok(Response::new(ExportTraceServiceResponse::default()))
    }
}

#[tonic::async_trait]
impl MetricsService for OtlpGrpcService {
    async fn export(
        &self,
        request: Request<ExportMetricsServiceRequest>,
    ) -> Result<Response<ExportMetricsServiceResponse>, Status> {
        let outcome = convert_metrics(request.get_ref());
        if outcome.invalid > 0 {
            telemetry::records_invalid(Signal::Metrics, outcome.invalid);
        }
        self.pipeline.ingest_metrics(outcome.records).await;
        Ok(Response::new(ExportMetricsServiceResponse::default()))
    }
}

#[tonic::async_trait]
impl LogsService for OtlpGrpcService {
    async fn export(
        &self,
        request: Request<ExportLogsServiceRequest>,
    ) -> Result<Response<ExportLogsServiceResponse>, Status> {
        let outcome = convert_log_records(request.get_ref());
        if outcome.invalid > 0 {
            telemetry::records_invalid(Signal::Logs, outcome.invalid);
        }
        self.pipeline.ingest_logs(outcome.records).await;
        Ok(Response::new(ExportLogsServiceResponse::default()))
    }
}

/// Serve the three collector services until `shutdown` fires.
pub async fn serve_grpc(
    pipeline: Arc<Pipeline>,
    port: u16,
    shutdown: CancellationToken,
) -> Result<(), SluiceError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let service = OtlpGrpcService::new(pipeline);

    info!("OTLP gRPC server listening on {addr}");

    tonic::transport::Server::builder()
        .add_service(TraceServiceServer::new(service.clone()))
        .add_service(MetricsServiceServer::new(service.clone()))
        .add_service(LogsServiceServer::new(service))
        .serve_with_shutdown(addr, shutdown.cancelled_owned())
        .await?;

    Ok(())
}
