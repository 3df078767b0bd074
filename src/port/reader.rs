use super::BoxFuture;
use crate::error::QueryError;
use crate::query::envelope::{
    LogsRequest, LogsResponse, MetricsRequest, MetricsResponse, ServiceStat, TracesRequest,
    TracesResponse,
};

/// Read seam between the query handlers and the columnar store.
pub trait TelemetryReader: Send + Sync {
    fn query_traces(&self, req: TracesRequest) -> BoxFuture<'_, Result<TracesResponse, QueryError>>;

    fn query_metrics(
        &self,
        req: MetricsRequest,
    ) -> BoxFuture<'_, Result<MetricsResponse, QueryError>>;

    fn query_logs(&self, req: LogsRequest) -> BoxFuture<'_, Result<LogsResponse, QueryError>>;

    fn service_stats(&self) -> BoxFuture<'_, Result<Vec<ServiceStat>, QueryError>>;
}
