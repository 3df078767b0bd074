use std::sync::Arc;

use clickhouse::{Client, Compression};

use crate::adapter::clickhouse::{ClickHouseReader, ClickHouseWriter};
use crate::app::health::ReadyState;
use crate::config::Settings;
use crate::pipeline::{Pipeline, PipelineSinks};
use crate::port::TelemetryReader;

/// Shared application state: the running pipeline, the store reader, and
/// the readiness flag.
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub reader: Arc<dyn TelemetryReader>,
    pub ready: ReadyState,
}

impl AppState {
    /// Build the store client, spawn the pipeline workers, and wire the
    /// reader. The client is shared by the writer and reader; it is
    /// internally pooled and re-entrant.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let client = Client::default()
            .with_url(settings.clickhouse_url())
            .with_user(&settings.clickhouse_user)
            .with_password(&settings.clickhouse_password)
            .with_database(&settings.clickhouse_database)
            .with_compression(Compression::Lz4);

        let writer = Arc::new(ClickHouseWriter::new(client.clone()));
        let sinks = PipelineSinks {
            spans: writer.clone(),
            metrics: writer.clone(),
            logs: writer,
        };
        let pipeline = Arc::new(Pipeline::start(&settings.pipeline_config(), sinks));
        let reader: Arc<dyn TelemetryReader> = Arc::new(ClickHouseReader::new(client));

        Self {
            pipeline,
            reader,
            ready: ReadyState::default(),
        }
    }
}
