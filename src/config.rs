//! Runtime settings.
//!
//! Loaded from an optional `configuration` document, with a fixed set of
//! environment variables overriding specific fields afterwards.

use std::time::Duration;

use config::{Config, ConfigError, File};
use serde::Deserialize;

use crate::pipeline::{PipelineConfig, WorkerConfig};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub clickhouse_host: String,
    pub clickhouse_port: u16,
    pub clickhouse_user: String,
    pub clickhouse_password: String,
    pub clickhouse_database: String,

    /// OTLP gRPC collector port.
    pub otlp_grpc_port: u16,
    /// OTLP HTTP receiver port.
    pub otlp_http_port: u16,
    /// Query + operational HTTP port (health, readiness, metrics).
    pub http_port: u16,
    pub health_path: String,
    pub ready_path: String,

    pub log_level: String,

    pub queue_size: usize,
    pub enqueue_timeout_ms: u64,
    /// Workers per signal; 0 resolves to cores minus one.
    pub worker_count: usize,
    pub batch_size: usize,
    pub batch_timeout_secs: u64,
    pub retry_max_attempts: u32,
    pub retry_initial_interval_ms: u64,
    pub retry_max_interval_secs: u64,
    pub shutdown_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            clickhouse_host: "localhost".to_string(),
            clickhouse_port: 8123,
            clickhouse_user: "default".to_string(),
            clickhouse_password: String::new(),
            clickhouse_database: "otel".to_string(),
            otlp_grpc_port: 4317,
            otlp_http_port: 4318,
            http_port: 8080,
            health_path: "/health".to_string(),
            ready_path: "/ready".to_string(),
            log_level: "info".to_string(),
            queue_size: 100_000,
            enqueue_timeout_ms: 100,
            worker_count: 0,
            batch_size: 10_000,
            batch_timeout_secs: 10,
            retry_max_attempts: 5,
            retry_initial_interval_ms: 1_000,
            retry_max_interval_secs: 30,
            shutdown_timeout_secs: 30,
        }
    }
}

impl Settings {
    /// Queue and worker tuning derived from these settings.
    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            queue_size: self.queue_size,
            enqueue_timeout: Duration::from_millis(self.enqueue_timeout_ms),
            worker_count: self.worker_count,
            worker: WorkerConfig {
                batch_size: self.batch_size,
                batch_timeout: Duration::from_secs(self.batch_timeout_secs),
                retry_max_attempts: self.retry_max_attempts,
                retry_initial_interval: Duration::from_millis(self.retry_initial_interval_ms),
                retry_max_interval: Duration::from_secs(self.retry_max_interval_secs),
            },
        }
    }

    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    #[must_use]
    pub fn clickhouse_url(&self) -> String {
        format!("http://{}:{}", self.clickhouse_host, self.clickhouse_port)
    }
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let loaded = Config::builder()
        .add_source(File::with_name("configuration").required(false))
        .build()?;

    let mut settings: Settings = loaded.try_deserialize()?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(v) = std::env::var("CLICKHOUSE_HOST") {
        settings.clickhouse_host = v;
    }
    if let Ok(v) = std::env::var("CLICKHOUSE_DATABASE") {
        settings.clickhouse_database = v;
    }
    if let Ok(v) = std::env::var("CLICKHOUSE_USERNAME") {
        settings.clickhouse_user = v;
    }
    if let Ok(v) = std::env::var("CLICKHOUSE_PASSWORD") {
        settings.clickhouse_password = v;
    }
    if let Ok(v) = std::env::var("LOG_LEVEL") {
        settings.log_level = v;
    }
    if let Ok(v) = std::env::var("OTLP_GRPC_PORT")
        && let Ok(port) = v.parse()
    {
        settings.otlp_grpc_port = port;
    }
    if let Ok(v) = std::env::var("OTLP_HTTP_PORT")
        && let Ok(port) = v.parse()
    {
        settings.otlp_http_port = port;
    }
}
