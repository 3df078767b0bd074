use thiserror::Error;

#[derive(Error, Debug)]
pub enum SluiceError {
    #[error("Failed to load configuration: {0}")]
    Config(String),

    #[error("Failed to bind to address {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("gRPC transport error: {0}")]
    GrpcTransport(#[from] tonic::transport::Error),

    #[error("ClickHouse error: {0}")]
    ClickHouse(String),

    #[error("Failed to decode protobuf message: {0}")]
    ProtoDecode(String),

    #[error("Telemetry registry error: {0}")]
    Telemetry(String),
}

impl From<clickhouse::error::Error> for SluiceError {
    fn from(e: clickhouse::error::Error) -> Self {
        Self::ClickHouse(e.to_string())
    }
}

impl From<prost::DecodeError> for SluiceError {
    fn from(e: prost::DecodeError) -> Self {
        Self::ProtoDecode(e.to_string())
    }
}

/// Failure surface of a query handler.
///
/// `BadRequest` maps to HTTP 400, `Store` to HTTP 500.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("store error: {0}")]
    Store(String),
}

impl From<clickhouse::error::Error> for QueryError {
    fn from(e: clickhouse::error::Error) -> Self {
        Self::Store(e.to_string())
    }
}

/// Failure surface of a columnar batch write.
///
/// Workers retry `Transport` with backoff, drop the batch on `Schema`, and
/// abort without retrying or counting on `Cancelled`.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("transport error writing to {table}: {message}")]
    Transport { table: &'static str, message: String },

    #[error("schema or value error writing to {table}: {message}")]
    Schema { table: &'static str, message: String },

    #[error("write to {table} cancelled")]
    Cancelled { table: &'static str },
}

impl WriteError {
    /// Classify a ClickHouse client error for the given target table.
    ///
    /// Connection and timeout failures are worth retrying; everything else
    /// means the batch itself cannot be applied.
    #[must_use]
    pub fn classify(table: &'static str, e: &clickhouse::error::Error) -> Self {
        use clickhouse::error::Error as ChError;
        match e {
            ChError::Network(_) | ChError::TimedOut => WriteError::Transport {
                table,
                message: e.to_string(),
            },
            _ => WriteError::Schema {
                table,
                message: e.to_string(),
            },
        }
    }

    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self, WriteError::Transport { .. })
    }

    #[must_use]
    pub fn table(&self) -> &'static str {
        match self {
            WriteError::Transport { table, .. }
            | WriteError::Schema { table, .. }
            | WriteError::Cancelled { table } => table,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = SluiceError::Config("missing env var".into());
        assert!(err.to_string().contains("configuration"));
        assert!(err.to_string().contains("missing env var"));
    }

    #[test]
    fn test_clickhouse_error_display() {
        let err = SluiceError::ClickHouse("connection failed".into());
        assert!(err.to_string().contains("ClickHouse"));
        assert!(err.to_string().contains("connection failed"));
    }

    #[test]
    fn test_proto_decode_error_display() {
        let err = SluiceError::ProtoDecode("invalid wire type".into());
        assert!(err.to_string().contains("protobuf"));
        assert!(err.to_string().contains("invalid wire type"));
    }

    #[test]
    fn test_error_implements_std_error() {
        fn assert_error<E: std::error::Error>() {}
        assert_error::<SluiceError>();
        assert_error::<WriteError>();
    }

    #[test]
    fn test_transport_is_retriable() {
        let err = WriteError::Transport {
            table: "otel_traces",
            message: "connection reset".into(),
        };
        assert!(err.is_retriable());
        assert_eq!(err.table(), "otel_traces");
    }

    #[test]
    fn test_schema_and_cancelled_are_not_retriable() {
        let schema = WriteError::Schema {
            table: "otel_logs",
            message: "type mismatch".into(),
        };
        let cancelled = WriteError::Cancelled { table: "otel_logs" };
        assert!(!schema.is_retriable());
        assert!(!cancelled.is_retriable());
    }
}
