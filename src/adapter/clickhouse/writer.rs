//! Columnar batch writer.
//!
//! Each insert prepares one statement for the target table, appends every
//! row in input order, and submits the batch as a single commit. A dropped
//! insert (cancellation) never commits a partial batch.

use clickhouse::Client;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::adapter::clickhouse::rows::{LogRow, MetricRow, SpanRow};
use crate::domain::{LogRecord, Metric, Signal, Span};
use crate::error::WriteError;
use crate::port::{BoxFuture, RecordSink};

/// Shared batch writer over the pooled ClickHouse client.
///
/// The client is re-entrant; all workers of all signals share one writer.
pub struct ClickHouseWriter {
    client: Client,
}

impl ClickHouseWriter {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn write_rows<R>(
        &self,
        table: &'static str,
        rows: Vec<R>,
        cancel: CancellationToken,
    ) -> Result<(), WriteError>
    where
        R: clickhouse::Row + Serialize + Send + Sync,
    {
        if rows.is_empty() {
            return Ok(());
        }
        if cancel.is_cancelled() {
            return Err(WriteError::Cancelled { table });
        }

        let commit = async {
            let mut insert = self
                .client
                .insert::<R>(table)
                .map_err(|e| WriteError::classify(table, &e))?;
            for row in &rows {
                insert
                    .write(row)
                    .await
                    .map_err(|e| WriteError::classify(table, &e))?;
            }
            insert
                .end()
                .await
                .map_err(|e| WriteError::classify(table, &e))?;
            Ok(())
        };

        tokio::select! {
            result = commit => {
                if result.is_ok() {
                    debug!(table, rows = rows.len(), "committed batch");
                }
                result
            }
            () = cancel.cancelled() => Err(WriteError::Cancelled { table }),
        }
    }
}

impl RecordSink<Span> for ClickHouseWriter {
    fn table(&self) -> &'static str {
        Signal::Spans.table()
    }

    fn insert_batch<'a>(
        &'a self,
        batch: &'a [Span],
        cancel: CancellationToken,
    ) -> BoxFuture<'a, Result<(), WriteError>> {
        Box::pin(async move {
            let rows: Vec<SpanRow> = batch.iter().cloned().map(SpanRow::from).collect();
            self.write_rows(Signal::Spans.table(), rows, cancel).await
        })
    }
}

impl RecordSink<Metric> for ClickHouseWriter {
    fn table(&self) -> &'static str {
        Signal::Metrics.table()
    }

    fn insert_batch<'a>(
        &'a self,
        batch: &'a [Metric],
        cancel: CancellationToken,
    ) -> BoxFuture<'a, Result<(), WriteError>> {
        Box::pin(async move {
            let rows: Vec<MetricRow> = batch.iter().cloned().map(MetricRow::from).collect();
            self.write_rows(Signal::Metrics.table(), rows, cancel).await
        })
    }
}

impl RecordSink<LogRecord> for ClickHouseWriter {
    fn table(&self) -> &'static str {
        Signal::Logs.table()
    }

    fn insert_batch<'a>(
        &'a self,
        batch: &'a [LogRecord],
        cancel: CancellationToken,
    ) -> BoxFuture<'a, Result<(), WriteError>> {
        Box::pin(async move {
            let rows: Vec<LogRow> = batch.iter().cloned().map(LogRow::from).collect();
            self.write_rows(Signal::Logs.table(), rows, cancel).await
        })
    }
}
