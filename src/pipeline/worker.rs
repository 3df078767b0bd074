//! Batch workers: drain a signal queue, flush on size or time, retry
//! transient write failures with exponential backoff, drain on shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::Signal;
use crate::error::WriteError;
use crate::port::RecordSink;
use crate::telemetry;

/// Flush and retry tuning for one signal's workers.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Flush as soon as the accumulator reaches this many records.
    pub batch_size: usize,
    /// Flush a non-empty accumulator at least this often.
    pub batch_timeout: Duration,
    /// Retries after the first failed write attempt.
    pub retry_max_attempts: u32,
    /// Backoff before the first retry; doubles per retry.
    pub retry_initial_interval: Duration,
    /// Backoff cap.
    pub retry_max_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10_000,
            batch_timeout: Duration::from_secs(10),
            retry_max_attempts: 5,
            retry_initial_interval: Duration::from_secs(1),
            retry_max_interval: Duration::from_secs(30),
        }
    }
}

/// Backoff before retry number `attempt` (1-based): `initial * 2^(k-1)`,
/// capped at the max interval.
#[must_use]
pub fn retry_backoff(config: &WorkerConfig, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(31);
    let uncapped = config
        .retry_initial_interval
        .saturating_mul(2u32.saturating_pow(exp));
    uncapped.min(config.retry_max_interval)
}

/// Spawn `count` identical workers draining `rx` into `sink`.
///
/// Workers share nothing mutable with each other; the queue, the shutdown
/// token, and the sink are the only cross-task state. `shutdown` asks for a
/// final flush and exit; `abort` cancels in-flight store calls when the
/// shutdown deadline has passed.
pub fn spawn_workers<T: Send + 'static>(
    signal: Signal,
    count: usize,
    rx: &async_channel::Receiver<T>,
    sink: Arc<dyn RecordSink<T>>,
    config: WorkerConfig,
    shutdown: CancellationToken,
    abort: CancellationToken,
) -> Vec<JoinHandle<()>> {
    (0..count.max(1))
        .map(|worker_id| {
            let rx = rx.clone();
            let sink = Arc::clone(&sink);
            let config = config.clone();
            let shutdown = shutdown.clone();
            let abort = abort.clone();
            tokio::spawn(async move {
                worker_loop(signal, worker_id, rx, sink, config, shutdown, abort).await;
            })
        })
        .collect()
}

async fn worker_loop<T>(
    signal: Signal,
    worker_id: usize,
    rx: async_channel::Receiver<T>,
    sink: Arc<dyn RecordSink<T>>,
    config: WorkerConfig,
    shutdown: CancellationToken,
    abort: CancellationToken,
) {
    let mut batch: Vec<T> = Vec::with_capacity(config.batch_size);
    // First tick is one full period out, not immediate.
    let mut ticker = tokio::time::interval_at(
        Instant::now() + config.batch_timeout,
        config.batch_timeout,
    );
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!(
        signal = signal.as_str(),
        worker_id,
        batch_size = config.batch_size,
        "worker started"
    );

    loop {
        // Biased toward the queue: when shutdown closes the producer side,
        // buffered records are drained and flushed before the worker exits.
        tokio::select! {
            biased;
            recv = rx.recv() => match recv {
                Ok(record) => {
                    batch.push(record);
                    if batch.len() >= config.batch_size {
                        flush(&*sink, &mut batch, &config, &abort).await;
                        ticker.reset();
                    }
                }
                Err(_closed) => {
                    flush(&*sink, &mut batch, &config, &abort).await;
                    break;
                }
            },
            _ = ticker.tick() => {
                if !batch.is_empty() {
                    flush(&*sink, &mut batch, &config, &abort).await;
                }
            }
            () = shutdown.cancelled() => {
                flush(&*sink, &mut batch, &config, &abort).await;
                break;
            }
        }
    }

    info!(signal = signal.as_str(), worker_id, "worker stopped");
}

/// Hand the accumulator to the sink as one batch. The worker stays committed
/// to the batch across retries and drains nothing else meanwhile; after the
/// retry budget (or a fatal error) the batch is dropped and counted.
async fn flush<T>(
    sink: &dyn RecordSink<T>,
    batch: &mut Vec<T>,
    config: &WorkerConfig,
    abort: &CancellationToken,
) {
    if batch.is_empty() {
        return;
    }
    let table = sink.table();
    let rows = batch.len();
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        match sink.insert_batch(batch.as_slice(), abort.clone()).await {
            Ok(()) => {
                telemetry::storage_write_ok(table);
                telemetry::flush_duration(table, started.elapsed().as_secs_f64());
                debug!(table, rows, "flushed batch");
                batch.clear();
                return;
            }
            Err(err) if err.is_retriable() && attempt < config.retry_max_attempts => {
                attempt += 1;
                telemetry::storage_retry(table);
                let backoff = retry_backoff(config, attempt);
                warn!(
                    table,
                    rows,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "transient write failure, backing off"
                );
                tokio::select! {
                    () = tokio::time::sleep(backoff) => {}
                    () = abort.cancelled() => {
                        batch.clear();
                        return;
                    }
                }
            }
            Err(WriteError::Cancelled { .. }) => {
                // Cancellation is neither retried nor counted as an error.
                batch.clear();
                return;
            }
            Err(err) => {
                telemetry::storage_write_error(table);
                error!(table, rows, attempt, error = %err, "dropping batch after write failure");
                batch.clear();
                return;
            }
        }
    }
}
