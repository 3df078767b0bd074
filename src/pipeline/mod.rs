//! The ingestion pipeline: per-signal bounded queues drained by a pool of
//! batch workers that write to the columnar store.

pub mod queue;
pub mod worker;

pub use queue::SignalQueue;
pub use worker::WorkerConfig;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::{LogRecord, Metric, Signal, Span};
use crate::port::RecordSink;
use crate::telemetry;

/// Queue and worker tuning shared by the three signals.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Capacity of each signal queue.
    pub queue_size: usize,
    /// Bounded producer hand-off before a record is dropped.
    pub enqueue_timeout: Duration,
    /// Workers per signal; 0 means cores minus one.
    pub worker_count: usize,
    pub worker: WorkerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_size: 100_000,
            enqueue_timeout: Duration::from_millis(100),
            worker_count: 0,
            worker: WorkerConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Resolve `worker_count = 0` to the host's parallelism minus one.
    #[must_use]
    pub fn effective_worker_count(&self) -> usize {
        if self.worker_count > 0 {
            return self.worker_count;
        }
        std::thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1))
            .unwrap_or(1)
            .max(1)
    }
}

/// One sink per signal table.
pub struct PipelineSinks {
    pub spans: Arc<dyn RecordSink<Span>>,
    pub metrics: Arc<dyn RecordSink<Metric>>,
    pub logs: Arc<dyn RecordSink<LogRecord>>,
}

/// Running pipeline: the producer side handed to the transports plus the
/// worker tasks drained on shutdown.
pub struct Pipeline {
    spans: SignalQueue<Span>,
    metrics: SignalQueue<Metric>,
    logs: SignalQueue<LogRecord>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shutdown: CancellationToken,
    abort: CancellationToken,
}

impl Pipeline {
    /// Build the queues and spawn the worker pools.
    #[must_use]
    pub fn start(config: &PipelineConfig, sinks: PipelineSinks) -> Self {
        let spans = SignalQueue::new(Signal::Spans, config.queue_size, config.enqueue_timeout);
        let metrics = SignalQueue::new(Signal::Metrics, config.queue_size, config.enqueue_timeout);
        let logs = SignalQueue::new(Signal::Logs, config.queue_size, config.enqueue_timeout);

        let shutdown = CancellationToken::new();
        let abort = CancellationToken::new();
        let count = config.effective_worker_count();

        let mut workers = worker::spawn_workers(
            Signal::Spans,
            count,
            &spans.receiver(),
            sinks.spans,
            config.worker.clone(),
            shutdown.clone(),
            abort.clone(),
        );
        workers.extend(worker::spawn_workers(
            Signal::Metrics,
            count,
            &metrics.receiver(),
            sinks.metrics,
            config.worker.clone(),
            shutdown.clone(),
            abort.clone(),
        ));
        workers.extend(worker::spawn_workers(
            Signal::Logs,
            count,
            &logs.receiver(),
            sinks.logs,
            config.worker.clone(),
            shutdown.clone(),
            abort.clone(),
        ));

        info!(
            workers_per_signal = count,
            queue_size = config.queue_size,
            batch_size = config.worker.batch_size,
            "pipeline started"
        );

        Self {
            spans,
            metrics,
            logs,
            workers: Mutex::new(workers),
            shutdown,
            abort,
        }
    }

    /// Hand decoded spans to the workers. Drops are counted, never errors.
    pub async fn ingest_spans(&self, records: Vec<Span>) {
        telemetry::records_received(Signal::Spans, records.len() as u64);
        self.spans.enqueue_all(records).await;
    }

    /// Hand decoded metric points to the workers.
    pub async fn ingest_metrics(&self, records: Vec<Metric>) {
        telemetry::records_received(Signal::Metrics, records.len() as u64);
        self.metrics.enqueue_all(records).await;
    }

    /// Hand decoded log records to the workers.
    pub async fn ingest_logs(&self, records: Vec<LogRecord>) {
        telemetry::records_received(Signal::Logs, records.len() as u64);
        self.logs.enqueue_all(records).await;
    }

    /// Drain and stop the workers.
    ///
    /// Closes the producer side so queued records are still flushed, raises
    /// the shutdown signal, and waits up to `deadline`. When the deadline
    /// elapses, in-flight store calls are cancelled and remaining batches
    /// are lost.
    pub async fn shutdown(&self, deadline: Duration) {
        self.spans.close();
        self.metrics.close();
        self.logs.close();
        self.shutdown.cancel();

        let workers = {
            let mut guard = self.workers.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *guard)
        };

        let drain = async {
            for handle in workers {
                let _ = handle.await;
            }
        };

        if tokio::time::timeout(deadline, drain).await.is_err() {
            warn!("shutdown deadline elapsed, aborting in-flight writes");
            self.abort.cancel();
            // Give cancelled workers a moment to observe the abort.
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        info!("pipeline drained");
    }
}
