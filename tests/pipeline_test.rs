//! Pipeline behavior: size- and time-driven flushes, retry with backoff,
//! give-up accounting, and drain on shutdown.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use sluice::domain::{ServiceIdentity, Signal, Span, SpanKind, SpanStatusCode};
use sluice::error::WriteError;
use sluice::pipeline::worker::{WorkerConfig, spawn_workers};
use sluice::pipeline::{Pipeline, PipelineConfig, PipelineSinks};
use sluice::port::{BoxFuture, RecordSink};

/// Sink that records every flush (size and virtual receive time) and fails
/// with a transient error while `failures_left` is positive.
struct MockSink {
    flush_sizes: Mutex<Vec<usize>>,
    flush_times: Mutex<Vec<tokio::time::Instant>>,
    failures_left: AtomicU32,
    calls: AtomicU32,
}

impl MockSink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            flush_sizes: Mutex::new(Vec::new()),
            flush_times: Mutex::new(Vec::new()),
            failures_left: AtomicU32::new(0),
            calls: AtomicU32::new(0),
        })
    }

    fn failing(times: u32) -> Arc<Self> {
        let sink = Self::new();
        sink.failures_left.store(times, Ordering::SeqCst);
        sink
    }

    fn flush_sizes(&self) -> Vec<usize> {
        self.flush_sizes.lock().unwrap().clone()
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn call_gaps(&self) -> Vec<Duration> {
        let times = self.flush_times.lock().unwrap();
        times.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

impl<T: Send + Sync> RecordSink<T> for MockSink {
    fn table(&self) -> &'static str {
        "otel_traces"
    }

    fn insert_batch<'a>(
        &'a self,
        batch: &'a [T],
        _cancel: CancellationToken,
    ) -> BoxFuture<'a, Result<(), WriteError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.flush_times.lock().unwrap().push(tokio::time::Instant::now());
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(WriteError::Transport {
                    table: "otel_traces",
                    message: "connection reset".to_string(),
                });
            }
            self.flush_sizes.lock().unwrap().push(batch.len());
            Ok(())
        })
    }
}

fn worker_config(batch_size: usize, batch_timeout: Duration) -> WorkerConfig {
    WorkerConfig {
        batch_size,
        batch_timeout,
        retry_max_attempts: 3,
        retry_initial_interval: Duration::from_secs(1),
        retry_max_interval: Duration::from_secs(30),
    }
}

/// Let the worker task run until `cond` holds, without advancing time.
async fn settle(mut cond: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

#[tokio::test(start_paused = true)]
async fn test_batch_size_flush_seven_records() {
    let (tx, rx) = async_channel::bounded::<u32>(1024);
    let sink = MockSink::new();
    let shutdown = CancellationToken::new();
    let handles = spawn_workers(
        Signal::Spans,
        1,
        &rx,
        sink.clone(),
        worker_config(3, Duration::from_secs(10)),
        shutdown.clone(),
        CancellationToken::new(),
    );

    for i in 0..7 {
        tx.send(i).await.unwrap();
    }
    settle(|| sink.flush_sizes().len() >= 2).await;
    assert_eq!(sink.flush_sizes(), vec![3, 3]);

    // Closing the producer side drains the remainder.
    tx.close();
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(sink.flush_sizes(), vec![3, 3, 1]);
}

#[tokio::test(start_paused = true)]
async fn test_batch_timeout_flush() {
    let (tx, rx) = async_channel::bounded::<u32>(1024);
    let sink = MockSink::new();
    let shutdown = CancellationToken::new();
    let _handles = spawn_workers(
        Signal::Spans,
        1,
        &rx,
        sink.clone(),
        worker_config(1_000, Duration::from_millis(500)),
        shutdown.clone(),
        CancellationToken::new(),
    );

    tx.send(1).await.unwrap();
    tx.send(2).await.unwrap();

    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(sink.flush_sizes(), vec![2]);
}

#[tokio::test(start_paused = true)]
async fn test_no_flush_before_timeout_when_batch_is_small() {
    let (tx, rx) = async_channel::bounded::<u32>(1024);
    let sink = MockSink::new();
    let _handles = spawn_workers(
        Signal::Spans,
        1,
        &rx,
        sink.clone(),
        worker_config(1_000, Duration::from_secs(10)),
        CancellationToken::new(),
        CancellationToken::new(),
    );

    tx.send(1).await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(sink.flush_sizes().is_empty());
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(sink.flush_sizes(), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn test_retry_backoff_then_give_up() {
    let (tx, rx) = async_channel::bounded::<u32>(1024);
    // More consecutive failures than the retry budget allows.
    let sink = MockSink::failing(5);
    let _handles = spawn_workers(
        Signal::Spans,
        1,
        &rx,
        sink.clone(),
        worker_config(1, Duration::from_secs(300)),
        CancellationToken::new(),
        CancellationToken::new(),
    );

    tx.send(1).await.unwrap();
    // First try plus three retries spaced 1s, 2s, 4s all fit in 8s.
    tokio::time::sleep(Duration::from_secs(8)).await;

    assert_eq!(sink.calls(), 4);
    let gaps = sink.call_gaps();
    assert_eq!(gaps.len(), 3);
    assert_eq!(gaps[0], Duration::from_secs(1));
    assert_eq!(gaps[1], Duration::from_secs(2));
    assert_eq!(gaps[2], Duration::from_secs(4));
    // The batch was dropped; no successful flush recorded.
    assert!(sink.flush_sizes().is_empty());

    // The worker resumed: the fifth failure is spent on the next record's
    // first attempt, which then succeeds on retry.
    tx.send(2).await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(sink.flush_sizes(), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_flushes_accumulator() {
    let (tx, rx) = async_channel::bounded::<u32>(1024);
    let sink = MockSink::new();
    let shutdown = CancellationToken::new();
    let handles = spawn_workers(
        Signal::Spans,
        1,
        &rx,
        sink.clone(),
        worker_config(1_000, Duration::from_secs(300)),
        shutdown.clone(),
        CancellationToken::new(),
    );

    tx.send(1).await.unwrap();
    tx.send(2).await.unwrap();
    settle(|| rx.is_empty()).await;

    shutdown.cancel();
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(sink.flush_sizes(), vec![2]);
}

fn make_span(i: u64) -> Span {
    Span {
        timestamp: i,
        trace_id: format!("{i:032x}"),
        span_id: format!("{i:016x}"),
        parent_span_id: String::new(),
        span_name: format!("op-{i}"),
        span_kind: SpanKind::Internal,
        start_time: i,
        end_time: i + 1,
        duration_ns: 1,
        status_code: SpanStatusCode::Unset,
        status_message: String::new(),
        service: ServiceIdentity::default(),
        attributes: std::collections::HashMap::new(),
        resource_attributes: std::collections::HashMap::new(),
        events: vec![],
        links: vec![],
        scope_name: String::new(),
        scope_version: String::new(),
    }
}

/// Sink counting records per table, shared across the three signals.
struct CountingSink {
    table: &'static str,
    records: Arc<AtomicUsize>,
}

impl<T: Send + Sync> RecordSink<T> for CountingSink {
    fn table(&self) -> &'static str {
        self.table
    }

    fn insert_batch<'a>(
        &'a self,
        batch: &'a [T],
        _cancel: CancellationToken,
    ) -> BoxFuture<'a, Result<(), WriteError>> {
        Box::pin(async move {
            self.records.fetch_add(batch.len(), Ordering::SeqCst);
            Ok(())
        })
    }
}

#[tokio::test]
async fn test_pipeline_end_to_end_drain_on_shutdown() {
    let span_records = Arc::new(AtomicUsize::new(0));
    let metric_records = Arc::new(AtomicUsize::new(0));
    let log_records = Arc::new(AtomicUsize::new(0));

    let config = PipelineConfig {
        queue_size: 1024,
        enqueue_timeout: Duration::from_millis(100),
        worker_count: 2,
        worker: WorkerConfig {
            batch_size: 10,
            batch_timeout: Duration::from_secs(60),
            ..WorkerConfig::default()
        },
    };
    let pipeline = Pipeline::start(
        &config,
        PipelineSinks {
            spans: Arc::new(CountingSink {
                table: "otel_traces",
                records: span_records.clone(),
            }),
            metrics: Arc::new(CountingSink {
                table: "otel_metrics",
                records: metric_records.clone(),
            }),
            logs: Arc::new(CountingSink {
                table: "otel_logs",
                records: log_records.clone(),
            }),
        },
    );

    pipeline
        .ingest_spans((0..25).map(make_span).collect())
        .await;

    // Nothing reached batch_size yet for the tail; shutdown must drain it.
    pipeline.shutdown(Duration::from_secs(5)).await;
    assert_eq!(span_records.load(Ordering::SeqCst), 25);
    assert_eq!(metric_records.load(Ordering::SeqCst), 0);
    assert_eq!(log_records.load(Ordering::SeqCst), 0);
}
