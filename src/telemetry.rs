//! Process-wide self-metrics.
//!
//! A single registry holds every counter the pipeline touches. `init()` is
//! the one registration step and is safe to call repeatedly; the accessors
//! below are lock-free increments on the hot path and no-ops before `init()`.

use once_cell::sync::{Lazy, OnceCell};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::domain::Signal;

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);
static COUNTERS: OnceCell<Counters> = OnceCell::new();

struct Counters {
    records_received: IntCounterVec,
    records_invalid: IntCounterVec,
    records_dropped: IntCounterVec,
    storage_writes: IntCounterVec,
    storage_retries: IntCounterVec,
    flush_duration: HistogramVec,
    query_errors: IntCounterVec,
}

impl Counters {
    fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let records_received = IntCounterVec::new(
            Opts::new(
                "ingest_records_received_total",
                "Records decoded from OTLP envelopes, per signal",
            ),
            &["signal"],
        )?;
        registry.register(Box::new(records_received.clone()))?;

        let records_invalid = IntCounterVec::new(
            Opts::new(
                "ingest_records_invalid_total",
                "Malformed records skipped by the decoder, per signal",
            ),
            &["signal"],
        )?;
        registry.register(Box::new(records_invalid.clone()))?;

        let records_dropped = IntCounterVec::new(
            Opts::new(
                "ingest_records_dropped_total",
                "Records dropped after the bounded queue hand-off timed out",
            ),
            &["signal"],
        )?;
        registry.register(Box::new(records_dropped.clone()))?;

        let storage_writes = IntCounterVec::new(
            Opts::new(
                "storage_writes_total",
                "Batch writes to the columnar store, per table and outcome",
            ),
            &["table", "status"],
        )?;
        registry.register(Box::new(storage_writes.clone()))?;

        let storage_retries = IntCounterVec::new(
            Opts::new(
                "storage_retries_total",
                "Write retry attempts after transient store failures",
            ),
            &["table"],
        )?;
        registry.register(Box::new(storage_retries.clone()))?;

        let flush_duration = HistogramVec::new(
            HistogramOpts::new(
                "storage_flush_duration_seconds",
                "Wall time of successful batch flushes",
            ),
            &["table"],
        )?;
        registry.register(Box::new(flush_duration.clone()))?;

        let query_errors = IntCounterVec::new(
            Opts::new(
                "query_errors_total",
                "Query handler failures surfaced as HTTP 500",
            ),
            &["endpoint"],
        )?;
        registry.register(Box::new(query_errors.clone()))?;

        Ok(Self {
            records_received,
            records_invalid,
            records_dropped,
            storage_writes,
            storage_retries,
            flush_duration,
            query_errors,
        })
    }
}

/// Register every counter with the process registry. Idempotent and safe
/// under concurrent callers.
pub fn init() -> Result<(), prometheus::Error> {
    COUNTERS.get_or_try_init(|| Counters::register(&REGISTRY))?;
    Ok(())
}

pub fn records_received(signal: Signal, n: u64) {
    if let Some(c) = COUNTERS.get() {
        c.records_received
            .with_label_values(&[signal.as_str()])
            .inc_by(n);
    }
}

pub fn records_invalid(signal: Signal, n: u64) {
    if let Some(c) = COUNTERS.get() {
        c.records_invalid
            .with_label_values(&[signal.as_str()])
            .inc_by(n);
    }
}

pub fn record_dropped(signal: Signal) {
    if let Some(c) = COUNTERS.get() {
        c.records_dropped
            .with_label_values(&[signal.as_str()])
            .inc();
    }
}

pub fn storage_write_ok(table: &str) {
    if let Some(c) = COUNTERS.get() {
        c.storage_writes.with_label_values(&[table, "ok"]).inc();
    }
}

pub fn storage_write_error(table: &str) {
    if let Some(c) = COUNTERS.get() {
        c.storage_writes.with_label_values(&[table, "error"]).inc();
    }
}

pub fn storage_retry(table: &str) {
    if let Some(c) = COUNTERS.get() {
        c.storage_retries.with_label_values(&[table]).inc();
    }
}

pub fn flush_duration(table: &str, seconds: f64) {
    if let Some(c) = COUNTERS.get() {
        c.flush_duration
            .with_label_values(&[table])
            .observe(seconds);
    }
}

pub fn query_error(endpoint: &str) {
    if let Some(c) = COUNTERS.get() {
        c.query_errors.with_label_values(&[endpoint]).inc();
    }
}

/// Render the registry in Prometheus text exposition format.
#[must_use]
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    if encoder.encode(&REGISTRY.gather(), &mut buf).is_err() {
        return String::new();
    }
    String::from_utf8(buf).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init().unwrap();
        init().unwrap();
    }

    #[test]
    fn test_counters_show_up_in_exposition() {
        init().unwrap();
        records_received(Signal::Spans, 3);
        record_dropped(Signal::Logs);
        storage_write_error("otel_traces");
        let text = gather();
        assert!(text.contains("ingest_records_received_total"));
        assert!(text.contains("storage_writes_total"));
    }
}
