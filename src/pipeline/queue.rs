//! Bounded hand-off between transport handlers and the worker pool.
//!
//! One queue per signal. Producers wait a bounded time when the queue is
//! full, then drop the record and count it; consumers are the batch
//! workers, several of which drain the same queue.

use std::time::Duration;

use tracing::warn;

use crate::domain::Signal;
use crate::telemetry;

/// A bounded multi-producer multi-consumer queue for one signal.
pub struct SignalQueue<T> {
    signal: Signal,
    handoff_timeout: Duration,
    tx: async_channel::Sender<T>,
    rx: async_channel::Receiver<T>,
}

impl<T: Send + 'static> SignalQueue<T> {
    #[must_use]
    pub fn new(signal: Signal, capacity: usize, handoff_timeout: Duration) -> Self {
        let (tx, rx) = async_channel::bounded(capacity.max(1));
        Self {
            signal,
            handoff_timeout,
            tx,
            rx,
        }
    }

    /// Hand a record to the workers, waiting up to the hand-off timeout when
    /// the queue is full. Returns `false` when the record was dropped.
    pub async fn enqueue(&self, record: T) -> bool {
        // Fast path: space available, no timer needed.
        match self.tx.try_send(record) {
            Ok(()) => return true,
            Err(async_channel::TrySendError::Closed(_)) => {
                telemetry::record_dropped(self.signal);
                return false;
            }
            Err(async_channel::TrySendError::Full(record)) => {
                match tokio::time::timeout(self.handoff_timeout, self.tx.send(record)).await {
                    Ok(Ok(())) => return true,
                    Ok(Err(_)) | Err(_) => {
                        telemetry::record_dropped(self.signal);
                        return false;
                    }
                }
            }
        }
    }

    /// Enqueue a whole decoded envelope. Returns how many records were
    /// dropped; drops never propagate as errors to the transport.
    pub async fn enqueue_all(&self, records: Vec<T>) -> u64 {
        let mut dropped = 0u64;
        for record in records {
            if !self.enqueue(record).await {
                dropped += 1;
            }
        }
        if dropped > 0 {
            warn!(
                signal = self.signal.as_str(),
                dropped, "queue full, dropped records after hand-off timeout"
            );
        }
        dropped
    }

    /// A receiver handle for one worker.
    #[must_use]
    pub fn receiver(&self) -> async_channel::Receiver<T> {
        self.rx.clone()
    }

    /// Close the producer side. Workers drain what is buffered, then their
    /// `recv` fails and they flush and exit.
    pub fn close(&self) {
        self.tx.close();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue(capacity: usize) -> SignalQueue<u32> {
        SignalQueue::new(Signal::Spans, capacity, Duration::from_millis(100))
    }

    #[tokio::test]
    async fn test_enqueue_then_dequeue_exactly_once() {
        let q = queue(8);
        assert!(q.enqueue(7).await);
        let rx = q.receiver();
        assert_eq!(rx.recv().await.unwrap(), 7);
        assert!(rx.is_empty());
    }

    #[tokio::test]
    async fn test_fifo_within_queue() {
        let q = queue(8);
        assert_eq!(q.enqueue_all(vec![1, 2, 3]).await, 0);
        let rx = q.receiver();
        assert_eq!(rx.recv().await.unwrap(), 1);
        assert_eq!(rx.recv().await.unwrap(), 2);
        assert_eq!(rx.recv().await.unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_queue_drops_after_handoff_timeout() {
        let q = queue(1);
        assert!(q.enqueue(1).await);
        // No consumer; the second enqueue must give up after the timeout.
        assert!(!q.enqueue(2).await);
        assert_eq!(q.len(), 1);
    }

    #[tokio::test]
    async fn test_closed_queue_drops_without_error() {
        let q = queue(4);
        q.close();
        assert!(!q.enqueue(1).await);
        assert_eq!(q.enqueue_all(vec![2, 3]).await, 2);
    }
}
