//! AggregatorActor - serialized owner of the aggregation store
//!
//! Every increment, timing and flush is a message on one channel, so the
//! store sees them one at a time in arrival order and no read-modify-write
//! on a key can tear. The actor never performs I/O; snapshots leave
//! through a oneshot reply and are published elsewhere.
//!
//! ```text
//! ┌────────────────┐            ┌──────────────────┐
//! │   producers    │──msg──────▶│ AggregatorActor  │
//! └────────────────┘            │ (owns the store) │
//! ┌────────────────┐──Flush────▶│                  │
//! │ FlushScheduler │◀─Snapshot──└──────────────────┘
//! └────────────────┘
//! ```

use super::store::{unix_timestamp, AggregationStore, Snapshot};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::trace;

/// Messages that can be sent to the AggregatorActor
#[derive(Debug)]
pub enum AggregatorMessage {
    /// Add a sample-rate-corrected delta to a counter
    Increment { key: String, delta: f64 },

    /// Append a duration to a timer
    Timing { key: String, duration: f64 },

    /// Swap the store for an empty one and reply with the old contents
    Flush {
        flush_interval: Duration,
        response: oneshot::Sender<Snapshot>,
    },

    /// Graceful shutdown
    Shutdown { response: oneshot::Sender<()> },
}

/// Ingestion API: a cloneable handle onto the actor's mailbox
#[derive(Clone)]
pub struct AggregatorHandle {
    tx: mpsc::UnboundedSender<AggregatorMessage>,
}

impl AggregatorHandle {
    pub fn new(tx: mpsc::UnboundedSender<AggregatorMessage>) -> Self {
        AggregatorHandle { tx }
    }

    /// Count `delta` events for `key`, observed at `sample_rate`.
    ///
    /// Rates outside `(0, 1]` are dropped without effect.
    #[inline]
    pub fn increment(&self, key: impl Into<String>, delta: f64, sample_rate: f64) {
        let Some(corrected) = corrected_delta(delta, sample_rate) else {
            trace!(sample_rate, "dropping increment with invalid sample rate");
            return;
        };
        let _ = self.tx.send(AggregatorMessage::Increment {
            key: key.into(),
            delta: corrected,
        });
    }

    /// Record one duration for `key`.
    #[inline]
    pub fn timing(&self, key: impl Into<String>, duration: f64) {
        let _ = self.tx.send(AggregatorMessage::Timing {
            key: key.into(),
            duration,
        });
    }

    /// Take the current interval's data and reset the store.
    ///
    /// Returns `None` if the actor has stopped.
    pub async fn flush(&self, flush_interval: Duration) -> Option<Snapshot> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(AggregatorMessage::Flush {
                flush_interval,
                response: tx,
            })
            .ok()?;
        rx.await.ok()
    }

    /// Stop the actor after it has applied everything queued so far
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(AggregatorMessage::Shutdown { response: tx }).is_ok() {
            let _ = rx.await;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Apply sample-rate correction, rejecting rates that would not extrapolate.
fn corrected_delta(delta: f64, sample_rate: f64) -> Option<f64> {
    if !(sample_rate > 0.0 && sample_rate <= 1.0) {
        return None;
    }
    if sample_rate == 1.0 {
        Some(delta)
    } else {
        Some(delta / sample_rate)
    }
}

/// The AggregatorActor owns the AggregationStore exclusively
pub struct AggregatorActor {
    store: AggregationStore,
    rx: mpsc::UnboundedReceiver<AggregatorMessage>,
}

impl AggregatorActor {
    /// Create a new AggregatorActor on the current runtime and return its handle
    pub fn spawn() -> AggregatorHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = AggregatorActor {
            store: AggregationStore::new(),
            rx,
        };

        tokio::spawn(async move {
            actor.run().await;
        });

        AggregatorHandle::new(tx)
    }

    /// Run the actor's message loop
    async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                AggregatorMessage::Increment { key, delta } => {
                    self.store.increment(key, delta);
                }

                AggregatorMessage::Timing { key, duration } => {
                    self.store.timing(key, duration);
                }

                AggregatorMessage::Flush {
                    flush_interval,
                    response,
                } => {
                    let snapshot = self.store.take_snapshot(flush_interval, unix_timestamp());
                    let _ = response.send(snapshot);
                }

                AggregatorMessage::Shutdown { response } => {
                    let _ = response.send(());
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_secs(10);

    #[test]
    fn test_corrected_delta() {
        assert_eq!(corrected_delta(3.0, 1.0), Some(3.0));
        assert_eq!(corrected_delta(1.0, 0.5), Some(2.0));
        assert_eq!(corrected_delta(1.0, 0.0), None);
        assert_eq!(corrected_delta(1.0, 1.5), None);
        assert_eq!(corrected_delta(1.0, -0.1), None);
        assert_eq!(corrected_delta(1.0, f64::NAN), None);
    }

    #[tokio::test]
    async fn test_repeated_increments_with_rate() {
        let handle = AggregatorActor::spawn();

        for _ in 0..8 {
            handle.increment("requests", 3.0, 0.25);
        }

        let snapshot = handle.flush(INTERVAL).await.unwrap();
        let entry = snapshot.counters["requests"];
        assert_eq!(entry.total, 8.0 * 3.0 / 0.25);
        assert_eq!(entry.sample_count, 8);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_invalid_rate_has_no_effect() {
        let handle = AggregatorActor::spawn();

        handle.increment("bad", 1.0, 2.0);
        handle.increment("bad", 1.0, -1.0);
        handle.increment("bad", 1.0, 0.0);

        let snapshot = handle.flush(INTERVAL).await.unwrap();
        assert!(snapshot.is_empty());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_flush_leaves_empty_store() {
        let handle = AggregatorActor::spawn();

        handle.increment("hits", 1.0, 1.0);
        handle.timing("latency", 42.0);

        let first = handle.flush(INTERVAL).await.unwrap();
        assert_eq!(first.counters.len(), 1);
        assert_eq!(first.timers["latency"], vec![42.0]);
        assert_eq!(first.flush_interval, INTERVAL);

        let second = handle.flush(INTERVAL).await.unwrap();
        assert!(second.is_empty());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_concurrent_producers_not_lost() {
        let handle = AggregatorActor::spawn();

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let h = handle.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..250 {
                    h.increment("shared", 1.0, 1.0);
                    h.timing("shared_timer", 1.0);
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let snapshot = handle.flush(INTERVAL).await.unwrap();
        assert_eq!(snapshot.counters["shared"].sample_count, 2000);
        assert_eq!(snapshot.counters["shared"].total, 2000.0);
        assert_eq!(snapshot.timers["shared_timer"].len(), 2000);

        handle.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_flush_during_ingestion_keeps_every_event_once() {
        let handle = AggregatorActor::spawn();

        let producers: Vec<_> = (0..4)
            .map(|_| {
                let h = handle.clone();
                tokio::spawn(async move {
                    for i in 0..500 {
                        h.increment("swapped", 1.0, 1.0);
                        if i % 25 == 0 {
                            tokio::task::yield_now().await;
                        }
                    }
                })
            })
            .collect();

        let mut snapshots = Vec::new();
        while producers.iter().any(|p| !p.is_finished()) {
            snapshots.push(handle.flush(INTERVAL).await.unwrap());
            tokio::task::yield_now().await;
        }
        for producer in producers {
            producer.await.unwrap();
        }
        // Sends that raced the last in-loop flush are still queued
        snapshots.push(handle.flush(INTERVAL).await.unwrap());

        let counted: u64 = snapshots
            .iter()
            .filter_map(|s| s.counters.get("swapped"))
            .map(|entry| entry.sample_count)
            .sum();
        let total: f64 = snapshots
            .iter()
            .filter_map(|s| s.counters.get("swapped"))
            .map(|entry| entry.total)
            .sum();
        assert_eq!(counted, 2000);
        assert_eq!(total, 2000.0);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_flush_after_shutdown() {
        let handle = AggregatorActor::spawn();
        handle.shutdown().await;

        assert!(handle.flush(INTERVAL).await.is_none());
        // Fire-and-forget calls on a stopped actor are ignored
        handle.increment("late", 1.0, 1.0);
        handle.timing("late", 1.0);
    }
}
