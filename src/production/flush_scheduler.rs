use crate::aggregator::AggregatorHandle;
use crate::observability::spans::flush_span;
use crate::report::{publish, KeyFormatter, PublishOutcome, SharedReporter};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn, Instrument};

/// Periodically swaps out the aggregation store and publishes the result.
///
/// Each tick spawns its own publish task and does not wait for it. A slow
/// collector can therefore leave several publish tasks running at once;
/// they are independent and may overlap.
pub struct FlushScheduler {
    aggregator: AggregatorHandle,
    reporter: SharedReporter,
    formatter: Arc<KeyFormatter>,
    interval: Duration,
}

/// Handle for stopping a running scheduler
pub struct FlushSchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<Instant>,
}

impl FlushSchedulerHandle {
    /// Stop ticking and wait for the loop to exit.
    ///
    /// Returns the time since the last swap (or since start), which is the
    /// length of the partial interval still held by the aggregator. Publish
    /// tasks already spawned are left to finish on their own.
    pub async fn shutdown(self) -> Duration {
        let _ = self.shutdown_tx.send(true);
        match self.task.await {
            Ok(last_swap) => last_swap.elapsed(),
            Err(_) => Duration::ZERO,
        }
    }
}

impl FlushScheduler {
    pub fn new(
        aggregator: AggregatorHandle,
        reporter: SharedReporter,
        formatter: KeyFormatter,
        interval: Duration,
    ) -> Self {
        FlushScheduler {
            aggregator,
            reporter,
            formatter: Arc::new(formatter),
            interval,
        }
    }

    /// Start the tick loop on the current runtime
    pub fn spawn(self) -> FlushSchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        FlushSchedulerHandle { shutdown_tx, task }
    }

    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) -> Instant {
        let mut last_swap = Instant::now();
        // First flush one full interval after start
        let mut tick = interval_at(last_swap + self.interval, self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_ms = self.interval.as_millis() as u64, "flush scheduler started");

        loop {
            tokio::select! {
                at = tick.tick() => {
                    last_swap = at;
                    if self.flush_once().await.is_none() {
                        warn!("aggregator stopped, flush scheduler exiting");
                        break;
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        info!("flush scheduler stopped");
        last_swap
    }

    /// Snapshot the store now and publish it in a background task.
    ///
    /// Returns the publish task, or `None` if the aggregator has stopped.
    /// Dropping the returned handle does not cancel the task.
    pub async fn flush_once(&self) -> Option<JoinHandle<PublishOutcome>> {
        let span = flush_span(self.interval.as_millis() as u64);
        let snapshot = self
            .aggregator
            .flush(self.interval)
            .instrument(span.clone())
            .await?;

        debug!(
            parent: &span,
            counters = snapshot.counters.len(),
            timers = snapshot.timers.len(),
            "store flushed"
        );

        let reporter = Arc::clone(&self.reporter);
        let formatter = Arc::clone(&self.formatter);
        Some(tokio::spawn(
            async move { publish(snapshot, &formatter, reporter.as_ref()).await }.instrument(span),
        ))
    }
}
