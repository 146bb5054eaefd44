use super::builder::build_report;
use super::key::KeyFormatter;
use super::reporter::Reporter;
use crate::aggregator::Snapshot;
use crate::observability::spans::report_span;
use tracing::{debug, warn, Instrument};

/// What happened to one snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Nothing was aggregated, nothing sent
    Empty,
    Sent { num_stats: usize },
    /// Delivery failed; the data is gone
    Dropped,
}

/// Render a snapshot and hand it to the reporter.
///
/// Delivery failures are logged and swallowed, there is no retry.
pub async fn publish(
    snapshot: Snapshot,
    formatter: &KeyFormatter,
    reporter: &dyn Reporter,
) -> PublishOutcome {
    let Some(report) = build_report(&snapshot, formatter) else {
        debug!("nothing to report for this interval");
        return PublishOutcome::Empty;
    };

    let span = report_span(&reporter.destination(), report.num_stats);
    async {
        match reporter.send(&report.payload).await {
            Ok(()) => {
                debug!(num_stats = report.num_stats, "report sent");
                PublishOutcome::Sent {
                    num_stats: report.num_stats,
                }
            }
            Err(e) => {
                warn!(
                    destination = %reporter.destination(),
                    num_stats = report.num_stats,
                    "dropping report: {}",
                    e
                );
                PublishOutcome::Dropped
            }
        }
    }
    .instrument(span)
    .await
}
