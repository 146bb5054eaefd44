//! Report building and delivery
//!
//! Turns an aggregation snapshot into graphite plaintext and ships it to
//! the collector on a best-effort basis.

mod builder;
mod key;
mod publish;
mod reporter;

pub use builder::{build_report, Report, LINES_PER_TIMER};
pub use key::{sanitize_key, KeyFormatter};
pub use publish::{publish, PublishOutcome};
pub use reporter::{
    noop_reporter, recording_reporter, GraphiteReporter, NoopReporter, RecordingReporter,
    ReportError, ReportFuture, Reporter, SharedReporter,
};
