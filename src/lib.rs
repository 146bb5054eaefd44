pub mod aggregator;
pub mod config;
pub mod observability;
pub mod production;
pub mod report;

pub use aggregator::{AggregatorActor, AggregatorHandle, Snapshot, TimerStats};
pub use config::{AggregatorConfig, ConfigError};
pub use production::{FlushScheduler, FlushSchedulerHandle, StatsdListener};
pub use report::{build_report, publish, sanitize_key, KeyFormatter, PublishOutcome, Reporter};
