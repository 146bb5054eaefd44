mod actor;
mod stats;
mod store;

pub use actor::{AggregatorActor, AggregatorHandle, AggregatorMessage};
pub use stats::{TimerStats, PERCENTILE_THRESHOLD};
pub use store::{unix_timestamp, AggregationStore, CounterEntry, Snapshot};
