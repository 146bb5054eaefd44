//! Aggregation Store
//!
//! Plain owned state for the current flush interval. It is not shared:
//! the aggregator actor owns the only instance and applies every mutation
//! in arrival order. A flush moves the containers out into a [`Snapshot`]
//! and leaves fresh empty ones behind, so the two are never aliased.

use ahash::AHashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Accumulated counter state for one key
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterEntry {
    /// Sample-rate-corrected sum of deltas
    pub total: f64,
    /// Raw number of increment events received
    pub sample_count: u64,
}

/// Live per-interval aggregation state
#[derive(Debug, Default)]
pub struct AggregationStore {
    counters: AHashMap<String, CounterEntry>,
    timers: AHashMap<String, Vec<f64>>,
}

impl AggregationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an already-corrected delta to a counter.
    pub fn increment(&mut self, key: String, corrected_delta: f64) {
        self.counters
            .entry(key)
            .and_modify(|entry| {
                entry.total += corrected_delta;
                entry.sample_count += 1;
            })
            .or_insert(CounterEntry {
                total: corrected_delta,
                sample_count: 1,
            });
    }

    /// Append a duration to a timer.
    pub fn timing(&mut self, key: String, duration: f64) {
        self.timers.entry(key).or_default().push(duration);
    }

    pub fn counter(&self, key: &str) -> Option<&CounterEntry> {
        self.counters.get(key)
    }

    pub fn timer(&self, key: &str) -> Option<&[f64]> {
        self.timers.get(key).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty() && self.timers.is_empty()
    }

    /// Move everything into a snapshot and reset to empty containers.
    pub fn take_snapshot(&mut self, flush_interval: Duration, timestamp: u64) -> Snapshot {
        Snapshot {
            counters: std::mem::take(&mut self.counters),
            timers: std::mem::take(&mut self.timers),
            flush_interval,
            timestamp,
        }
    }
}

/// Immutable capture of one interval, owned by the reporting pipeline
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub counters: AHashMap<String, CounterEntry>,
    pub timers: AHashMap<String, Vec<f64>>,
    /// Interval length used to turn totals into per-second rates
    pub flush_interval: Duration,
    /// Unix seconds stamped on every line of the report
    pub timestamp: u64,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty() && self.timers.is_empty()
    }
}

/// Current wall-clock time in unix seconds
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
