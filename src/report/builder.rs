//! Report Builder
//!
//! Renders a snapshot as graphite plaintext, one `path value timestamp`
//! line per stat. Keys are emitted in sorted order so identical snapshots
//! produce identical payloads.

use super::key::KeyFormatter;
use crate::aggregator::{Snapshot, TimerStats, PERCENTILE_THRESHOLD};
use std::fmt::Write;

/// Lines emitted per timer key
pub const LINES_PER_TIMER: usize = 5;

/// A rendered report ready for the transport
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub payload: String,
    /// Value of the trailing `statsd.numStats` line
    pub num_stats: usize,
}

/// Build the wire payload for a snapshot.
///
/// Returns `None` for an empty snapshot: nothing is sent in that case.
pub fn build_report(snapshot: &Snapshot, formatter: &KeyFormatter) -> Option<Report> {
    if snapshot.is_empty() {
        return None;
    }

    let ts = snapshot.timestamp;
    let interval_secs = snapshot.flush_interval.as_millis() as f64 / 1000.0;
    let mut payload = String::new();
    let mut num_stats = 0;

    let mut counter_keys: Vec<&String> = snapshot.counters.keys().collect();
    counter_keys.sort();
    for key in counter_keys {
        let entry = &snapshot.counters[key];
        let path = formatter.format(key);
        let rate = entry.total / interval_secs;

        let _ = writeln!(payload, "stats.{} {} {}", path, rate, ts);
        let _ = writeln!(payload, "stats_counts.{} {} {}", path, entry.sample_count, ts);
        num_stats += 1;
    }

    let mut timer_keys: Vec<&String> = snapshot.timers.keys().collect();
    timer_keys.sort();
    for key in timer_keys {
        let Some(stats) = TimerStats::compute(&snapshot.timers[key]) else {
            continue;
        };
        let path = formatter.format(key);

        let _ = writeln!(payload, "stats.timers.{}.mean {} {}", path, stats.mean, ts);
        let _ = writeln!(payload, "stats.timers.{}.upper {} {}", path, stats.max, ts);
        let _ = writeln!(
            payload,
            "stats.timers.{}.upper_{} {} {}",
            path, PERCENTILE_THRESHOLD, stats.upper_threshold, ts
        );
        let _ = writeln!(payload, "stats.timers.{}.lower {} {}", path, stats.min, ts);
        let _ = writeln!(payload, "stats.timers.{}.count {} {}", path, stats.count, ts);
        // Timers count once per emitted line, counters once per key
        num_stats += LINES_PER_TIMER;
    }

    let _ = writeln!(payload, "statsd.numStats {} {}", num_stats, ts);

    Some(Report { payload, num_stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::AggregationStore;
    use std::time::Duration;

    const TS: u64 = 1_700_000_000;

    fn snapshot_of(store: &mut AggregationStore) -> Snapshot {
        store.take_snapshot(Duration::from_millis(10_000), TS)
    }

    #[test]
    fn test_empty_snapshot_no_report() {
        let mut store = AggregationStore::new();
        assert!(build_report(&snapshot_of(&mut store), &KeyFormatter::new()).is_none());
    }

    #[test]
    fn test_counter_lines() {
        let mut store = AggregationStore::new();
        store.increment("hits".to_string(), 1.0);
        store.increment("hits".to_string(), 1.0);

        let report = build_report(&snapshot_of(&mut store), &KeyFormatter::new()).unwrap();

        assert_eq!(
            report.payload,
            "stats.hits 0.2 1700000000\n\
             stats_counts.hits 2 1700000000\n\
             statsd.numStats 1 1700000000\n"
        );
        assert_eq!(report.num_stats, 1);
    }

    #[test]
    fn test_timer_lines() {
        let mut store = AggregationStore::new();
        for v in 1..=10 {
            store.timing("db query".to_string(), v as f64);
        }

        let report = build_report(&snapshot_of(&mut store), &KeyFormatter::new()).unwrap();

        assert_eq!(
            report.payload,
            "stats.timers.db_query.mean 5 1700000000\n\
             stats.timers.db_query.upper 10 1700000000\n\
             stats.timers.db_query.upper_90 9 1700000000\n\
             stats.timers.db_query.lower 1 1700000000\n\
             stats.timers.db_query.count 10 1700000000\n\
             statsd.numStats 5 1700000000\n"
        );
    }

    #[test]
    fn test_num_stats_counts_timer_lines() {
        let mut store = AggregationStore::new();
        store.increment("a".to_string(), 1.0);
        store.increment("b".to_string(), 1.0);
        store.timing("t".to_string(), 5.0);

        let report = build_report(&snapshot_of(&mut store), &KeyFormatter::new()).unwrap();

        assert_eq!(report.num_stats, 7);
        assert!(report.payload.ends_with("statsd.numStats 7 1700000000\n"));
        assert_eq!(report.payload.lines().count(), 2 * 2 + 5 + 1);
    }

    #[test]
    fn test_rate_uses_interval() {
        let mut store = AggregationStore::new();
        store.increment("bytes".to_string(), 500.0);
        let snapshot = store.take_snapshot(Duration::from_millis(2_500), TS);

        let report = build_report(&snapshot, &KeyFormatter::new()).unwrap();
        assert!(report.payload.starts_with("stats.bytes 200 1700000000\n"));
    }

    #[test]
    fn test_formatter_applied() {
        let mut store = AggregationStore::new();
        store.increment("page/view".to_string(), 10.0);

        let formatter = KeyFormatter::new().with_prefix("web");
        let report = build_report(&snapshot_of(&mut store), &formatter).unwrap();

        assert!(report.payload.contains("stats.web.page-view 1 1700000000\n"));
        assert!(report.payload.contains("stats_counts.web.page-view 1 1700000000\n"));
    }

    #[test]
    fn test_keys_sorted() {
        let mut store = AggregationStore::new();
        store.increment("zeta".to_string(), 1.0);
        store.increment("alpha".to_string(), 1.0);

        let report = build_report(&snapshot_of(&mut store), &KeyFormatter::new()).unwrap();
        let first = report.payload.lines().next().unwrap();
        assert!(first.starts_with("stats.alpha "));
    }
}
