use criterion::{black_box, criterion_group, criterion_main, Criterion};
use statsd_agg::aggregator::{AggregationStore, TimerStats};
use statsd_agg::report::{build_report, KeyFormatter};
use std::time::Duration;

fn bench_timer_stats(c: &mut Criterion) {
    let durations: Vec<f64> = (0..10_000).map(|i| ((i * 7919) % 10_007) as f64).collect();

    c.bench_function("timer_stats_10k", |b| {
        b.iter(|| TimerStats::compute(black_box(&durations)))
    });
}

fn bench_build_report(c: &mut Criterion) {
    let mut store = AggregationStore::new();
    for i in 0..1_000 {
        store.increment(format!("service.requests.{}", i), 1.0);
        for v in 0..20 {
            store.timing(format!("service.latency.{}", i), v as f64);
        }
    }
    let snapshot = store.take_snapshot(Duration::from_secs(10), 1_700_000_000);
    let formatter = KeyFormatter::new().with_prefix("bench").with_node("statsd@host");

    c.bench_function("build_report_1k_keys", |b| {
        b.iter(|| build_report(black_box(&snapshot), &formatter))
    });
}

criterion_group!(benches, bench_timer_stats, bench_build_report);
criterion_main!(benches);
