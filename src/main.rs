//! statsd aggregation daemon
//!
//! Usage: `statsd-agg [config.toml]`. The config path may also be given in
//! `STATSD_AGG_CONFIG`; environment overrides apply on top of the file.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use statsd_agg::observability::{init_tracing, LogConfig};
use statsd_agg::report::publish;
use statsd_agg::{AggregatorActor, AggregatorConfig, FlushScheduler, StatsdListener};
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(&LogConfig::from_env()).map_err(|e| e.to_string())?;

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("STATSD_AGG_CONFIG").ok())
        .map(PathBuf::from);
    let config = AggregatorConfig::load(config_path.as_deref())?;

    let reporter = config.reporter();
    let formatter = config.key_formatter();
    info!(
        flush_interval_ms = config.flush_interval_ms,
        destination = %reporter.destination(),
        listen_addr = config.listen_addr.as_deref().unwrap_or("none"),
        "starting statsd aggregator"
    );
    if config.graphite_addr().is_none() {
        warn!("no graphite destination configured, reports will be discarded");
    }

    let aggregator = AggregatorActor::spawn();

    if let Some(addr) = &config.listen_addr {
        let listener = StatsdListener::bind(addr, aggregator.clone()).await?;
        tokio::spawn(listener.run());
    }

    let scheduler = FlushScheduler::new(
        aggregator.clone(),
        reporter.clone(),
        formatter.clone(),
        config.flush_interval(),
    )
    .spawn();

    signal::ctrl_c().await?;
    info!("Shutdown signal received");

    // Stop ticking, then publish whatever the last partial interval holds.
    // Rates divide by the interval, so it must stay non-zero.
    let partial = scheduler.shutdown().await.max(Duration::from_millis(1));
    if let Some(snapshot) = aggregator.flush(partial).await {
        let outcome = publish(snapshot, &formatter, reporter.as_ref()).await;
        info!(?outcome, "final flush");
    }
    aggregator.shutdown().await;

    info!("statsd aggregator stopped");
    Ok(())
}
