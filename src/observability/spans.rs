//! Span Helpers
//!
//! Spans for the flush cycle so report logs can be tied back to the tick
//! that produced them.

use tracing::{span, Level, Span};

/// Span for one flush tick
#[inline]
pub fn flush_span(interval_ms: u64) -> Span {
    span!(Level::DEBUG, "statsd.flush", flush.interval_ms = interval_ms)
}

/// Span for delivering one report
#[inline]
pub fn report_span(destination: &str, num_stats: usize) -> Span {
    span!(
        Level::DEBUG,
        "statsd.report",
        report.destination = %destination,
        report.num_stats = num_stats
    )
}

/// Span for a UDP listener
#[inline]
pub fn listener_span(addr: &str) -> Span {
    span!(Level::INFO, "statsd.listener", net.addr = %addr)
}
