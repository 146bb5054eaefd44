//! Observability Module
//!
//! Structured logging for the daemon:
//! - `tracing-subscriber` setup with `RUST_LOG` filtering
//! - Optional JSON output for log shippers
//! - Span helpers for the flush and report lifecycle
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RUST_LOG` | `info` | Log filter directives |
//! | `STATSD_LOG_JSON` | `false` | Emit JSON lines instead of text |

pub mod spans;
pub mod tracing_setup;

pub use tracing_setup::{init as init_tracing, LogConfig};
