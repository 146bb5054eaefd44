//! Tracing Setup
//!
//! Initializes tracing-subscriber with environment-based filtering.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Log output settings
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
    /// Filter used when `RUST_LOG` is unset
    pub default_filter: Option<String>,
}

impl LogConfig {
    pub fn from_env() -> Self {
        let json = std::env::var("STATSD_LOG_JSON")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        LogConfig {
            json,
            default_filter: None,
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(self.default_filter.as_deref().unwrap_or("info"))
        })
    }
}

/// Install the global subscriber.
///
/// Fails if a subscriber is already installed.
pub fn init(config: &LogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let registry = tracing_subscriber::registry().with(config.filter());

    if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()?;
    }

    tracing::info!(json = config.json, "logging initialized");

    Ok(())
}
