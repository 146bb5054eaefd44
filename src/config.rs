//! Daemon configuration
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `STATSD_FLUSH_INTERVAL_MS` | `flush_interval_ms` |
//! | `STATSD_GRAPHITE_HOST` | `graphite_host` |
//! | `STATSD_GRAPHITE_PORT` | `graphite_port` |
//! | `STATSD_LISTEN_ADDR` | `listen_addr` |
//! | `STATSD_PREFIX` | `prefix` |
//! | `STATSD_APP` | `app` |
//! | `STATSD_TEAM` | `team` |
//! | `STATSD_APPEND_NODE` | `append_node` |
//! | `STATSD_NODE_NAME` | `node_name` |

use crate::report::{GraphiteReporter, KeyFormatter, NoopReporter, SharedReporter};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Error type for configuration loading
#[derive(Debug)]
pub enum ConfigError {
    /// Config file could not be read
    Io(std::io::Error),
    /// Config file or environment value is malformed
    Parse(String),
    /// Values parsed but are not usable
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "failed to read config: {}", e),
            ConfigError::Parse(msg) => write!(f, "failed to parse config: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e.to_string())
    }
}

/// Aggregation daemon configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Flush interval in milliseconds
    pub flush_interval_ms: u64,
    /// Graphite host; reporting is disabled when unset
    pub graphite_host: Option<String>,
    pub graphite_port: u16,
    /// UDP address for statsd line ingestion; no listener when unset
    pub listen_addr: Option<String>,

    // Key decoration, applied at report time
    pub prefix: Option<String>,
    pub app: Option<String>,
    pub team: Option<String>,
    /// Append the node identity to every key
    pub append_node: bool,
    /// Node identity as `name@host`; derived from `HOSTNAME` when unset
    pub node_name: Option<String>,

    pub connect_timeout_ms: u64,
    pub write_timeout_ms: u64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        AggregatorConfig {
            flush_interval_ms: 10_000,
            graphite_host: None,
            graphite_port: 2003,
            listen_addr: None,
            prefix: None,
            app: None,
            team: None,
            append_node: false,
            node_name: None,
            connect_timeout_ms: 5_000,
            write_timeout_ms: 5_000,
        }
    }
}

impl AggregatorConfig {
    /// Parse a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: AggregatorConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Load from an optional file, then apply process environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        let config = base.with_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `STATSD_*` overrides read through `lookup`
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(v) = lookup("STATSD_FLUSH_INTERVAL_MS") {
            self.flush_interval_ms = parse_env("STATSD_FLUSH_INTERVAL_MS", &v)?;
        }
        if let Some(v) = lookup("STATSD_GRAPHITE_HOST") {
            self.graphite_host = non_empty(v);
        }
        if let Some(v) = lookup("STATSD_GRAPHITE_PORT") {
            self.graphite_port = parse_env("STATSD_GRAPHITE_PORT", &v)?;
        }
        if let Some(v) = lookup("STATSD_LISTEN_ADDR") {
            self.listen_addr = non_empty(v);
        }
        if let Some(v) = lookup("STATSD_PREFIX") {
            self.prefix = non_empty(v);
        }
        if let Some(v) = lookup("STATSD_APP") {
            self.app = non_empty(v);
        }
        if let Some(v) = lookup("STATSD_TEAM") {
            self.team = non_empty(v);
        }
        if let Some(v) = lookup("STATSD_APPEND_NODE") {
            self.append_node = parse_env("STATSD_APPEND_NODE", &v)?;
        }
        if let Some(v) = lookup("STATSD_NODE_NAME") {
            self.node_name = non_empty(v);
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.flush_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "flush_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.graphite_host.is_some() && self.graphite_port == 0 {
            return Err(ConfigError::Invalid(
                "graphite_port must be set when graphite_host is".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the collector destination
    pub fn with_graphite(mut self, host: impl Into<String>, port: u16) -> Self {
        self.graphite_host = Some(host.into());
        self.graphite_port = port;
        self
    }

    /// Set the flush interval
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Get flush interval as Duration
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// `host:port` of the collector, if reporting is enabled
    pub fn graphite_addr(&self) -> Option<String> {
        self.graphite_host
            .as_ref()
            .map(|host| format!("{}:{}", host, self.graphite_port))
    }

    /// Node identity used when `append_node` is set
    pub fn node_identity(&self) -> String {
        self.node_name.clone().unwrap_or_else(|| {
            let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
            format!("statsd@{}", host)
        })
    }

    /// Key formatter carrying the configured prefix, app, team and node
    pub fn key_formatter(&self) -> KeyFormatter {
        let mut formatter = KeyFormatter::new();
        if let Some(prefix) = &self.prefix {
            formatter = formatter.with_prefix(prefix);
        }
        if let Some(app) = &self.app {
            formatter = formatter.with_app(app);
        }
        if let Some(team) = &self.team {
            formatter = formatter.with_team(team);
        }
        if self.append_node {
            formatter = formatter.with_node(&self.node_identity());
        }
        formatter
    }

    /// Reporter for the configured destination, or a no-op without one
    pub fn reporter(&self) -> SharedReporter {
        match self.graphite_addr() {
            Some(addr) => Arc::new(GraphiteReporter::new(addr).with_timeouts(
                Duration::from_millis(self.connect_timeout_ms),
                Duration::from_millis(self.write_timeout_ms),
            )),
            None => Arc::new(NoopReporter),
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Parse(format!("{}={:?}", name, value)))
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
