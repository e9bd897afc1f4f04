//! Logging setup
//!
//! Installs a `tracing-subscriber` fmt subscriber. `RUST_LOG` wins over the
//! configured level when it is set.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Output format for log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable single line
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// Logging options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingOptions {
    /// Default filter directive, e.g. `info` or `request_governor=debug`
    #[serde(default = "default_level")]
    pub level: String,
    /// Line format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

impl LoggingOptions {
    /// Build the env filter, preferring `RUST_LOG`
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }
}

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init_logging(options: &LoggingOptions) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(options.env_filter())
        .with_target(false)
        .with_thread_ids(false);

    match options.format {
        LogFormat::Pretty => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    }
}
