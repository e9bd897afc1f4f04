//! Configuration management for the governor
//!
//! This module handles loading, validation, and merging of all governor configuration.
//! Sources are a YAML file, `GOVERNOR_*` environment variables, or code.

pub mod models;
pub mod validation;

pub use models::*;
pub use validation::Validate;

use crate::utils::error::{GovernorError, Result};
use crate::utils::logging::{LogFormat, LoggingOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Prefix shared by every environment override
pub const ENV_PREFIX: &str = "GOVERNOR_";

/// Main configuration struct for the governor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GovernorConfig {
    /// Admission control and queuing
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Retry timing
    #[serde(default)]
    pub backoff: BackoffConfig,
    /// Retry classification
    #[serde(default)]
    pub retry: RetryConfig,
    /// Resource budgets and monitoring
    #[serde(default)]
    pub resources: ResourceLimitsConfig,
    /// Log filter and format
    #[serde(default)]
    pub logging: LoggingOptions,
}

impl GovernorConfig {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GovernorError::Config(format!("Failed to read config file: {}", e)))?;

        let config = Self::from_yaml_str(&content)?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| GovernorError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `GOVERNOR_*` variables from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply `GOVERNOR_*` overrides read through `lookup`
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| lookup(&format!("{}{}", ENV_PREFIX, suffix));

        if let Some(value) = var("MAX_REQUESTS") {
            self.rate_limit.max_requests = parse_env("MAX_REQUESTS", &value)?;
        }
        if let Some(value) = var("WINDOW_MS") {
            self.rate_limit.window_ms = parse_env("WINDOW_MS", &value)?;
        }
        if let Some(value) = var("ALGORITHM") {
            self.rate_limit.algorithm = value.parse().map_err(GovernorError::Config)?;
        }
        if let Some(value) = var("BURST_ALLOWANCE") {
            self.rate_limit.burst_allowance = parse_env("BURST_ALLOWANCE", &value)?;
        }
        if let Some(value) = var("ENABLE_QUEUING") {
            self.rate_limit.enable_queuing = parse_bool("ENABLE_QUEUING", &value)?;
        }
        if let Some(value) = var("MAX_QUEUE_SIZE") {
            self.rate_limit.max_queue_size = parse_env("MAX_QUEUE_SIZE", &value)?;
        }
        if let Some(value) = var("QUEUE_TIMEOUT_MS") {
            self.rate_limit.queue_timeout_ms = parse_env("QUEUE_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = var("MAX_RETRIES") {
            self.backoff.max_retries = parse_env("MAX_RETRIES", &value)?;
        }
        if let Some(value) = var("INITIAL_DELAY_MS") {
            self.backoff.initial_delay_ms = parse_env("INITIAL_DELAY_MS", &value)?;
        }
        if let Some(value) = var("MAX_DELAY_MS") {
            self.backoff.max_delay_ms = parse_env("MAX_DELAY_MS", &value)?;
        }
        if let Some(value) = var("BACKOFF_STRATEGY") {
            self.backoff.strategy = value.parse().map_err(GovernorError::Config)?;
        }
        if let Some(value) = var("JITTER") {
            self.backoff.jitter = parse_env("JITTER", &value)?;
        }
        if let Some(value) = var("LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = var("LOG_FORMAT") {
            self.logging.format = match value.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" | "text" => LogFormat::Pretty,
                other => {
                    return Err(GovernorError::config(format!(
                        "Invalid {}LOG_FORMAT: {}",
                        ENV_PREFIX, other
                    )));
                }
            };
        }

        Ok(())
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        debug!("Validating configuration");

        self.rate_limit
            .validate()
            .map_err(|e| GovernorError::Config(format!("Rate limit config error: {}", e)))?;

        self.backoff
            .validate()
            .map_err(|e| GovernorError::Config(format!("Backoff config error: {}", e)))?;

        self.retry
            .validate()
            .map_err(|e| GovernorError::Config(format!("Retry config error: {}", e)))?;

        self.resources
            .validate()
            .map_err(|e| GovernorError::Config(format!("Resource config error: {}", e)))?;

        if self.backoff.strategy == BackoffStrategy::Custom {
            warn!("Backoff strategy is 'custom'; a delay function must be supplied in code");
        }

        debug!("Configuration validation completed");
        Ok(())
    }

    /// Merge with another configuration (other takes precedence)
    ///
    /// Precedence is per field and only for values that differ from the
    /// defaults. Environment overrides assign unconditionally and are the way
    /// to put a field back to its default.
    pub fn merge(mut self, other: Self) -> Self {
        self.rate_limit = self.rate_limit.merge(other.rate_limit);
        self.backoff = self.backoff.merge(other.backoff);
        self.retry = self.retry.merge(other.retry);
        self.resources = self.resources.merge(other.resources);
        if other.logging != LoggingOptions::default() {
            self.logging = other.logging;
        }
        self
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            GovernorError::Config(format!("Failed to serialize config to JSON: {}", e))
        })
    }

    /// Convert to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            GovernorError::Config(format!("Failed to serialize config to YAML: {}", e))
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        GovernorError::config(format!("Invalid {}{}: {}", ENV_PREFIX, name, value))
    })
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(GovernorError::config(format!(
            "Invalid {}{}: {}",
            ENV_PREFIX, name, value
        ))),
    }
}
