//! Backoff configuration

use super::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Retry timing policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackoffConfig {
    /// Delay unit for the first retry
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Upper bound on any single delay
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Delay growth strategy
    #[serde(default)]
    pub strategy: BackoffStrategy,
    /// Attempts beyond this number are refused
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Symmetric random spread as a fraction of the delay, in `[0, 1]`
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            strategy: BackoffStrategy::default(),
            max_retries: default_max_retries(),
            jitter: default_jitter(),
        }
    }
}

impl BackoffConfig {
    pub fn new(strategy: BackoffStrategy, initial_delay_ms: u64, max_retries: u32) -> Self {
        Self {
            initial_delay_ms,
            strategy,
            max_retries,
            ..Self::default()
        }
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_max_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Merge backoff configurations (other wins where it differs from the defaults)
    ///
    /// Default-valued fields of `other` are ignored, as in `RateLimitConfig::merge`.
    pub fn merge(mut self, other: Self) -> Self {
        let defaults = Self::default();
        if other.initial_delay_ms != defaults.initial_delay_ms {
            self.initial_delay_ms = other.initial_delay_ms;
        }
        if other.max_delay_ms != defaults.max_delay_ms {
            self.max_delay_ms = other.max_delay_ms;
        }
        if other.strategy != defaults.strategy {
            self.strategy = other.strategy;
        }
        if other.max_retries != defaults.max_retries {
            self.max_retries = other.max_retries;
        }
        if (other.jitter - defaults.jitter).abs() > f64::EPSILON {
            self.jitter = other.jitter;
        }
        self
    }
}

/// Delay growth strategy
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// `initial * attempt`
    Linear,
    /// `initial * 2^(attempt - 1)`
    #[default]
    Exponential,
    /// `initial * fib(attempt)`
    Fibonacci,
    /// User supplied function of `(attempt, initial)`
    Custom,
}

impl fmt::Display for BackoffStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Linear => "linear",
            Self::Exponential => "exponential",
            Self::Fibonacci => "fibonacci",
            Self::Custom => "custom",
        };
        f.write_str(name)
    }
}

impl FromStr for BackoffStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "exponential" => Ok(Self::Exponential),
            "fibonacci" => Ok(Self::Fibonacci),
            "custom" => Ok(Self::Custom),
            other => Err(format!("unknown backoff strategy: {}", other)),
        }
    }
}
