//! Backoff calculator implementation

use crate::config::Validate;
use crate::config::models::{BackoffConfig, BackoffStrategy};
use crate::utils::error::{GovernorError, Result};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// User supplied delay function: `(attempt, initial_delay_ms) -> delay_ms`
pub type CustomDelayFn = Arc<dyn Fn(u32, u64) -> u64 + Send + Sync>;

/// Maps an attempt number to a retry delay
#[derive(Clone)]
pub struct BackoffCalculator {
    config: BackoffConfig,
    custom: Option<CustomDelayFn>,
}

impl fmt::Debug for BackoffCalculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackoffCalculator")
            .field("config", &self.config)
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

impl BackoffCalculator {
    /// Create a calculator for one of the built-in strategies
    pub fn new(config: BackoffConfig) -> Result<Self> {
        Self::build(config, None)
    }

    /// Create a calculator with a custom delay function
    pub fn with_custom(config: BackoffConfig, custom: CustomDelayFn) -> Result<Self> {
        Self::build(config, Some(custom))
    }

    fn build(config: BackoffConfig, custom: Option<CustomDelayFn>) -> Result<Self> {
        config
            .validate()
            .map_err(|e| GovernorError::Config(format!("Backoff config error: {}", e)))?;

        if config.strategy == BackoffStrategy::Custom && custom.is_none() {
            return Err(GovernorError::config(
                "custom backoff strategy requires a delay function",
            ));
        }

        Ok(Self { config, custom })
    }

    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }

    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }

    /// Delay before `attempt`, or `None` once `attempt > max_retries`
    pub fn calculate_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt > self.config.max_retries {
            return None;
        }
        if attempt == 0 {
            return Some(Duration::ZERO);
        }

        let initial = self.config.initial_delay_ms;
        let base_ms = match self.config.strategy {
            BackoffStrategy::Linear => initial.saturating_mul(u64::from(attempt)),
            BackoffStrategy::Exponential => {
                let factor = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
                initial.saturating_mul(factor)
            }
            BackoffStrategy::Fibonacci => initial.saturating_mul(fibonacci(attempt)),
            BackoffStrategy::Custom => match &self.custom {
                Some(custom) => custom(attempt, initial),
                None => initial,
            },
        };

        let delay_ms = self.apply_jitter(base_ms);
        Some(Duration::from_millis(delay_ms))
    }

    fn apply_jitter(&self, base_ms: u64) -> u64 {
        let max_ms = self.config.max_delay_ms as f64;
        let mut delay = base_ms as f64;
        if self.config.jitter > 0.0 {
            delay += delay * self.config.jitter * (rand::random::<f64>() - 0.5) * 2.0;
        }
        delay.clamp(0.0, max_ms).round() as u64
    }

    /// Sleep for the delay of `attempt`; returns the delay, or `None` without sleeping
    pub async fn sleep(&self, attempt: u32) -> Option<Duration> {
        let delay = self.calculate_delay(attempt)?;
        debug!("Backing off {:?} before attempt {}", delay, attempt);
        tokio::time::sleep(delay).await;
        Some(delay)
    }
}

/// fib(0) = 0, fib(1) = 1, saturating
pub(super) fn fibonacci(n: u32) -> u64 {
    let (mut a, mut b) = (0u64, 1u64);
    for _ in 0..n {
        let next = a.saturating_add(b);
        a = b;
        b = next;
    }
    a
}
