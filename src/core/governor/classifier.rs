//! Retry classification of wrapped-operation errors

use crate::config::models::RetryConfig;
use crate::utils::error::{GovernorError, Result};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::fmt::Debug;

/// Network failures, timeouts, rate limiting, 5xx statuses and socket error codes
static DEFAULT_RETRYABLE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(
        r"network|timeout|timed out|rate limit|5\d{2}|429|ECONNRESET|ECONNREFUSED|ETIMEDOUT|EPIPE|EAI_AGAIN",
    )
    .case_insensitive(true)
    .build()
    .expect("Invalid default retry regex")
});

/// Decides whether a failed operation is worth another attempt
pub trait RetryClassifier: Send + Sync + Debug {
    fn is_retryable(&self, message: &str) -> bool;
}

/// Matches the error message against case-insensitive patterns
#[derive(Debug, Clone)]
pub struct PatternClassifier {
    use_defaults: bool,
    patterns: Vec<Regex>,
}

impl Default for PatternClassifier {
    fn default() -> Self {
        Self {
            use_defaults: true,
            patterns: Vec::new(),
        }
    }
}

impl PatternClassifier {
    pub fn from_config(config: &RetryConfig) -> Result<Self> {
        let patterns = config
            .retryable_patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        GovernorError::Config(format!("invalid retryable pattern '{}': {}", pattern, e))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            use_defaults: config.use_default_patterns,
            patterns,
        })
    }
}

impl RetryClassifier for PatternClassifier {
    fn is_retryable(&self, message: &str) -> bool {
        (self.use_defaults && DEFAULT_RETRYABLE.is_match(message))
            || self.patterns.iter().any(|pattern| pattern.is_match(message))
    }
}
