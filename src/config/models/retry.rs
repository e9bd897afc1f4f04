//! Retry classification configuration

use serde::{Deserialize, Serialize};

/// Which wrapped-operation errors are worth retrying
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryConfig {
    /// Match the built-in network/timeout/rate-limit/5xx patterns
    #[serde(default = "super::default_true")]
    pub use_default_patterns: bool,
    /// Additional case-insensitive regular expressions
    #[serde(default)]
    pub retryable_patterns: Vec<String>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            use_default_patterns: true,
            retryable_patterns: Vec::new(),
        }
    }
}

impl RetryConfig {
    /// Merge retry configurations; extra patterns accumulate
    pub fn merge(mut self, other: Self) -> Self {
        if !other.use_default_patterns {
            self.use_default_patterns = false;
        }
        for pattern in other.retryable_patterns {
            if !self.retryable_patterns.contains(&pattern) {
                self.retryable_patterns.push(pattern);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert!(config.use_default_patterns);
        assert!(config.retryable_patterns.is_empty());
    }

    #[test]
    fn test_merge_accumulates_patterns() {
        let base = RetryConfig {
            use_default_patterns: true,
            retryable_patterns: vec!["busy".to_string()],
        };
        let other = RetryConfig {
            use_default_patterns: true,
            retryable_patterns: vec!["busy".to_string(), "overloaded".to_string()],
        };
        let merged = base.merge(other);
        assert_eq!(merged.retryable_patterns, vec!["busy", "overloaded"]);
    }
}
