//! Governor configuration validators
//!
//! Validation implementations for rate limiting, backoff, retry classification
//! and resource budget configuration.

use super::trait_def::Validate;
use crate::config::models::*;
use regex::RegexBuilder;
use std::collections::HashSet;

impl Validate for RateLimitConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_requests == 0 {
            return Err("max_requests must be greater than 0".to_string());
        }

        if self.window_ms == 0 {
            return Err("window_ms must be greater than 0".to_string());
        }

        if self.priority_levels == 0 {
            return Err("priority_levels must be at least 1".to_string());
        }

        if self.enable_queuing {
            if self.max_queue_size == 0 {
                return Err("max_queue_size must be greater than 0 when queuing is enabled".to_string());
            }
            if self.queue_timeout_ms == 0 {
                return Err(
                    "queue_timeout_ms must be greater than 0 when queuing is enabled".to_string(),
                );
            }
        }

        Ok(())
    }
}

impl Validate for BackoffConfig {
    fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(format!("jitter must be between 0 and 1, got {}", self.jitter));
        }

        if self.initial_delay_ms > self.max_delay_ms {
            return Err(format!(
                "initial_delay_ms ({}) must not exceed max_delay_ms ({})",
                self.initial_delay_ms, self.max_delay_ms
            ));
        }

        Ok(())
    }
}

impl Validate for RetryConfig {
    fn validate(&self) -> Result<(), String> {
        for pattern in &self.retryable_patterns {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| format!("invalid retryable pattern '{}': {}", pattern, e))?;
        }
        Ok(())
    }
}

impl Validate for ResourceLimit {
    fn validate(&self) -> Result<(), String> {
        if self.limit == 0 {
            return Err(format!("{} limit must be greater than 0", self.resource_type));
        }

        if let Some(soft) = self.soft_limit {
            if soft > self.limit {
                return Err(format!(
                    "{} soft limit ({}) must not exceed hard limit ({})",
                    self.resource_type, soft, self.limit
                ));
            }
        }

        Ok(())
    }
}

impl Validate for ResourceLimitsConfig {
    fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for limit in &self.limits {
            if !seen.insert(limit.resource_type) {
                return Err(format!("duplicate budget for {}", limit.resource_type));
            }
            limit.validate()?;
        }

        if self.monitoring_interval_ms == 0 {
            return Err("monitoring_interval_ms must be greater than 0".to_string());
        }

        if self.max_violations == 0 {
            return Err("max_violations must be greater than 0".to_string());
        }

        Ok(())
    }
}
