//! Rate limiting configuration

use super::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateLimitConfig {
    /// Requests admitted per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    /// Window length in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    /// Admission algorithm
    #[serde(default)]
    pub algorithm: RateLimitAlgorithm,
    /// Extra capacity on top of `max_requests` for bucket algorithms
    #[serde(default)]
    pub burst_allowance: u32,
    /// Number of distinct queue priorities (0 is lowest)
    #[serde(default = "default_priority_levels")]
    pub priority_levels: u8,
    /// Queue denied requests instead of backing off
    #[serde(default = "default_true")]
    pub enable_queuing: bool,
    /// Maximum number of queued requests
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
    /// How long a request may wait in the queue
    #[serde(default = "default_queue_timeout_ms")]
    pub queue_timeout_ms: u64,
    /// Pause between two dequeued items
    #[serde(default = "default_queue_processing_interval_ms")]
    pub queue_processing_interval_ms: u64,
    /// What happens when an item reaches the head of the queue
    #[serde(default)]
    pub dequeue_policy: DequeuePolicy,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_ms: default_window_ms(),
            algorithm: RateLimitAlgorithm::default(),
            burst_allowance: 0,
            priority_levels: default_priority_levels(),
            enable_queuing: true,
            max_queue_size: default_max_queue_size(),
            queue_timeout_ms: default_queue_timeout_ms(),
            queue_processing_interval_ms: default_queue_processing_interval_ms(),
            dequeue_policy: DequeuePolicy::default(),
        }
    }
}

impl RateLimitConfig {
    /// Convenience constructor for the two mandatory knobs
    pub fn new(max_requests: u32, window_ms: u64) -> Self {
        Self {
            max_requests,
            window_ms,
            ..Self::default()
        }
    }

    pub fn with_algorithm(mut self, algorithm: RateLimitAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_queuing(mut self, enabled: bool) -> Self {
        self.enable_queuing = enabled;
        self
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn queue_timeout(&self) -> Duration {
        Duration::from_millis(self.queue_timeout_ms)
    }

    pub fn queue_processing_interval(&self) -> Duration {
        Duration::from_millis(self.queue_processing_interval_ms)
    }

    /// Bucket capacity including burst allowance
    pub fn capacity(&self) -> f64 {
        f64::from(self.max_requests) + f64::from(self.burst_allowance)
    }

    /// Merge rate limit configurations (other wins where it differs from the defaults)
    ///
    /// A field of `other` left at its default never overrides `self`, so an
    /// overlay cannot set a value back to the default. Use
    /// `GovernorConfig::apply_overrides_from` for that.
    pub fn merge(mut self, other: Self) -> Self {
        let defaults = Self::default();
        if other.max_requests != defaults.max_requests {
            self.max_requests = other.max_requests;
        }
        if other.window_ms != defaults.window_ms {
            self.window_ms = other.window_ms;
        }
        if other.algorithm != defaults.algorithm {
            self.algorithm = other.algorithm;
        }
        if other.burst_allowance != defaults.burst_allowance {
            self.burst_allowance = other.burst_allowance;
        }
        if other.priority_levels != defaults.priority_levels {
            self.priority_levels = other.priority_levels;
        }
        if other.enable_queuing != defaults.enable_queuing {
            self.enable_queuing = other.enable_queuing;
        }
        if other.max_queue_size != defaults.max_queue_size {
            self.max_queue_size = other.max_queue_size;
        }
        if other.queue_timeout_ms != defaults.queue_timeout_ms {
            self.queue_timeout_ms = other.queue_timeout_ms;
        }
        if other.queue_processing_interval_ms != defaults.queue_processing_interval_ms {
            self.queue_processing_interval_ms = other.queue_processing_interval_ms;
        }
        if other.dequeue_policy != defaults.dequeue_policy {
            self.dequeue_policy = other.dequeue_policy;
        }
        self
    }
}

/// Rate limiting algorithm
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum RateLimitAlgorithm {
    /// Token bucket algorithm
    #[default]
    TokenBucket,
    /// Sliding window of one-second buckets
    SlidingWindow,
    /// Fixed window
    FixedWindow,
    /// Leaky bucket
    LeakyBucket,
}

impl RateLimitAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TokenBucket => "token-bucket",
            Self::SlidingWindow => "sliding-window",
            Self::FixedWindow => "fixed-window",
            Self::LeakyBucket => "leaky-bucket",
        }
    }
}

impl fmt::Display for RateLimitAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RateLimitAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "token-bucket" => Ok(Self::TokenBucket),
            "sliding-window" => Ok(Self::SlidingWindow),
            "fixed-window" => Ok(Self::FixedWindow),
            "leaky-bucket" => Ok(Self::LeakyBucket),
            other => Err(format!("unknown rate limit algorithm: {}", other)),
        }
    }
}

/// Behavior when a queued request reaches the head of the queue
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DequeuePolicy {
    /// Queue position guarantees eventual admission
    #[default]
    Admit,
    /// Ask the limiter again before admitting
    Recheck,
}
