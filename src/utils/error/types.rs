//! Error types for the governor

use std::time::Duration;
use thiserror::Error;

use crate::core::resources::ResourceType;

/// Result type alias for the governor
pub type Result<T> = std::result::Result<T, GovernorError>;

/// Main error type for the governor
#[derive(Error, Debug)]
pub enum GovernorError {
    /// The active limiter denied the request and no queue or retry budget absorbed it
    #[error("Rate limit exceeded, retry after {}s", ceil_secs(.retry_after))]
    RateLimitExceeded { retry_after: Duration },

    /// The admission queue is at capacity
    #[error("Request queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    /// A queued request was not admitted in time
    #[error("Request timed out in queue after {}ms", .timeout.as_millis())]
    QueueTimeout { timeout: Duration },

    /// Backoff budget exhausted while waiting for admission
    #[error("Maximum retries exceeded after {attempts} attempts")]
    MaxRetriesExceeded { attempts: u32 },

    /// A hard resource limit would be crossed
    #[error("Resource limit exceeded for {resource}: {message}")]
    ResourceLimitExceeded {
        resource: ResourceType,
        message: String,
    },

    /// A soft resource limit was crossed; informational, never blocks
    #[error("Soft limit warning for {resource}: {message}")]
    ResourceSoftLimitWarning {
        resource: ResourceType,
        message: String,
    },

    /// Static security rules rejected the input
    #[error("Security validation failed: {0}")]
    SecurityValidationFailed(String),

    /// An operation ran past its processing-time budget
    #[error("Operation timed out after {}ms", .timeout.as_millis())]
    OperationTimeout { timeout: Duration },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The component was closed while the request was pending
    #[error("Shutdown: {0}")]
    Shutdown(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn ceil_secs(duration: &Duration) -> u64 {
    duration.as_secs_f64().ceil() as u64
}
