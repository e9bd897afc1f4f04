//! Configuration data models
//!
//! This module defines all configuration structures used by the governor.

pub mod backoff;
pub mod rate_limit;
pub mod resources;
pub mod retry;

pub use backoff::*;
pub use rate_limit::*;
pub use resources::*;
pub use retry::*;

/// Default requests per window
pub fn default_max_requests() -> u32 {
    100
}

/// Default window length (one minute)
pub fn default_window_ms() -> u64 {
    60_000
}

/// Default number of queue priorities
pub fn default_priority_levels() -> u8 {
    3
}

/// Default queue capacity
pub fn default_max_queue_size() -> usize {
    100
}

/// Default queue wait budget
pub fn default_queue_timeout_ms() -> u64 {
    30_000
}

/// Default pause between dequeued items
pub fn default_queue_processing_interval_ms() -> u64 {
    10
}

/// Default first backoff delay
pub fn default_initial_delay_ms() -> u64 {
    1_000
}

/// Default backoff ceiling
pub fn default_max_delay_ms() -> u64 {
    30_000
}

/// Default maximum retry attempts
pub fn default_max_retries() -> u32 {
    3
}

/// Default jitter fraction
pub fn default_jitter() -> f64 {
    0.1
}

/// Default resource monitor tick
pub fn default_monitoring_interval_ms() -> u64 {
    5_000
}

/// Default violation log capacity
pub fn default_max_violations() -> usize {
    1_000
}

/// Default violation retention (one hour)
pub fn default_violation_retention_secs() -> u64 {
    3_600
}

/// Default age after which a stale peak is reset
pub fn default_stale_peak_after_secs() -> u64 {
    300
}

pub fn default_true() -> bool {
    true
}
