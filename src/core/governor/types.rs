//! Governor snapshot types

use crate::config::models::RateLimitAlgorithm;
use serde::Serialize;

/// Governor-wide counters for one measurement epoch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub rate_limited_requests: u64,
    pub queued_requests: u64,
    pub retried_requests: u64,
    /// Mean duration of executed work, in milliseconds
    pub average_response_time_ms: f64,
    /// Successful requests per second since the epoch started
    pub throughput: f64,
    /// `(total - successful) / total`, 0 when nothing ran
    pub error_rate: f64,
    pub uptime_ms: u64,
}

/// Point-in-time view for dashboards
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GovernorStatus {
    pub algorithm: RateLimitAlgorithm,
    pub queuing_enabled: bool,
    pub queue_length: usize,
    pub queue_capacity: usize,
    pub closed: bool,
}
