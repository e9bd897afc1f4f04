//! Rate limiter types and data structures

use crate::config::models::RateLimitAlgorithm;
use serde::Serialize;
use std::time::Duration;

/// Outcome of one admission check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitResult {
    /// Whether the request is allowed
    pub allowed: bool,
    /// Requests still available right after this check
    pub remaining_requests: u32,
    /// Maximum requests allowed per window
    pub limit: u32,
    /// Time until the limiter is back at full capacity
    pub reset_after: Duration,
    /// Suggested wait before asking again (only set when not allowed)
    pub retry_after: Option<Duration>,
}

impl RateLimitResult {
    pub(super) fn allowed(remaining_requests: u32, limit: u32, reset_after: Duration) -> Self {
        Self {
            allowed: true,
            remaining_requests,
            limit,
            reset_after,
            retry_after: None,
        }
    }

    pub(super) fn denied(limit: u32, reset_after: Duration, retry_after: Duration) -> Self {
        Self {
            allowed: false,
            remaining_requests: 0,
            limit,
            reset_after,
            retry_after: Some(retry_after),
        }
    }

    /// Retry hint in whole seconds, rounded up and never below one
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.retry_after.map(|retry| {
            let secs = retry.as_secs() + u64::from(retry.subsec_nanos() > 0);
            secs.max(1)
        })
    }
}

/// Common contract for every admission algorithm
///
/// Check and consume happen under one lock, so concurrent callers can never
/// admit more than the configured budget.
pub trait AdmissionLimiter: Send + Sync + std::fmt::Debug {
    /// Check one unit and consume it when allowed
    fn is_allowed(&self) -> RateLimitResult;

    /// Restore full capacity
    fn reset(&self);

    /// Algorithm implemented by this limiter
    fn algorithm(&self) -> RateLimitAlgorithm;
}

/// Rate expressed in units per second, derived from a budget per window
pub(super) fn per_second(max_requests: u32, window: Duration) -> f64 {
    let secs = window.as_secs_f64();
    if secs <= 0.0 {
        f64::INFINITY
    } else {
        f64::from(max_requests) / secs
    }
}

/// Time needed to produce `amount` units at `rate` per second, capped at `cap`
pub(super) fn time_for(amount: f64, rate: f64, cap: Duration) -> Duration {
    if amount <= 0.0 {
        return Duration::ZERO;
    }
    if !rate.is_finite() || rate <= 0.0 {
        return cap;
    }
    let secs = amount / rate;
    if secs >= cap.as_secs_f64() {
        cap
    } else {
        Duration::from_secs_f64(secs)
    }
}
