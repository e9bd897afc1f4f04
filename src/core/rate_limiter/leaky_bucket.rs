//! Leaky bucket limiter

use super::types::{AdmissionLimiter, RateLimitResult, per_second, time_for};
use crate::config::models::{RateLimitAlgorithm, RateLimitConfig};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
struct LeakyBucketState {
    level: f64,
    last_leak: Instant,
}

/// Bucket whose level drains at `max_requests` per window; each request adds one unit
#[derive(Debug)]
pub struct LeakyBucketLimiter {
    max_requests: u32,
    capacity: f64,
    window: Duration,
    state: Mutex<LeakyBucketState>,
}

impl LeakyBucketLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            capacity: config.capacity(),
            window: config.window(),
            state: Mutex::new(LeakyBucketState {
                level: 0.0,
                last_leak: Instant::now(),
            }),
        }
    }

    fn rate(&self) -> f64 {
        per_second(self.max_requests, self.window)
    }

    fn leak(&self, state: &mut LeakyBucketState, now: Instant) {
        let elapsed = now.saturating_duration_since(state.last_leak);
        let drained = elapsed.as_secs_f64() * self.rate();
        state.level = (state.level - drained).max(0.0);
        state.last_leak = now;
    }

    /// Current fill level, after draining
    pub fn level(&self) -> f64 {
        let mut state = self.state.lock();
        self.leak(&mut state, Instant::now());
        state.level
    }
}

impl AdmissionLimiter for LeakyBucketLimiter {
    fn is_allowed(&self) -> RateLimitResult {
        let now = Instant::now();
        let mut state = self.state.lock();
        self.leak(&mut state, now);

        if state.level + 1.0 <= self.capacity {
            state.level += 1.0;
            let remaining = (self.capacity - state.level).floor() as u32;
            let reset_after = time_for(state.level, self.rate(), self.window);
            return RateLimitResult::allowed(remaining, self.max_requests, reset_after);
        }

        let overflow = state.level + 1.0 - self.capacity;
        let retry_after = time_for(overflow, self.rate(), self.window);
        let reset_after = time_for(state.level, self.rate(), self.window);
        debug!(
            level = state.level,
            capacity = self.capacity,
            "Leaky bucket denied request, retry after {:?}",
            retry_after
        );
        RateLimitResult::denied(self.max_requests, reset_after, retry_after)
    }

    fn reset(&self) {
        let mut state = self.state.lock();
        state.level = 0.0;
        state.last_leak = Instant::now();
    }

    fn algorithm(&self) -> RateLimitAlgorithm {
        RateLimitAlgorithm::LeakyBucket
    }
}
