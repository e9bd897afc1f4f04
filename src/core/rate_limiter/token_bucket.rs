//! Token bucket limiter

use super::types::{AdmissionLimiter, RateLimitResult, per_second, time_for};
use crate::config::models::{RateLimitAlgorithm, RateLimitConfig};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
struct TokenBucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Bucket of `max_requests + burst_allowance` tokens refilled continuously over one window
#[derive(Debug)]
pub struct TokenBucketLimiter {
    max_requests: u32,
    capacity: f64,
    window: Duration,
    state: Mutex<TokenBucketState>,
}

impl TokenBucketLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let capacity = config.capacity();
        Self {
            max_requests: config.max_requests,
            capacity,
            window: config.window(),
            state: Mutex::new(TokenBucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    fn rate(&self) -> f64 {
        per_second(self.max_requests, self.window)
    }

    fn refill(&self, state: &mut TokenBucketState, now: Instant) {
        let elapsed = now.saturating_duration_since(state.last_refill);
        if elapsed >= self.window {
            state.tokens = self.capacity;
        } else {
            let added =
                elapsed.as_secs_f64() / self.window.as_secs_f64() * f64::from(self.max_requests);
            state.tokens = (state.tokens + added).min(self.capacity);
        }
        state.last_refill = now;
    }

    /// Check `tokens_requested` units and consume them when available
    pub fn is_allowed_n(&self, tokens_requested: u32) -> RateLimitResult {
        let now = Instant::now();
        let requested = f64::from(tokens_requested);

        let mut state = self.state.lock();
        self.refill(&mut state, now);

        if state.tokens >= requested {
            state.tokens -= requested;
            let reset_after = time_for(self.capacity - state.tokens, self.rate(), self.window);
            return RateLimitResult::allowed(
                state.tokens.floor() as u32,
                self.max_requests,
                reset_after,
            );
        }

        let deficit = requested - state.tokens;
        let retry_after = time_for(deficit, self.rate(), self.window);
        let reset_after = time_for(self.capacity - state.tokens, self.rate(), self.window);
        debug!(
            tokens = state.tokens,
            requested = tokens_requested,
            "Token bucket denied request, retry after {:?}",
            retry_after
        );
        RateLimitResult::denied(self.max_requests, reset_after, retry_after)
    }

    /// Tokens currently in the bucket, after refilling
    pub fn available_tokens(&self) -> f64 {
        let mut state = self.state.lock();
        self.refill(&mut state, Instant::now());
        state.tokens
    }
}

impl AdmissionLimiter for TokenBucketLimiter {
    fn is_allowed(&self) -> RateLimitResult {
        self.is_allowed_n(1)
    }

    fn reset(&self) {
        let mut state = self.state.lock();
        state.tokens = self.capacity;
        state.last_refill = Instant::now();
    }

    fn algorithm(&self) -> RateLimitAlgorithm {
        RateLimitAlgorithm::TokenBucket
    }
}
