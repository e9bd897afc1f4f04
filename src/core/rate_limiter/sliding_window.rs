//! Sliding window limiter

use super::types::{AdmissionLimiter, RateLimitResult};
use crate::config::models::{RateLimitAlgorithm, RateLimitConfig};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

const BUCKET_MS: u64 = 1_000;

#[derive(Debug)]
struct SlidingWindowState {
    epoch: Instant,
    /// Request count per second since `epoch`
    buckets: BTreeMap<u64, u32>,
}

impl SlidingWindowState {
    fn elapsed_ms(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.epoch).as_millis() as u64
    }
}

/// Counts requests in one-second buckets over a trailing window
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    max_requests: u32,
    window: Duration,
    state: Mutex<SlidingWindowState>,
}

impl SlidingWindowLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window: config.window(),
            state: Mutex::new(SlidingWindowState {
                epoch: Instant::now(),
                buckets: BTreeMap::new(),
            }),
        }
    }

    fn window_ms(&self) -> u64 {
        self.window.as_millis() as u64
    }

    /// Drop buckets that no longer overlap `[now - window, now]`
    fn purge(&self, state: &mut SlidingWindowState, elapsed_ms: u64) {
        let cutoff = elapsed_ms.saturating_sub(self.window_ms());
        state.buckets = state.buckets.split_off(&(cutoff / BUCKET_MS));
    }

    /// Time until the oldest surviving bucket leaves the window
    fn until_oldest_expires(&self, state: &SlidingWindowState, elapsed_ms: u64) -> Duration {
        match state.buckets.keys().next() {
            Some(&oldest) => {
                let leaves_at = (oldest + 1) * BUCKET_MS + self.window_ms();
                Duration::from_millis(leaves_at.saturating_sub(elapsed_ms))
            }
            None => self.window,
        }
    }

    /// Requests counted in the current window
    pub fn current_count(&self) -> u32 {
        let mut state = self.state.lock();
        let elapsed_ms = state.elapsed_ms(Instant::now());
        self.purge(&mut state, elapsed_ms);
        state.buckets.values().sum()
    }
}

impl AdmissionLimiter for SlidingWindowLimiter {
    fn is_allowed(&self) -> RateLimitResult {
        let mut state = self.state.lock();
        let elapsed_ms = state.elapsed_ms(Instant::now());
        self.purge(&mut state, elapsed_ms);

        let count: u32 = state.buckets.values().sum();
        if count < self.max_requests {
            *state.buckets.entry(elapsed_ms / BUCKET_MS).or_insert(0) += 1;
            let reset_after = self.until_oldest_expires(&state, elapsed_ms);
            return RateLimitResult::allowed(
                self.max_requests - count - 1,
                self.max_requests,
                reset_after,
            );
        }

        let retry_after = self.until_oldest_expires(&state, elapsed_ms);
        debug!(
            count,
            limit = self.max_requests,
            "Sliding window denied request, retry after {:?}",
            retry_after
        );
        RateLimitResult::denied(self.max_requests, retry_after, retry_after)
    }

    fn reset(&self) {
        let mut state = self.state.lock();
        state.buckets.clear();
        state.epoch = Instant::now();
    }

    fn algorithm(&self) -> RateLimitAlgorithm {
        RateLimitAlgorithm::SlidingWindow
    }
}
