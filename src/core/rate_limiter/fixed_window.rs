//! Fixed window limiter

use super::types::{AdmissionLimiter, RateLimitResult};
use crate::config::models::{RateLimitAlgorithm, RateLimitConfig};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
struct FixedWindowState {
    window_start: Instant,
    count: u32,
}

/// Counts requests in consecutive, non-overlapping windows
#[derive(Debug)]
pub struct FixedWindowLimiter {
    max_requests: u32,
    window: Duration,
    state: Mutex<FixedWindowState>,
}

impl FixedWindowLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window: config.window(),
            state: Mutex::new(FixedWindowState {
                window_start: Instant::now(),
                count: 0,
            }),
        }
    }

    /// Advance to the window containing `now`, keeping boundaries aligned
    fn roll(&self, state: &mut FixedWindowState, now: Instant) {
        let elapsed = now.saturating_duration_since(state.window_start);
        if elapsed >= self.window {
            let window_ms = self.window.as_millis().max(1);
            let skipped = elapsed.as_millis() / window_ms;
            let advance = Duration::from_millis((skipped * window_ms) as u64);
            state.window_start += advance;
            state.count = 0;
        }
    }
}

impl AdmissionLimiter for FixedWindowLimiter {
    fn is_allowed(&self) -> RateLimitResult {
        let now = Instant::now();
        let mut state = self.state.lock();
        self.roll(&mut state, now);

        let reset_after =
            (state.window_start + self.window).saturating_duration_since(now);

        if state.count < self.max_requests {
            state.count += 1;
            return RateLimitResult::allowed(
                self.max_requests - state.count,
                self.max_requests,
                reset_after,
            );
        }

        debug!(
            count = state.count,
            limit = self.max_requests,
            "Fixed window denied request, retry after {:?}",
            reset_after
        );
        RateLimitResult::denied(self.max_requests, reset_after, reset_after)
    }

    fn reset(&self) {
        let mut state = self.state.lock();
        state.window_start = Instant::now();
        state.count = 0;
    }

    fn algorithm(&self) -> RateLimitAlgorithm {
        RateLimitAlgorithm::FixedWindow
    }
}
