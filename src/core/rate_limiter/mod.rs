//! Rate Limiting Implementation
//!
//! Interchangeable admission-check strategies behind [`AdmissionLimiter`]:
//! token bucket, sliding window, fixed window and leaky bucket.

mod fixed_window;
mod leaky_bucket;
mod sliding_window;
mod token_bucket;
mod types;


// Re-export public types
pub use fixed_window::FixedWindowLimiter;
pub use leaky_bucket::LeakyBucketLimiter;
pub use sliding_window::SlidingWindowLimiter;
pub use token_bucket::TokenBucketLimiter;
pub use types::{AdmissionLimiter, RateLimitResult};

use crate::config::models::{RateLimitAlgorithm, RateLimitConfig};
use crate::config::Validate;
use crate::utils::error::{GovernorError, Result};
use std::sync::Arc;

/// Build the limiter selected by `config.algorithm`
pub fn build_limiter(config: &RateLimitConfig) -> Result<Arc<dyn AdmissionLimiter>> {
    config
        .validate()
        .map_err(|e| GovernorError::Config(format!("Rate limit config error: {}", e)))?;

    let limiter: Arc<dyn AdmissionLimiter> = match config.algorithm {
        RateLimitAlgorithm::TokenBucket => Arc::new(TokenBucketLimiter::new(config)),
        RateLimitAlgorithm::SlidingWindow => Arc::new(SlidingWindowLimiter::new(config)),
        RateLimitAlgorithm::FixedWindow => Arc::new(FixedWindowLimiter::new(config)),
        RateLimitAlgorithm::LeakyBucket => Arc::new(LeakyBucketLimiter::new(config)),
    };
    Ok(limiter)
}
