//! # request-governor
//!
//! Admission control and resource governance for outbound API calls.
//!
//! ## Features
//!
//! - **Rate limiting**: token bucket, sliding window, fixed window and leaky bucket
//! - **Priority queuing**: bounded queue with per-request timeouts
//! - **Backoff**: linear, exponential, fibonacci or custom delays with jitter
//! - **Resource budgets**: hard and soft limits, violation log, background monitor
//! - **Metrics**: request counters, response time, throughput and error rate
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use request_governor::{Governor, GovernorConfig, GovernorError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), GovernorError> {
//!     let config = GovernorConfig::from_file("config/governor.yaml").await?;
//!     let governor = Governor::new(&config)?;
//!
//!     let body: String = governor
//!         .execute_request(|| async { Ok::<_, GovernorError>("pong".to_string()) }, None)
//!         .await?;
//!
//!     println!("{} ({:?})", body, governor.metrics());
//!     governor.dispose();
//!     Ok(())
//! }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod monitoring;
pub mod utils;

// Re-export main types
pub use config::GovernorConfig;
pub use config::models::{
    BackoffConfig, BackoffStrategy, DequeuePolicy, RateLimitAlgorithm, RateLimitConfig,
    ResourceLimitsConfig, RetryConfig,
};
pub use core::backoff::BackoffCalculator;
pub use core::governor::{
    Governor, GovernorBuilder, GovernorStatus, PatternClassifier, PerformanceMetrics,
    RetryClassifier,
};
pub use core::queue::{AdmissionStatus, RequestMetadata, RequestQueue};
pub use core::rate_limiter::{AdmissionLimiter, RateLimitResult, build_limiter};
pub use core::resources::{
    ResourceCheckResult, ResourceEvent, ResourceLimit, ResourceLimitsManager, ResourceType,
    ResourceUnit, ResourceViolation, SecurityContext, ValidationOutcome,
};
pub use utils::error::{GovernorError, Result};

// Version information
/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");
/// Description of the crate
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Build information
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Version number
    pub version: &'static str,
    /// Unix timestamp of the build
    pub build_time: &'static str,
    /// Git commit hash
    pub git_hash: &'static str,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            version: VERSION,
            build_time: option_env!("BUILD_TIME").unwrap_or("unknown"),
            git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
        }
    }
}

/// Build
pub fn build_info() -> BuildInfo {
    BuildInfo::default()
}
