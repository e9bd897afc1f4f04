//! Request governor
//!
//! Ties the limiter, the queue and the backoff calculator together around a
//! unit of work, classifies failures for retry and records metrics.

mod builder;
mod classifier;
#[allow(clippy::module_inception)]
mod governor;
mod metrics;
mod types;


pub use builder::GovernorBuilder;
pub use classifier::{PatternClassifier, RetryClassifier};
pub use governor::Governor;
pub use types::{GovernorStatus, PerformanceMetrics};
