//! Governor builder

use super::classifier::{PatternClassifier, RetryClassifier};
use super::governor::Governor;
use super::metrics::MetricsRecorder;
use crate::config::GovernorConfig;
use crate::config::models::{BackoffConfig, RateLimitConfig, RetryConfig};
use crate::core::backoff::{BackoffCalculator, CustomDelayFn};
use crate::core::queue::RequestQueue;
use crate::core::rate_limiter::build_limiter;
use crate::core::resources::ResourceLimitsManager;
use crate::utils::error::Result;
use std::sync::Arc;
use tracing::debug;

/// Assembles a [`Governor`] from configuration and optional collaborators
#[derive(Default)]
pub struct GovernorBuilder {
    config: GovernorConfig,
    custom_backoff: Option<CustomDelayFn>,
    classifier: Option<Arc<dyn RetryClassifier>>,
    resources: Option<Arc<ResourceLimitsManager>>,
}

impl GovernorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take rate limit, backoff and retry settings from a full config
    pub fn with_config(mut self, config: GovernorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.config.rate_limit = rate_limit;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.config.backoff = backoff;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Delay function for the `custom` backoff strategy
    pub fn with_custom_backoff<F>(mut self, delay: F) -> Self
    where
        F: Fn(u32, u64) -> u64 + Send + Sync + 'static,
    {
        self.custom_backoff = Some(Arc::new(delay));
        self
    }

    /// Replace the pattern-based retry classification
    pub fn with_classifier(mut self, classifier: Arc<dyn RetryClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Attach a resource manager for connection and queue-depth accounting
    pub fn with_resource_manager(mut self, resources: Arc<ResourceLimitsManager>) -> Self {
        self.resources = Some(resources);
        self
    }

    pub fn build(self) -> Result<Governor> {
        let limiter = build_limiter(&self.config.rate_limit)?;

        let backoff = match self.custom_backoff {
            Some(custom) => BackoffCalculator::with_custom(self.config.backoff.clone(), custom)?,
            None => BackoffCalculator::new(self.config.backoff.clone())?,
        };

        let classifier = match self.classifier {
            Some(classifier) => classifier,
            None => Arc::new(PatternClassifier::from_config(&self.config.retry)?),
        };

        let queue = RequestQueue::with_limiter(&self.config.rate_limit, Arc::clone(&limiter));

        debug!(
            "Building governor: {} limiter, {} requests per {}ms, queuing {}",
            limiter.algorithm(),
            self.config.rate_limit.max_requests,
            self.config.rate_limit.window_ms,
            self.config.rate_limit.enable_queuing
        );

        Ok(Governor {
            rate_limit: self.config.rate_limit,
            limiter,
            queue,
            backoff,
            classifier,
            resources: self.resources,
            metrics: MetricsRecorder::new(),
        })
    }
}

impl Governor {
    pub fn builder() -> GovernorBuilder {
        GovernorBuilder::new()
    }

    /// Build a governor from configuration alone
    pub fn new(config: &GovernorConfig) -> Result<Self> {
        GovernorBuilder::new().with_config(config.clone()).build()
    }
}
