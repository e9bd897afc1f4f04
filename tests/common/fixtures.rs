//! Test fixtures and factories

use request_governor::monitoring::MemorySampler;
use request_governor::{
    BackoffConfig, BackoffStrategy, GovernorConfig, RateLimitConfig, ResourceLimitsConfig,
    ResourceLimitsManager,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub const MB: u64 = 1024 * 1024;

/// Governor config with deterministic exponential backoff (100ms base, 3 retries)
pub fn governor_config(max_requests: u32, window_ms: u64, queuing: bool) -> GovernorConfig {
    GovernorConfig {
        rate_limit: RateLimitConfig::new(max_requests, window_ms).with_queuing(queuing),
        backoff: BackoffConfig::new(BackoffStrategy::Exponential, 100, 3).with_jitter(0.0),
        ..GovernorConfig::default()
    }
}

/// Memory sampler returning whatever the test stored last
#[derive(Debug, Default)]
pub struct FixedSampler(AtomicU64);

impl FixedSampler {
    pub fn new(bytes: u64) -> Arc<Self> {
        Arc::new(Self(AtomicU64::new(bytes)))
    }

    pub fn set(&self, bytes: u64) {
        self.0.store(bytes, Ordering::SeqCst);
    }
}

impl MemorySampler for FixedSampler {
    fn sample(&self) -> Option<u64> {
        Some(self.0.load(Ordering::SeqCst))
    }
}

/// Manager with the default budget table and a fixed memory reading
pub fn resource_manager(memory: u64) -> (Arc<ResourceLimitsManager>, Arc<FixedSampler>) {
    let sampler = FixedSampler::new(memory);
    let manager =
        ResourceLimitsManager::with_sampler(ResourceLimitsConfig::default(), sampler.clone())
            .expect("default resource config is valid");
    (Arc::new(manager), sampler)
}
