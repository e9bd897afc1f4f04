//! Limiter integration tests through `build_limiter`

#[cfg(test)]
mod tests {
    use request_governor::{RateLimitAlgorithm, RateLimitConfig, build_limiter};
    use std::time::Duration;

    const ALGORITHMS: [RateLimitAlgorithm; 4] = [
        RateLimitAlgorithm::TokenBucket,
        RateLimitAlgorithm::SlidingWindow,
        RateLimitAlgorithm::FixedWindow,
        RateLimitAlgorithm::LeakyBucket,
    ];

    /// Five allowed, the sixth denied with nothing remaining
    #[tokio::test(start_paused = true)]
    async fn test_budget_enforced_by_every_algorithm() {
        for algorithm in ALGORITHMS {
            let limiter =
                build_limiter(&RateLimitConfig::new(5, 1000).with_algorithm(algorithm)).unwrap();
            assert_eq!(limiter.algorithm(), algorithm);

            for _ in 0..5 {
                assert!(limiter.is_allowed().allowed, "{} denied early", algorithm);
            }
            let denied = limiter.is_allowed();
            assert!(!denied.allowed, "{} allowed a sixth request", algorithm);
            assert_eq!(denied.remaining_requests, 0);
            assert_eq!(denied.limit, 5);
            assert!(denied.retry_after.is_some());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_returns_after_window() {
        for algorithm in ALGORITHMS {
            let limiter =
                build_limiter(&RateLimitConfig::new(3, 1000).with_algorithm(algorithm)).unwrap();
            for _ in 0..3 {
                limiter.is_allowed();
            }
            assert!(!limiter.is_allowed().allowed);

            tokio::time::advance(Duration::from_millis(2000)).await;
            assert!(limiter.is_allowed().allowed, "{} did not recover", algorithm);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_restores_budget() {
        for algorithm in ALGORITHMS {
            let limiter =
                build_limiter(&RateLimitConfig::new(1, 60_000).with_algorithm(algorithm)).unwrap();
            assert!(limiter.is_allowed().allowed);
            assert!(!limiter.is_allowed().allowed);

            limiter.reset();
            assert!(limiter.is_allowed().allowed, "{} reset failed", algorithm);
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(build_limiter(&RateLimitConfig::new(0, 1000)).is_err());
        assert!(build_limiter(&RateLimitConfig::new(10, 0)).is_err());
    }
}
