//! Configuration loading integration tests
//!
//! Files on disk, the shipped example and environment overrides.

#[cfg(test)]
mod tests {
    use request_governor::utils::logging::LogFormat;
    use request_governor::{
        BackoffStrategy, DequeuePolicy, Governor, GovernorConfig, GovernorError,
        RateLimitAlgorithm, ResourceType,
    };
    use std::collections::HashMap;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    /// The example shipped in `config/` must stay loadable
    #[tokio::test]
    async fn test_example_config_loads() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/governor.yaml.example");
        let config = GovernorConfig::from_file(&path).await.unwrap();

        assert_eq!(config.rate_limit.algorithm, RateLimitAlgorithm::TokenBucket);
        assert_eq!(config.rate_limit.burst_allowance, 10);
        assert_eq!(config.rate_limit.dequeue_policy, DequeuePolicy::Admit);
        assert_eq!(config.retry.retryable_patterns.len(), 2);
        assert_eq!(config.resources.limits.len(), ResourceType::ALL.len());
        assert_eq!(config.logging.format, LogFormat::Pretty);

        assert!(Governor::new(&config).is_ok());
    }

    #[tokio::test]
    async fn test_partial_file_keeps_defaults() {
        let file = write_config(
            "rate_limit:\n  max_requests: 5\n  window_ms: 1000\n  algorithm: sliding-window\n\
             backoff:\n  strategy: fibonacci\n",
        );
        let config = GovernorConfig::from_file(file.path()).await.unwrap();

        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.algorithm, RateLimitAlgorithm::SlidingWindow);
        assert!(config.rate_limit.enable_queuing);
        assert_eq!(config.backoff.strategy, BackoffStrategy::Fibonacci);
        assert_eq!(config.backoff.max_retries, 3);
        assert_eq!(config.resources, GovernorConfig::default().resources);
    }

    #[tokio::test]
    async fn test_invalid_file_is_rejected() {
        let file = write_config("rate_limit:\n  max_requests: 0\n");
        match GovernorConfig::from_file(file.path()).await {
            Err(GovernorError::Config(message)) => assert!(message.contains("Rate limit")),
            other => panic!("unexpected result: {:?}", other),
        }

        let file = write_config("backoff:\n  jitter: 1.5\n");
        assert!(GovernorConfig::from_file(file.path()).await.is_err());

        let file = write_config("retry:\n  retryable_patterns: ['(unclosed']\n");
        assert!(GovernorConfig::from_file(file.path()).await.is_err());

        assert!(
            GovernorConfig::from_file("/nonexistent/governor.yaml")
                .await
                .is_err()
        );
    }

    #[test]
    fn test_environment_overrides() {
        let vars: HashMap<&str, &str> = [
            ("GOVERNOR_MAX_REQUESTS", "20"),
            ("GOVERNOR_ALGORITHM", "leaky_bucket"),
            ("GOVERNOR_ENABLE_QUEUING", "false"),
            ("GOVERNOR_BACKOFF_STRATEGY", "linear"),
            ("GOVERNOR_JITTER", "0"),
            ("GOVERNOR_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = GovernorConfig::default();
        config
            .apply_overrides_from(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.rate_limit.max_requests, 20);
        assert_eq!(config.rate_limit.algorithm, RateLimitAlgorithm::LeakyBucket);
        assert!(!config.rate_limit.enable_queuing);
        assert_eq!(config.backoff.strategy, BackoffStrategy::Linear);
        assert_eq!(config.backoff.jitter, 0.0);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.validate().is_ok());

        let mut config = GovernorConfig::default();
        let result = config.apply_overrides_from(|name| {
            (name == "GOVERNOR_WINDOW_MS").then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let mut config = GovernorConfig::default();
        config.rate_limit.dequeue_policy = DequeuePolicy::Recheck;
        config.backoff.strategy = BackoffStrategy::Fibonacci;

        let yaml = config.to_yaml().unwrap();
        assert_eq!(GovernorConfig::from_yaml_str(&yaml).unwrap(), config);

        let json = config.to_json().unwrap();
        assert!(json.contains("\"recheck\""));
    }
}
