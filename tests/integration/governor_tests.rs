//! Governor integration tests
//!
//! Drive `execute_request` through admission, queuing, retry and resource
//! accounting with tokio's paused clock.

#[cfg(test)]
mod tests {
    use crate::common::{governor_config, resource_manager};
    use request_governor::{
        DequeuePolicy, Governor, GovernorError, RequestMetadata, ResourceType,
    };
    use std::fmt;
    use std::io;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Application error carried through the governor untouched
    #[derive(Debug)]
    enum ApiError {
        Governor(GovernorError),
        NotFound(String),
        Unavailable,
    }

    impl fmt::Display for ApiError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                ApiError::Governor(e) => write!(f, "{}", e),
                ApiError::NotFound(path) => write!(f, "{} not found (404)", path),
                ApiError::Unavailable => write!(f, "service unavailable (503)"),
            }
        }
    }

    impl From<GovernorError> for ApiError {
        fn from(error: GovernorError) -> Self {
            ApiError::Governor(error)
        }
    }

    async fn wait_for_queue(governor: &Governor, length: usize) {
        while governor.status().queue_length < length {
            tokio::task::yield_now().await;
        }
    }

    // ==================== Retry Tests ====================

    /// Work failing twice with ECONNRESET succeeds on the third attempt
    #[tokio::test(start_paused = true)]
    async fn test_connection_reset_retried_to_success() {
        let governor = Governor::new(&governor_config(100, 60_000, true)).unwrap();
        let attempts = AtomicU32::new(0);

        let result: Result<&str, GovernorError> = governor
            .execute_request(
                || async {
                    if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(GovernorError::Io(io::Error::new(
                            io::ErrorKind::ConnectionReset,
                            "ECONNRESET",
                        )))
                    } else {
                        Ok("created")
                    }
                },
                None,
            )
            .await;

        assert_eq!(result.unwrap(), "created");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);

        let metrics = governor.metrics();
        assert_eq!(metrics.total_requests, 1);
        assert_eq!(metrics.successful_requests, 1);
        assert_eq!(metrics.failed_requests, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_application_errors_pass_through() {
        let governor = Governor::new(&governor_config(100, 60_000, true)).unwrap();

        let result: Result<(), ApiError> = governor
            .execute_request(
                || async { Err(ApiError::NotFound("/notes/42".to_string())) },
                None,
            )
            .await;
        assert!(matches!(result, Err(ApiError::NotFound(path)) if path == "/notes/42"));

        let attempts = AtomicU32::new(0);
        let result: Result<(), ApiError> = governor
            .execute_request(
                || async {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(ApiError::Unavailable)
                },
                None,
            )
            .await;
        assert!(matches!(result, Err(ApiError::Unavailable)));
        assert_eq!(attempts.load(Ordering::SeqCst), 4);

        let metrics = governor.metrics();
        assert_eq!(metrics.failed_requests, 2);
        assert_eq!(metrics.retried_requests, 3);
        assert_eq!(metrics.error_rate, 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_governor_errors_convert_into_application_error() {
        let mut config = governor_config(1, 60_000, false);
        config.backoff.max_retries = 0;
        let governor = Governor::new(&config).unwrap();

        let _: Result<(), ApiError> = governor.execute_request(|| async { Ok(()) }, None).await;
        let result: Result<(), ApiError> =
            governor.execute_request(|| async { Ok(()) }, None).await;

        assert!(matches!(
            result,
            Err(ApiError::Governor(GovernorError::MaxRetriesExceeded { attempts: 1 }))
        ));
    }

    // ==================== Queue Tests ====================

    #[tokio::test(start_paused = true)]
    async fn test_burst_is_queued_and_drained() {
        let governor = Arc::new(Governor::new(&governor_config(2, 1000, true)).unwrap());

        let handles: Vec<_> = (0..5)
            .map(|i| {
                let governor = Arc::clone(&governor);
                tokio::spawn(async move {
                    governor
                        .execute_request(|| async move { Ok::<_, GovernorError>(i) }, None)
                        .await
                })
            })
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().unwrap());
        }
        results.sort_unstable();
        assert_eq!(results, vec![0, 1, 2, 3, 4]);

        let metrics = governor.metrics();
        assert_eq!(metrics.total_requests, 5);
        assert_eq!(metrics.successful_requests, 5);
        assert_eq!(metrics.rate_limited_requests, 3);
        assert_eq!(metrics.queued_requests, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_full_rejects_synchronously() {
        let mut config = governor_config(1, 60_000, true);
        config.rate_limit.dequeue_policy = DequeuePolicy::Recheck;
        config.rate_limit.max_queue_size = 1;
        let governor = Arc::new(Governor::new(&config).unwrap());

        let _: Result<(), GovernorError> = governor.execute_request(|| async { Ok(()) }, None).await;

        let waiting = Arc::clone(&governor);
        let handle = tokio::spawn(async move {
            waiting
                .execute_request(|| async { Ok::<_, GovernorError>(()) }, None)
                .await
        });
        wait_for_queue(&governor, 1).await;

        let result: Result<(), GovernorError> =
            governor.execute_request(|| async { Ok(()) }, None).await;
        assert!(matches!(result, Err(GovernorError::QueueFull { capacity: 1 })));

        governor.dispose();
        assert!(matches!(
            handle.await.unwrap(),
            Err(GovernorError::Shutdown(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_timeout() {
        let mut config = governor_config(1, 60_000, true);
        config.rate_limit.dequeue_policy = DequeuePolicy::Recheck;
        config.rate_limit.queue_timeout_ms = 500;
        let governor = Governor::new(&config).unwrap();

        let _: Result<(), GovernorError> = governor.execute_request(|| async { Ok(()) }, None).await;

        let start = tokio::time::Instant::now();
        let result: Result<(), GovernorError> =
            governor.execute_request(|| async { Ok(()) }, None).await;

        assert!(matches!(result, Err(GovernorError::QueueTimeout { .. })));
        assert_eq!(start.elapsed(), Duration::from_millis(500));
        assert_eq!(governor.status().queue_length, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recheck_waits_for_window() {
        let mut config = governor_config(1, 1000, true);
        config.rate_limit.dequeue_policy = DequeuePolicy::Recheck;
        let governor = Governor::new(&config).unwrap();

        let _: Result<(), GovernorError> = governor.execute_request(|| async { Ok(()) }, None).await;

        let start = tokio::time::Instant::now();
        let metadata = RequestMetadata::new().with_priority(2);
        let result: Result<(), GovernorError> = governor
            .execute_request(|| async { Ok(()) }, Some(metadata))
            .await;

        assert!(result.is_ok());
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    // ==================== Resource Tests ====================

    #[tokio::test(start_paused = true)]
    async fn test_queue_depth_mirrored_into_resources() {
        let (resources, _) = resource_manager(0);
        let mut config = governor_config(1, 60_000, true);
        config.rate_limit.dequeue_policy = DequeuePolicy::Recheck;
        let governor = Arc::new(
            Governor::builder()
                .with_config(config)
                .with_resource_manager(Arc::clone(&resources))
                .build()
                .unwrap(),
        );

        let _: Result<(), GovernorError> = governor.execute_request(|| async { Ok(()) }, None).await;

        let waiting = Arc::clone(&governor);
        let handle = tokio::spawn(async move {
            waiting
                .execute_request(|| async { Ok::<_, GovernorError>(()) }, None)
                .await
        });
        wait_for_queue(&governor, 1).await;
        while resources.usage(ResourceType::QueueSize).unwrap().current == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(resources.usage(ResourceType::QueueSize).unwrap().current, 1);

        governor.dispose();
        let _ = handle.await.unwrap();
        assert_eq!(resources.usage(ResourceType::QueueSize).unwrap().current, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_connections_tracked() {
        let (resources, _) = resource_manager(0);
        let governor = Arc::new(
            Governor::builder()
                .with_config(governor_config(100, 1000, true))
                .with_resource_manager(Arc::clone(&resources))
                .build()
                .unwrap(),
        );

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let governor = Arc::clone(&governor);
                tokio::spawn(async move {
                    governor
                        .execute_request(
                            || async {
                                tokio::time::sleep(Duration::from_millis(100)).await;
                                Ok::<_, GovernorError>(())
                            },
                            None,
                        )
                        .await
                })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(
            resources.usage(ResourceType::ConcurrentConnections).unwrap().current,
            3
        );

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        let usage = resources.usage(ResourceType::ConcurrentConnections).unwrap();
        assert_eq!(usage.current, 0);
        assert_eq!(usage.peak, 3);
    }
}
