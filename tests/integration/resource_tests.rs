//! Resource budget integration tests

#[cfg(test)]
mod tests {
    use crate::common::{MB, resource_manager};
    use request_governor::core::resources::ViolationSeverity;
    use request_governor::{
        GovernorError, ResourceEvent, ResourceLimit, ResourceType, ResourceUnit, SecurityContext,
    };
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    // ==================== Validator Tests ====================

    /// FileSize(100MB, soft 80MB): 90MB passes with a warning, 150MB fails
    #[test]
    fn test_file_size_soft_and_hard_limits() {
        let (manager, _) = resource_manager(0);

        let outcome = manager.validate_file_size(90 * MB);
        assert!(outcome.valid);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("90.0 MB"));
        assert!(outcome.warnings[0].contains("80.0 MB"));

        let violations = manager.violations(None);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, ViolationSeverity::Warning);

        let outcome = manager.validate_file_size(150 * MB);
        assert!(!outcome.valid);
        assert!(outcome.errors[0].contains("150.0 MB"));
        assert!(outcome.errors[0].contains("100.0 MB"));

        match outcome.into_result() {
            Err(GovernorError::ResourceLimitExceeded { resource, .. }) => {
                assert_eq!(resource, ResourceType::FileSize)
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_memory_validation_uses_sampled_usage() {
        let (manager, _) = resource_manager(500 * MB);
        assert!(manager.monitor_tick().memory_sampled);

        assert!(manager.validate_memory_usage(10 * MB).valid);

        let outcome = manager.validate_memory_usage(20 * MB);
        assert!(!outcome.valid);
        assert!(outcome.errors[0].contains("520.0 MB"));
    }

    #[test]
    fn test_security_constraints() {
        let (manager, _) = resource_manager(0);

        let context = SecurityContext::new()
            .with_filename("meeting-notes.md")
            .with_mime_type("text/markdown")
            .with_url("https://notes.example.com/api/v1/notes");
        let outcome = manager.validate_security_constraints(&context);
        assert!(outcome.valid);
        assert!(outcome.warnings.is_empty());

        let outcome = manager
            .validate_security_constraints(&SecurityContext::new().with_filename("../secrets"));
        assert!(!outcome.valid);

        let outcome = manager.validate_security_constraints(
            &SecurityContext::new()
                .with_filename("install.sh")
                .with_url("http://192.168.1.10/upload"),
        );
        assert!(outcome.valid);
        assert_eq!(outcome.warnings.len(), 2);

        let outcome = manager.validate_security_constraints(
            &SecurityContext::new().with_url("ftp://notes.example.com/dump"),
        );
        assert!(matches!(
            outcome.into_result(),
            Err(GovernorError::SecurityValidationFailed(_))
        ));
    }

    // ==================== Enforcement Tests ====================

    #[test]
    fn test_guards_enforce_connection_limit() {
        let (manager, _) = resource_manager(0);
        manager
            .set_limit(ResourceLimit::new(
                ResourceType::ConcurrentConnections,
                2,
                ResourceUnit::Count,
            ))
            .unwrap();

        let first = manager
            .try_acquire(ResourceType::ConcurrentConnections, 1)
            .unwrap();
        let _second = manager
            .try_acquire(ResourceType::ConcurrentConnections, 1)
            .unwrap();
        assert!(
            manager
                .try_acquire(ResourceType::ConcurrentConnections, 1)
                .is_err()
        );

        drop(first);
        assert!(
            manager
                .try_acquire(ResourceType::ConcurrentConnections, 1)
                .is_ok()
        );
    }

    #[test]
    fn test_unenforced_limit_never_blocks() {
        let (manager, _) = resource_manager(0);
        manager
            .set_limit(
                ResourceLimit::new(ResourceType::CacheSize, 10, ResourceUnit::Count).unenforced(),
            )
            .unwrap();

        let result = manager.check_resource_usage(ResourceType::CacheSize, 20);
        assert!(result.allowed);
        assert!(result.violation.is_none());
        assert!(manager.violations(None).is_empty());
    }

    #[test]
    fn test_violation_callbacks_and_summary() {
        let (manager, _) = resource_manager(0);
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        manager.on_resource_violation(ResourceType::FileSize, move |event| {
            if matches!(event, ResourceEvent::Violation(_)) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        manager.validate_file_size(90 * MB);
        manager.validate_file_size(150 * MB);
        manager.validate_file_size(MB);
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        let summary = manager.summary();
        assert_eq!(summary.total_violations, 2);
        assert_eq!(summary.warning_violations, 1);
        assert_eq!(summary.critical_violations, 1);
        assert_eq!(summary.resources.len(), ResourceType::ALL.len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_processing_time_limit() {
        let (manager, _) = resource_manager(0);

        let result: Result<(), GovernorError> = manager
            .with_processing_time_limit(
                async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    Ok(())
                },
                Some(Duration::from_secs(1)),
            )
            .await;
        assert!(matches!(result, Err(GovernorError::OperationTimeout { .. })));

        let violations = manager.violations(Some(1));
        assert_eq!(violations[0].resource_type, ResourceType::ProcessingTime);
        assert_eq!(violations[0].severity, ViolationSeverity::Critical);
        assert_eq!(
            manager.usage(ResourceType::ProcessingTime).unwrap().current,
            1000
        );
    }

    // ==================== Monitor Tests ====================

    #[tokio::test(start_paused = true)]
    async fn test_monitor_samples_and_reports_limit() {
        let (manager, sampler) = resource_manager(100 * MB);
        let at_limit = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&at_limit);
        manager.on_resource_violation(ResourceType::Memory, move |event| {
            if matches!(event, ResourceEvent::AtLimit(_)) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        manager.start_monitoring().unwrap();
        assert!(manager.is_monitoring());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(manager.usage(ResourceType::Memory).unwrap().current, 100 * MB);
        assert_eq!(at_limit.load(Ordering::SeqCst), 0);

        sampler.set(600 * MB);
        tokio::time::sleep(Duration::from_secs(5)).await;
        let usage = manager.usage(ResourceType::Memory).unwrap();
        assert_eq!(usage.current, 600 * MB);
        assert!(usage.is_at_limit);
        assert_eq!(at_limit.load(Ordering::SeqCst), 1);

        manager.stop_monitoring().await;
        assert!(!manager.is_monitoring());
    }
}
