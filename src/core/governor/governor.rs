//! Request governor implementation

use super::classifier::RetryClassifier;
use super::metrics::MetricsRecorder;
use super::types::{GovernorStatus, PerformanceMetrics};
use crate::config::models::RateLimitConfig;
use crate::core::backoff::BackoffCalculator;
use crate::core::queue::{RequestMetadata, RequestQueue};
use crate::core::rate_limiter::{AdmissionLimiter, RateLimitResult};
use crate::core::resources::{ResourceGuard, ResourceLimitsManager, ResourceType};
use crate::utils::error::{GovernorError, Result};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info};

/// Admission control, retry and metrics around every outbound call
#[derive(Debug)]
pub struct Governor {
    pub(super) rate_limit: RateLimitConfig,
    pub(super) limiter: Arc<dyn AdmissionLimiter>,
    pub(super) queue: RequestQueue,
    pub(super) backoff: BackoffCalculator,
    pub(super) classifier: Arc<dyn RetryClassifier>,
    pub(super) resources: Option<Arc<ResourceLimitsManager>>,
    pub(super) metrics: MetricsRecorder,
}

impl Governor {
    /// Run `work` under admission control, retrying retryable failures
    ///
    /// Errors from `work` are returned unchanged once retries are exhausted or
    /// the error is not retryable. A `GovernorError` returned by `work` is also
    /// judged by its own `is_retryable`, and its `retry_after` hint stretches
    /// the backoff delay.
    pub async fn execute_request<F, Fut, T, E>(
        &self,
        mut work: F,
        metadata: Option<RequestMetadata>,
    ) -> std::result::Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: From<GovernorError> + fmt::Display + 'static,
    {
        let mut metadata = metadata.unwrap_or_default();
        metadata.ensure_id();
        self.metrics.record_request();

        loop {
            if let Err(e) = self.admit(&mut metadata).await {
                self.metrics.record_failure();
                error!("Request {} failed admission: {}", metadata.id, e);
                return Err(e.into());
            }

            let guard = match self.acquire_connection() {
                Ok(guard) => guard,
                Err(e) => {
                    self.metrics.record_failure();
                    error!("Request {} refused: {}", metadata.id, e);
                    return Err(e.into());
                }
            };

            let started = Instant::now();
            let outcome = work().await;
            drop(guard);
            self.metrics.record_response_time(started.elapsed());

            let err = match outcome {
                Ok(value) => {
                    self.metrics.record_success();
                    debug!(
                        "Request {} succeeded after {} retries",
                        metadata.id, metadata.retry_count
                    );
                    return Ok(value);
                }
                Err(err) => err,
            };

            let message = err.to_string();
            let typed = (&err as &dyn Any).downcast_ref::<GovernorError>();
            let retryable = typed.is_some_and(GovernorError::is_retryable)
                || self.classifier.is_retryable(&message);
            if retryable && metadata.retry_count < self.backoff.max_retries() {
                let attempt = metadata.retry_count + 1;
                if let Some(delay) = self.backoff.calculate_delay(attempt) {
                    let delay = typed
                        .and_then(GovernorError::retry_after)
                        .map_or(delay, |hint| delay.max(hint));
                    debug!(
                        "Request {} failed with retryable error '{}', retry {} in {:?}",
                        metadata.id, message, attempt, delay
                    );
                    tokio::time::sleep(delay).await;
                    metadata.retry_count = attempt;
                    self.metrics.record_retry();
                    continue;
                }
            }

            self.metrics.record_failure();
            error!(
                "Request {} failed after {} retries: {}",
                metadata.id, metadata.retry_count, message
            );
            return Err(err);
        }
    }

    /// Consume one unit of the limiter without waiting
    ///
    /// A denial is reported as `RateLimitExceeded` carrying the limiter's hint.
    /// Nothing is queued and no backoff is applied.
    pub fn try_admit(&self) -> Result<RateLimitResult> {
        let decision = self.limiter.is_allowed();
        if decision.allowed {
            return Ok(decision);
        }

        self.metrics.record_rate_limited();
        let retry_after = decision.retry_after.unwrap_or(self.rate_limit.window());
        debug!("Admission denied, retry after {:?}", retry_after);
        Err(GovernorError::RateLimitExceeded { retry_after })
    }

    /// Wait until the limiter, the queue or the backoff budget lets the request through
    async fn admit(&self, metadata: &mut RequestMetadata) -> Result<()> {
        loop {
            let decision = self.limiter.is_allowed();
            if decision.allowed {
                return Ok(());
            }

            self.metrics.record_rate_limited();

            if self.rate_limit.enable_queuing {
                self.metrics.record_queued();
                return self.wait_in_queue(metadata).await;
            }

            let attempt = metadata.retry_count + 1;
            let Some(delay) = self.backoff.calculate_delay(attempt) else {
                return Err(GovernorError::MaxRetriesExceeded { attempts: attempt });
            };
            debug!(
                "Request {} rate limited, backing off {:?} (attempt {})",
                metadata.id, delay, attempt
            );
            tokio::time::sleep(delay).await;
            metadata.retry_count = attempt;
            self.metrics.record_retry();
        }
    }

    async fn wait_in_queue(&self, metadata: &RequestMetadata) -> Result<()> {
        let ticket = self.queue.enqueue(metadata.clone())?;
        self.mirror_queue_depth();

        let outcome = ticket.await;
        self.mirror_queue_depth();

        let status = outcome?;
        debug!(
            "Request {} admitted from queue after {:?}",
            status.request_id, status.queued_for
        );
        Ok(())
    }

    fn mirror_queue_depth(&self) {
        if let Some(resources) = &self.resources {
            resources.update_resource_usage(ResourceType::QueueSize, self.queue.len() as u64);
        }
    }

    fn acquire_connection(&self) -> Result<Option<ResourceGuard>> {
        self.resources
            .as_ref()
            .map(|resources| resources.try_acquire(ResourceType::ConcurrentConnections, 1))
            .transpose()
    }

    /// Current counters with derived throughput and error rate
    pub fn metrics(&self) -> PerformanceMetrics {
        self.metrics.snapshot()
    }

    /// Zero the counters and restart the measurement epoch
    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    pub fn status(&self) -> GovernorStatus {
        GovernorStatus {
            algorithm: self.limiter.algorithm(),
            queuing_enabled: self.rate_limit.enable_queuing,
            queue_length: self.queue.len(),
            queue_capacity: self.queue.capacity(),
            closed: self.queue.is_closed(),
        }
    }

    pub fn limiter(&self) -> &Arc<dyn AdmissionLimiter> {
        &self.limiter
    }

    pub fn backoff(&self) -> &BackoffCalculator {
        &self.backoff
    }

    pub fn resources(&self) -> Option<&Arc<ResourceLimitsManager>> {
        self.resources.as_ref()
    }

    /// Close the queue; waiting requests fail with `Shutdown`
    pub fn dispose(&self) {
        self.queue.close();
        self.mirror_queue_depth();
        info!("Governor disposed");
    }
}
