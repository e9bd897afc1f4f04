//! Governor metrics recording

use super::types::PerformanceMetrics;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct ResponseTimes {
    samples: u64,
    average_ms: f64,
}

#[derive(Debug)]
pub(super) struct MetricsRecorder {
    total: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    rate_limited: AtomicU64,
    queued: AtomicU64,
    retried: AtomicU64,
    response: Mutex<ResponseTimes>,
    epoch: Mutex<Instant>,
}

impl MetricsRecorder {
    pub(super) fn new() -> Self {
        Self {
            total: AtomicU64::new(0),
            successful: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            rate_limited: AtomicU64::new(0),
            queued: AtomicU64::new(0),
            retried: AtomicU64::new(0),
            response: Mutex::new(ResponseTimes::default()),
            epoch: Mutex::new(Instant::now()),
        }
    }

    pub(super) fn record_request(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn record_success(&self) {
        self.successful.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn record_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn record_queued(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn record_retry(&self) {
        self.retried.fetch_add(1, Ordering::Relaxed);
    }

    /// Fold one execution time into the running mean
    pub(super) fn record_response_time(&self, elapsed: Duration) {
        let mut response = self.response.lock();
        response.samples += 1;
        let sample = elapsed.as_secs_f64() * 1000.0;
        response.average_ms += (sample - response.average_ms) / response.samples as f64;
    }

    pub(super) fn snapshot(&self) -> PerformanceMetrics {
        let total = self.total.load(Ordering::Relaxed);
        let successful = self.successful.load(Ordering::Relaxed);
        let uptime = self.epoch.lock().elapsed();
        let elapsed_secs = uptime.as_secs_f64();

        PerformanceMetrics {
            total_requests: total,
            successful_requests: successful,
            failed_requests: self.failed.load(Ordering::Relaxed),
            rate_limited_requests: self.rate_limited.load(Ordering::Relaxed),
            queued_requests: self.queued.load(Ordering::Relaxed),
            retried_requests: self.retried.load(Ordering::Relaxed),
            average_response_time_ms: self.response.lock().average_ms,
            throughput: if elapsed_secs > 0.0 {
                successful as f64 / elapsed_secs
            } else {
                0.0
            },
            error_rate: if total == 0 {
                0.0
            } else {
                total.saturating_sub(successful) as f64 / total as f64
            },
            uptime_ms: uptime.as_millis() as u64,
        }
    }

    /// Zero every counter and start a new epoch
    pub(super) fn reset(&self) {
        for counter in [
            &self.total,
            &self.successful,
            &self.failed,
            &self.rate_limited,
            &self.queued,
            &self.retried,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        *self.response.lock() = ResponseTimes::default();
        *self.epoch.lock() = Instant::now();
    }
}
