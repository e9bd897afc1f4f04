//! Resource limits manager

use super::monitor::MonitorHandle;
use super::types::*;
use crate::config::Validate;
use crate::config::models::{ResourceLimit, ResourceLimitsConfig, ResourceType};
use crate::monitoring::{BoundedPush, MemorySampler, ProcessMemorySampler};
use crate::utils::error::{GovernorError, Result};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// Share of the limit a single update must move to count as a spike
const SPIKE_FRACTION: f64 = 0.1;

/// Tracks and enforces budgets for non-rate resources
pub struct ResourceLimitsManager {
    pub(super) settings: ResourceLimitsConfig,
    limits: RwLock<HashMap<ResourceType, ResourceLimit>>,
    usage: RwLock<HashMap<ResourceType, ResourceUsage>>,
    violations: Mutex<VecDeque<ResourceViolation>>,
    callbacks: RwLock<HashMap<ResourceType, Vec<ResourceCallback>>>,
    pub(super) sampler: Arc<dyn MemorySampler>,
    pub(super) monitor: Mutex<Option<MonitorHandle>>,
}

impl std::fmt::Debug for ResourceLimitsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLimitsManager")
            .field("limits", &*self.limits.read())
            .field("violations", &self.violations.lock().len())
            .field("monitoring", &self.is_monitoring())
            .finish()
    }
}

impl ResourceLimitsManager {
    /// Create a manager sampling this process's memory
    pub fn new(config: ResourceLimitsConfig) -> Result<Self> {
        Self::with_sampler(config, Arc::new(ProcessMemorySampler::new()))
    }

    /// Create a manager with a custom memory sampler
    pub fn with_sampler(
        config: ResourceLimitsConfig,
        sampler: Arc<dyn MemorySampler>,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| GovernorError::Config(format!("Resource config error: {}", e)))?;

        let limits: HashMap<_, _> = config
            .effective_limits()
            .into_iter()
            .map(|limit| (limit.resource_type, limit))
            .collect();
        let usage = ResourceType::ALL
            .iter()
            .map(|&resource_type| {
                let mut usage = ResourceUsage::empty(resource_type);
                usage.refresh_thresholds(limits.get(&resource_type));
                (resource_type, usage)
            })
            .collect();

        Ok(Self {
            settings: config,
            limits: RwLock::new(limits),
            usage: RwLock::new(usage),
            violations: Mutex::new(VecDeque::new()),
            callbacks: RwLock::new(HashMap::new()),
            sampler,
            monitor: Mutex::new(None),
        })
    }

    // ==================== Limits ====================

    /// Replace the budget for one resource type
    pub fn set_limit(&self, limit: ResourceLimit) -> Result<()> {
        limit
            .validate()
            .map_err(|e| GovernorError::Config(format!("Resource limit error: {}", e)))?;

        let resource_type = limit.resource_type;
        let mut limits = self.limits.write();
        let mut usage = self.usage.write();
        if let Some(entry) = usage.get_mut(&resource_type) {
            entry.refresh_thresholds(Some(&limit));
        }
        limits.insert(resource_type, limit);
        debug!("Updated {} limit", resource_type);
        Ok(())
    }

    pub fn limit(&self, resource_type: ResourceType) -> Option<ResourceLimit> {
        self.limits.read().get(&resource_type).cloned()
    }

    // ==================== Checks ====================

    /// Check whether `requested` more units fit; records any violation
    pub fn check_resource_usage(
        &self,
        resource_type: ResourceType,
        requested: u64,
    ) -> ResourceCheckResult {
        let limit = self.limit(resource_type);
        let current = self.current(resource_type);
        let (result, violation) = evaluate(limit.as_ref(), resource_type, current, requested);
        if let Some(violation) = violation {
            self.record_violation(violation);
        }
        result
    }

    fn current(&self, resource_type: ResourceType) -> u64 {
        self.usage
            .read()
            .get(&resource_type)
            .map_or(0, |usage| usage.current)
    }

    /// Atomically check and add `amount`; the guard gives it back on drop
    pub fn try_acquire(
        self: &Arc<Self>,
        resource_type: ResourceType,
        amount: u64,
    ) -> Result<ResourceGuard> {
        let (result, violation, spike) = {
            let limits = self.limits.read();
            let limit = limits.get(&resource_type);
            let mut usage = self.usage.write();
            let entry = usage
                .entry(resource_type)
                .or_insert_with(|| ResourceUsage::empty(resource_type));

            let (result, violation) = evaluate(limit, resource_type, entry.current, amount);
            let spike = if result.allowed {
                let target = entry.current.saturating_add(amount);
                let previous = entry.record(target, limit);
                is_spike(limit, previous, target).then(|| entry.clone())
            } else {
                None
            };
            (result, violation, spike)
        };

        if let Some(violation) = violation {
            self.record_violation(violation);
        }
        if let Some(usage) = spike {
            self.fire(&ResourceEvent::UsageSpike(usage));
        }

        if !result.allowed {
            let message = result
                .violation
                .as_ref()
                .map_or_else(|| format!("{} limit reached", resource_type), |v| v.message.clone());
            return Err(GovernorError::resource_limit(resource_type, message));
        }

        Ok(ResourceGuard {
            manager: Arc::clone(self),
            resource_type,
            amount,
        })
    }

    fn release(&self, resource_type: ResourceType, amount: u64) {
        let limits = self.limits.read();
        let mut usage = self.usage.write();
        if let Some(entry) = usage.get_mut(&resource_type) {
            let target = entry.current.saturating_sub(amount);
            entry.record(target, limits.get(&resource_type));
        }
    }

    // ==================== Usage ====================

    /// Set the current usage of one resource type
    pub fn update_resource_usage(&self, resource_type: ResourceType, amount: u64) {
        let spike = {
            let limits = self.limits.read();
            let limit = limits.get(&resource_type);
            let mut usage = self.usage.write();
            let entry = usage
                .entry(resource_type)
                .or_insert_with(|| ResourceUsage::empty(resource_type));
            let previous = entry.record(amount, limit);
            is_spike(limit, previous, amount).then(|| entry.clone())
        };

        if let Some(usage) = spike {
            debug!(
                "{} usage spiked to {} ({:.1}%)",
                resource_type, usage.current, usage.utilization_percentage
            );
            self.fire(&ResourceEvent::UsageSpike(usage));
        }
    }

    pub fn usage(&self, resource_type: ResourceType) -> Option<ResourceUsage> {
        self.usage.read().get(&resource_type).cloned()
    }

    /// Usage of every tracked type, ordered by type
    pub fn all_usage(&self) -> Vec<ResourceUsage> {
        let mut all: Vec<_> = self.usage.read().values().cloned().collect();
        all.sort_by_key(|usage| usage.resource_type);
        all
    }

    /// Zero one type, or every type when `None`
    pub fn reset_usage(&self, resource_type: Option<ResourceType>) {
        let limits = self.limits.read();
        let mut usage = self.usage.write();
        for (kind, entry) in usage.iter_mut() {
            if resource_type.is_none_or(|wanted| wanted == *kind) {
                *entry = ResourceUsage::empty(*kind);
                entry.refresh_thresholds(limits.get(kind));
            }
        }
    }

    /// Run `operation` with a deadline, recording its elapsed time as ProcessingTime
    ///
    /// Without an explicit `timeout` the ProcessingTime hard limit is used.
    pub async fn with_processing_time_limit<F, T, E>(
        &self,
        operation: F,
        timeout: Option<Duration>,
    ) -> std::result::Result<T, E>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: From<GovernorError>,
    {
        let timeout = timeout
            .or_else(|| {
                self.limit(ResourceType::ProcessingTime)
                    .map(|limit| Duration::from_millis(limit.limit))
            })
            .unwrap_or(Duration::MAX);

        let started = Instant::now();
        let outcome = tokio::time::timeout(timeout, operation).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        self.update_resource_usage(ResourceType::ProcessingTime, elapsed_ms);

        match outcome {
            Ok(result) => result,
            Err(_) => {
                let limit_ms = timeout.as_millis() as u64;
                self.record_violation(ResourceViolation {
                    resource_type: ResourceType::ProcessingTime,
                    current: elapsed_ms,
                    limit: limit_ms,
                    severity: ViolationSeverity::Critical,
                    action: ViolationAction::Reject,
                    message: format!("Operation exceeded time limit of {}ms", limit_ms),
                    timestamp: Utc::now(),
                });
                Err(GovernorError::OperationTimeout { timeout }.into())
            }
        }
    }

    // ==================== Violations ====================

    pub(super) fn record_violation(&self, violation: ResourceViolation) {
        match violation.severity {
            ViolationSeverity::Warning => warn!(
                resource = %violation.resource_type,
                "Soft limit exceeded: {}",
                violation.message
            ),
            ViolationSeverity::Critical => error!(
                resource = %violation.resource_type,
                action = ?violation.action,
                "Hard limit exceeded: {}",
                violation.message
            ),
        }

        self.violations
            .lock()
            .push_bounded(violation.clone(), self.settings.max_violations);
        self.fire(&ResourceEvent::Violation(violation));
    }

    /// Recorded violations, oldest first; `limit` keeps only the most recent ones
    pub fn violations(&self, limit: Option<usize>) -> Vec<ResourceViolation> {
        let violations = self.violations.lock();
        let skip = limit.map_or(0, |limit| violations.len().saturating_sub(limit));
        violations.iter().skip(skip).cloned().collect()
    }

    pub fn clear_violations(&self) {
        self.violations.lock().clear();
    }

    /// Drop violations beyond the count cap or older than the retention window
    pub(super) fn prune_violations(&self) -> usize {
        let cutoff = chrono::Duration::from_std(self.settings.violation_retention())
            .ok()
            .and_then(|retention| Utc::now().checked_sub_signed(retention));

        let mut violations = self.violations.lock();
        let before = violations.len();
        if let Some(cutoff) = cutoff {
            violations.retain(|violation| violation.timestamp > cutoff);
        }
        while violations.len() > self.settings.max_violations {
            violations.pop_front();
        }
        before - violations.len()
    }

    /// Reset peaks of entries that have not been updated recently
    pub(super) fn reset_stale_peaks(&self) -> usize {
        let Ok(stale_after) = chrono::Duration::from_std(self.settings.stale_peak_after()) else {
            return 0;
        };
        let now = Utc::now();

        let mut reset = 0;
        for entry in self.usage.write().values_mut() {
            if now - entry.last_updated >= stale_after && entry.peak != entry.current {
                entry.peak = entry.current;
                reset += 1;
            }
        }
        reset
    }

    /// Snapshots of monitored entries currently at or above their hard limit
    pub(super) fn entries_at_limit(&self) -> Vec<ResourceUsage> {
        let limits = self.limits.read();
        let mut usage = self.usage.write();
        usage
            .values_mut()
            .filter_map(|entry| {
                let limit = limits.get(&entry.resource_type);
                entry.refresh_thresholds(limit);
                let monitored = limit.is_none_or(|limit| limit.monitoring);
                (monitored && entry.is_at_limit).then(|| entry.clone())
            })
            .collect()
    }

    /// Whether the periodic monitor should look at `resource_type`
    pub(super) fn is_monitored(&self, resource_type: ResourceType) -> bool {
        self.limits
            .read()
            .get(&resource_type)
            .is_none_or(|limit| limit.monitoring)
    }

    // ==================== Callbacks ====================

    /// Register a callback for events concerning `resource_type`
    pub fn on_resource_violation<F>(&self, resource_type: ResourceType, callback: F)
    where
        F: Fn(&ResourceEvent) + Send + Sync + 'static,
    {
        self.callbacks
            .write()
            .entry(resource_type)
            .or_default()
            .push(Arc::new(callback));
    }

    pub(super) fn fire(&self, event: &ResourceEvent) {
        let callbacks: Vec<ResourceCallback> = self
            .callbacks
            .read()
            .get(&event.resource_type())
            .cloned()
            .unwrap_or_default();

        for callback in callbacks {
            callback(event);
        }
    }

    // ==================== Summary ====================

    pub fn summary(&self) -> ResourceSummary {
        let limits = self.limits.read().clone();
        let resources = self
            .all_usage()
            .into_iter()
            .map(|usage| {
                let limit = limits.get(&usage.resource_type);
                ResourceStatus {
                    resource_type: usage.resource_type,
                    current: usage.current,
                    peak: usage.peak,
                    limit: limit.map(|l| l.limit),
                    soft_limit: limit.and_then(|l| l.soft_limit),
                    utilization_percentage: usage.utilization_percentage,
                    is_at_limit: usage.is_at_limit,
                    is_at_soft_limit: usage.is_at_soft_limit,
                }
            })
            .collect();

        let violations = self.violations.lock();
        let critical_violations = violations
            .iter()
            .filter(|v| v.severity == ViolationSeverity::Critical)
            .count();

        ResourceSummary {
            resources,
            total_violations: violations.len(),
            warning_violations: violations.len() - critical_violations,
            critical_violations,
        }
    }
}

/// Decide a check against `limit` without touching shared state
fn evaluate(
    limit: Option<&ResourceLimit>,
    resource_type: ResourceType,
    current: u64,
    requested: u64,
) -> (ResourceCheckResult, Option<ResourceViolation>) {
    let Some(limit) = limit else {
        return (
            ResourceCheckResult {
                allowed: true,
                violation: None,
                current_usage: current,
                available_amount: u64::MAX,
            },
            None,
        );
    };

    let new_total = current.saturating_add(requested);
    let mut result = ResourceCheckResult {
        allowed: true,
        violation: None,
        current_usage: current,
        available_amount: limit.limit.saturating_sub(current),
    };

    if !limit.enforced {
        return (result, None);
    }

    let violation = if new_total > limit.limit {
        let overshoot = (new_total - limit.limit) as f64 / limit.limit as f64;
        result.allowed = false;
        Some(ResourceViolation {
            resource_type,
            current: new_total,
            limit: limit.limit,
            severity: ViolationSeverity::Critical,
            action: ViolationAction::for_overshoot(overshoot),
            message: format!(
                "{} usage {} exceeds limit of {}",
                resource_type,
                limit.unit.format(new_total),
                limit.unit.format(limit.limit)
            ),
            timestamp: Utc::now(),
        })
    } else {
        limit.soft_limit.filter(|&soft| new_total > soft).map(|soft| ResourceViolation {
            resource_type,
            current: new_total,
            limit: soft,
            severity: ViolationSeverity::Warning,
            action: ViolationAction::Alert,
            message: format!(
                "{} usage {} exceeds soft limit of {}",
                resource_type,
                limit.unit.format(new_total),
                limit.unit.format(soft)
            ),
            timestamp: Utc::now(),
        })
    };

    result.violation = violation.clone();
    (result, violation)
}

/// Only rises count; releases and resets never spike
fn is_spike(limit: Option<&ResourceLimit>, previous: u64, current: u64) -> bool {
    limit.is_some_and(|limit| {
        current.saturating_sub(previous) as f64 > limit.limit as f64 * SPIKE_FRACTION
    })
}

/// Holds an acquired amount until dropped
#[derive(Debug)]
pub struct ResourceGuard {
    manager: Arc<ResourceLimitsManager>,
    resource_type: ResourceType,
    amount: u64,
}

impl ResourceGuard {
    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        self.manager.release(self.resource_type, self.amount);
    }
}
