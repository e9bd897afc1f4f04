//! Resource tracking types

use crate::config::models::{ResourceLimit, ResourceType};
use crate::utils::error::{GovernorError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Live usage state of one resource type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub resource_type: ResourceType,
    pub current: u64,
    pub peak: u64,
    /// Exponential moving average, weight 1/10 on the newest sample
    pub average: f64,
    pub utilization_percentage: f64,
    pub is_at_limit: bool,
    pub is_at_soft_limit: bool,
    pub last_updated: DateTime<Utc>,
}

impl ResourceUsage {
    pub fn empty(resource_type: ResourceType) -> Self {
        Self {
            resource_type,
            current: 0,
            peak: 0,
            average: 0.0,
            utilization_percentage: 0.0,
            is_at_limit: false,
            is_at_soft_limit: false,
            last_updated: Utc::now(),
        }
    }

    /// Record a new sample; returns the previous value
    pub(super) fn record(&mut self, amount: u64, limit: Option<&ResourceLimit>) -> u64 {
        let previous = self.current;
        self.current = amount;
        self.peak = self.peak.max(amount);
        self.average = (self.average * 9.0 + amount as f64) / 10.0;
        self.last_updated = Utc::now();
        self.refresh_thresholds(limit);
        previous
    }

    /// Recompute utilization and threshold flags against `limit`
    pub(super) fn refresh_thresholds(&mut self, limit: Option<&ResourceLimit>) {
        match limit {
            Some(limit) => {
                self.utilization_percentage = if limit.limit == 0 {
                    0.0
                } else {
                    self.current as f64 / limit.limit as f64 * 100.0
                };
                self.is_at_limit = self.current >= limit.limit;
                self.is_at_soft_limit = limit.soft_limit.is_some_and(|soft| self.current >= soft);
            }
            None => {
                self.utilization_percentage = 0.0;
                self.is_at_limit = false;
                self.is_at_soft_limit = false;
            }
        }
    }
}

/// How serious a recorded breach is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    /// Soft limit crossed, request still allowed
    Warning,
    /// Hard limit crossed, request denied
    Critical,
}

/// Suggested reaction to a violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationAction {
    Alert,
    Cleanup,
    Throttle,
    Reject,
}

impl ViolationAction {
    /// Action for a hard-limit overshoot, from `(requested_total - limit) / limit`
    pub fn for_overshoot(ratio: f64) -> Self {
        if ratio > 0.5 {
            Self::Reject
        } else if ratio > 0.2 {
            Self::Throttle
        } else if ratio > 0.1 {
            Self::Cleanup
        } else {
            Self::Alert
        }
    }
}

/// A recorded threshold breach
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceViolation {
    pub resource_type: ResourceType,
    pub current: u64,
    pub limit: u64,
    pub severity: ViolationSeverity,
    pub action: ViolationAction,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of `check_resource_usage`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceCheckResult {
    pub allowed: bool,
    pub violation: Option<ResourceViolation>,
    /// Usage before the requested amount
    pub current_usage: u64,
    /// Headroom below the hard limit
    pub available_amount: u64,
}

impl ResourceCheckResult {
    /// Soft-limit breach as a non-blocking error value, if one was recorded
    pub fn soft_warning(&self) -> Option<GovernorError> {
        self.violation
            .as_ref()
            .filter(|v| v.severity == ViolationSeverity::Warning)
            .map(|v| GovernorError::soft_limit(v.resource_type, v.message.clone()))
    }

    /// Fail with `ResourceLimitExceeded` when the check was denied
    pub fn into_result(self) -> Result<Self> {
        if self.allowed {
            return Ok(self);
        }
        match &self.violation {
            Some(v) => Err(GovernorError::resource_limit(v.resource_type, v.message.clone())),
            None => Err(GovernorError::config("resource check denied without a violation")),
        }
    }
}

/// Notification delivered to registered callbacks
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceEvent {
    /// Usage moved by more than a tenth of the limit in one update
    UsageSpike(ResourceUsage),
    /// A violation was recorded
    Violation(ResourceViolation),
    /// The monitor found usage at or above the hard limit
    AtLimit(ResourceUsage),
}

impl ResourceEvent {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Self::UsageSpike(usage) | Self::AtLimit(usage) => usage.resource_type,
            Self::Violation(violation) => violation.resource_type,
        }
    }
}

/// Callback registered through `on_resource_violation`
pub type ResourceCallback = Arc<dyn Fn(&ResourceEvent) + Send + Sync>;

/// Result of a validator: errors make it invalid, warnings never do
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Budget the errors refer to; `None` for security checks
    #[serde(skip)]
    pub resource: Option<ResourceType>,
}

impl ValidationOutcome {
    pub(super) fn new(resource: Option<ResourceType>) -> Self {
        Self {
            valid: true,
            resource,
            ..Self::default()
        }
    }

    pub(super) fn error(&mut self, message: String) {
        self.valid = false;
        self.errors.push(message);
    }

    pub(super) fn warning(&mut self, message: String) {
        self.warnings.push(message);
    }

    /// Turn errors into a `GovernorError`, keeping warnings on success
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.valid {
            return Ok(self.warnings);
        }
        let message = self.errors.join("; ");
        Err(match self.resource {
            Some(resource) => GovernorError::resource_limit(resource, message),
            None => GovernorError::security(message),
        })
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            write!(f, "valid ({} warnings)", self.warnings.len())
        } else {
            write!(f, "invalid: {}", self.errors.join("; "))
        }
    }
}

/// Inputs for `validate_security_constraints`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityContext {
    pub filename: Option<String>,
    pub mime_type: Option<String>,
    pub url: Option<String>,
}

impl SecurityContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filename<S: Into<String>>(mut self, filename: S) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_mime_type<S: Into<String>>(mut self, mime_type: S) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_url<S: Into<String>>(mut self, url: S) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Per-type utilization plus violation counts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceSummary {
    pub resources: Vec<ResourceStatus>,
    pub total_violations: usize,
    pub warning_violations: usize,
    pub critical_violations: usize,
}

/// One row of the summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceStatus {
    pub resource_type: ResourceType,
    pub current: u64,
    pub peak: u64,
    pub limit: Option<u64>,
    pub soft_limit: Option<u64>,
    pub utilization_percentage: f64,
    pub is_at_limit: bool,
    pub is_at_soft_limit: bool,
}
