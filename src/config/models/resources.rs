//! Resource budget configuration

use super::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const MB: u64 = 1024 * 1024;

/// Resource kinds tracked by the limits manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Memory,
    FileSize,
    ProcessingTime,
    ConcurrentConnections,
    CacheSize,
    QueueSize,
}

impl ResourceType {
    pub const ALL: [ResourceType; 6] = [
        Self::Memory,
        Self::FileSize,
        Self::ProcessingTime,
        Self::ConcurrentConnections,
        Self::CacheSize,
        Self::QueueSize,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::FileSize => "file_size",
            Self::ProcessingTime => "processing_time",
            Self::ConcurrentConnections => "concurrent_connections",
            Self::CacheSize => "cache_size",
            Self::QueueSize => "queue_size",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit of a resource amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceUnit {
    Bytes,
    Milliseconds,
    Count,
}

impl ResourceUnit {
    /// Render an amount in this unit for humans
    pub fn format(&self, amount: u64) -> String {
        match self {
            Self::Bytes => crate::utils::format_bytes(amount),
            Self::Milliseconds => crate::utils::format_duration(amount),
            Self::Count => amount.to_string(),
        }
    }
}

/// Budget for one resource type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimit {
    /// Resource this budget applies to
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    /// Hard ceiling
    pub limit: u64,
    /// Warning threshold
    #[serde(default)]
    pub soft_limit: Option<u64>,
    /// Unit of `limit` and `soft_limit`
    pub unit: ResourceUnit,
    /// Deny requests that would cross `limit`
    #[serde(default = "default_true")]
    pub enforced: bool,
    /// Include in periodic monitoring
    #[serde(default = "default_true")]
    pub monitoring: bool,
}

impl ResourceLimit {
    pub fn new(resource_type: ResourceType, limit: u64, unit: ResourceUnit) -> Self {
        Self {
            resource_type,
            limit,
            soft_limit: None,
            unit,
            enforced: true,
            monitoring: true,
        }
    }

    pub fn with_soft_limit(mut self, soft_limit: u64) -> Self {
        self.soft_limit = Some(soft_limit);
        self
    }

    pub fn unenforced(mut self) -> Self {
        self.enforced = false;
        self
    }

    pub fn unmonitored(mut self) -> Self {
        self.monitoring = false;
        self
    }
}

/// Default budgets: memory 512MB, file size 100MB, processing 30s,
/// 50 connections, 1000 cache entries, 200 queued items.
pub fn default_resource_limits() -> Vec<ResourceLimit> {
    vec![
        ResourceLimit::new(ResourceType::Memory, 512 * MB, ResourceUnit::Bytes)
            .with_soft_limit(400 * MB),
        ResourceLimit::new(ResourceType::FileSize, 100 * MB, ResourceUnit::Bytes)
            .with_soft_limit(80 * MB),
        ResourceLimit::new(
            ResourceType::ProcessingTime,
            30_000,
            ResourceUnit::Milliseconds,
        )
        .with_soft_limit(20_000),
        ResourceLimit::new(ResourceType::ConcurrentConnections, 50, ResourceUnit::Count)
            .with_soft_limit(40),
        ResourceLimit::new(ResourceType::CacheSize, 1000, ResourceUnit::Count)
            .with_soft_limit(800),
        ResourceLimit::new(ResourceType::QueueSize, 200, ResourceUnit::Count)
            .with_soft_limit(150),
    ]
}

/// Resource limits manager configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceLimitsConfig {
    /// Budgets; types missing here fall back to the defaults
    #[serde(default = "default_resource_limits")]
    pub limits: Vec<ResourceLimit>,
    /// Monitor tick period
    #[serde(default = "default_monitoring_interval_ms")]
    pub monitoring_interval_ms: u64,
    /// Maximum number of violations kept in the log
    #[serde(default = "default_max_violations")]
    pub max_violations: usize,
    /// Violations older than this are dropped on cleanup
    #[serde(default = "default_violation_retention_secs")]
    pub violation_retention_secs: u64,
    /// Peaks of entries not updated for this long are reset to the current value
    #[serde(default = "default_stale_peak_after_secs")]
    pub stale_peak_after_secs: u64,
    /// Run cleanup on each monitor tick
    #[serde(default = "default_true")]
    pub cleanup_enabled: bool,
}

impl Default for ResourceLimitsConfig {
    fn default() -> Self {
        Self {
            limits: default_resource_limits(),
            monitoring_interval_ms: default_monitoring_interval_ms(),
            max_violations: default_max_violations(),
            violation_retention_secs: default_violation_retention_secs(),
            stale_peak_after_secs: default_stale_peak_after_secs(),
            cleanup_enabled: true,
        }
    }
}

impl ResourceLimitsConfig {
    pub fn monitoring_interval(&self) -> Duration {
        Duration::from_millis(self.monitoring_interval_ms)
    }

    pub fn violation_retention(&self) -> Duration {
        Duration::from_secs(self.violation_retention_secs)
    }

    pub fn stale_peak_after(&self) -> Duration {
        Duration::from_secs(self.stale_peak_after_secs)
    }

    /// Budget for one type, if configured
    pub fn limit_for(&self, resource_type: ResourceType) -> Option<&ResourceLimit> {
        self.limits
            .iter()
            .find(|limit| limit.resource_type == resource_type)
    }

    /// Configured budgets completed with defaults for missing types
    pub fn effective_limits(&self) -> Vec<ResourceLimit> {
        let mut limits = self.limits.clone();
        for default in default_resource_limits() {
            if self.limit_for(default.resource_type).is_none() {
                limits.push(default);
            }
        }
        limits
    }

    /// Merge configurations; budgets from `other` replace same-typed budgets
    pub fn merge(mut self, other: Self) -> Self {
        let defaults = Self::default();
        if other.limits != defaults.limits {
            for limit in other.limits {
                match self
                    .limits
                    .iter_mut()
                    .find(|l| l.resource_type == limit.resource_type)
                {
                    Some(existing) => *existing = limit,
                    None => self.limits.push(limit),
                }
            }
        }
        if other.monitoring_interval_ms != defaults.monitoring_interval_ms {
            self.monitoring_interval_ms = other.monitoring_interval_ms;
        }
        if other.max_violations != defaults.max_violations {
            self.max_violations = other.max_violations;
        }
        if other.violation_retention_secs != defaults.violation_retention_secs {
            self.violation_retention_secs = other.violation_retention_secs;
        }
        if other.stale_peak_after_secs != defaults.stale_peak_after_secs {
            self.stale_peak_after_secs = other.stale_peak_after_secs;
        }
        if !other.cleanup_enabled {
            self.cleanup_enabled = false;
        }
        self
    }
}
