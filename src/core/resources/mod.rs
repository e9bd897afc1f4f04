//! Resource governance
//!
//! Usage tracking and enforcement for budgets that are not request rates:
//! memory, file size, processing time, connections, cache and queue size.
//! Each budget has an optional soft threshold that only warns and a hard
//! threshold that blocks.

mod manager;
mod monitor;
mod types;
mod validators;


pub use crate::config::models::{ResourceLimit, ResourceType, ResourceUnit};
pub use manager::{ResourceGuard, ResourceLimitsManager};
pub use monitor::MonitorTick;
pub use types::{
    ResourceCallback, ResourceCheckResult, ResourceEvent, ResourceStatus, ResourceSummary,
    ResourceUsage, ResourceViolation, SecurityContext, ValidationOutcome, ViolationAction,
    ViolationSeverity,
};
pub use validators::validate_security;
