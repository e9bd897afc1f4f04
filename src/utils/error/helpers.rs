//! Helper functions for creating and inspecting specific error types

use super::types::GovernorError;
use crate::core::resources::ResourceType;
use std::time::Duration;

impl GovernorError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    pub fn security<S: Into<String>>(message: S) -> Self {
        Self::SecurityValidationFailed(message.into())
    }

    pub fn shutdown<S: Into<String>>(message: S) -> Self {
        Self::Shutdown(message.into())
    }

    pub fn resource_limit<S: Into<String>>(resource: ResourceType, message: S) -> Self {
        Self::ResourceLimitExceeded {
            resource,
            message: message.into(),
        }
    }

    pub fn soft_limit<S: Into<String>>(resource: ResourceType, message: S) -> Self {
        Self::ResourceSoftLimitWarning {
            resource,
            message: message.into(),
        }
    }

    /// Whether waiting and trying again can plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded { .. }
                | Self::QueueFull { .. }
                | Self::QueueTimeout { .. }
                | Self::OperationTimeout { .. }
        )
    }

    /// Suggested wait before retrying, when the error carries one
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimitExceeded { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    /// Whether the error blocks the caller (soft-limit warnings never do)
    pub fn is_blocking(&self) -> bool {
        !matches!(self, Self::ResourceSoftLimitWarning { .. })
    }
}
