//! Queue types

use crate::utils::error::{GovernorError, Result};
use crate::utils::generate_request_id;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::future::IntoFuture;
use std::time::Duration;
use tokio::sync::oneshot;

/// Metadata describing one admission request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMetadata {
    /// Request ID; filled with a UUID when empty
    #[serde(default)]
    pub id: String,
    /// Creation time
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Queue priority, higher drains first
    #[serde(default = "default_priority")]
    pub priority: u8,
    /// Retries performed so far
    #[serde(default)]
    pub retry_count: u32,
    /// Target endpoint, informational
    #[serde(default)]
    pub endpoint: Option<String>,
    /// HTTP method, informational
    #[serde(default)]
    pub method: Option<String>,
}

fn default_priority() -> u8 {
    1
}

impl Default for RequestMetadata {
    fn default() -> Self {
        Self {
            id: generate_request_id(),
            timestamp: Utc::now(),
            priority: default_priority(),
            retry_count: 0,
            endpoint: None,
            method: None,
        }
    }
}

impl RequestMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_endpoint<S: Into<String>>(mut self, method: S, endpoint: S) -> Self {
        self.method = Some(method.into());
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Fill the ID when a caller left it blank
    pub(crate) fn ensure_id(&mut self) {
        if self.id.is_empty() {
            self.id = generate_request_id();
        }
    }
}

/// Resolution of a queued request that reached the head of the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdmissionStatus {
    pub request_id: String,
    pub priority: u8,
    /// Time spent waiting in the queue
    pub queued_for: Duration,
}

/// Handle returned by `RequestQueue::enqueue`; await it for the admission outcome
#[derive(Debug)]
pub struct AdmissionTicket {
    pub(super) request_id: String,
    pub(super) receiver: oneshot::Receiver<Result<AdmissionStatus>>,
}

impl AdmissionTicket {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}

impl IntoFuture for AdmissionTicket {
    type Output = Result<AdmissionStatus>;
    type IntoFuture = BoxFuture<'static, Result<AdmissionStatus>>;

    fn into_future(self) -> Self::IntoFuture {
        async move {
            self.receiver
                .await
                .map_err(|_| GovernorError::shutdown("request queue dropped before admission"))?
        }
        .boxed()
    }
}

/// Heap key: priority descending, then insertion sequence ascending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct QueueEntry {
    pub(super) priority: u8,
    pub(super) seq: u64,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
