//! Request queue implementation

use super::types::{AdmissionStatus, AdmissionTicket, QueueEntry, RequestMetadata};
use crate::config::models::{DequeuePolicy, RateLimitConfig};
use crate::core::rate_limiter::AdmissionLimiter;
use crate::utils::error::{GovernorError, Result};
use parking_lot::Mutex;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

#[derive(Debug)]
struct PendingItem {
    metadata: RequestMetadata,
    enqueued_at: Instant,
    sender: oneshot::Sender<Result<AdmissionStatus>>,
    timer: AbortHandle,
}

#[derive(Debug, Default)]
struct QueueState {
    /// May hold stale entries; `pending` is authoritative
    heap: BinaryHeap<QueueEntry>,
    pending: HashMap<u64, PendingItem>,
    next_seq: u64,
    draining: bool,
    closed: bool,
}

#[derive(Debug)]
struct QueueInner {
    max_size: usize,
    timeout: Duration,
    processing_interval: Duration,
    max_priority: u8,
    policy: DequeuePolicy,
    limiter: Option<Arc<dyn AdmissionLimiter>>,
    state: Mutex<QueueState>,
}

/// What the drain task should do next
enum DrainStep {
    Admit(PendingItem),
    Wait(Duration),
    Stop,
}

/// Bounded priority queue with per-item timeouts and a lazily spawned drain task
#[derive(Debug, Clone)]
pub struct RequestQueue {
    inner: Arc<QueueInner>,
}

impl RequestQueue {
    /// Create a queue that admits every item reaching the head
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::build(config, None)
    }

    /// Create a queue that can re-check `limiter` on dequeue
    pub fn with_limiter(config: &RateLimitConfig, limiter: Arc<dyn AdmissionLimiter>) -> Self {
        Self::build(config, Some(limiter))
    }

    fn build(config: &RateLimitConfig, limiter: Option<Arc<dyn AdmissionLimiter>>) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                max_size: config.max_queue_size,
                timeout: config.queue_timeout(),
                processing_interval: config.queue_processing_interval(),
                max_priority: config.priority_levels.saturating_sub(1),
                policy: config.dequeue_policy,
                limiter,
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    /// Add a request to the queue
    ///
    /// Fails immediately with `QueueFull` at capacity. Must be called from
    /// within a Tokio runtime.
    pub fn enqueue(&self, mut metadata: RequestMetadata) -> Result<AdmissionTicket> {
        let handle = Handle::try_current()
            .map_err(|_| GovernorError::config("request queue requires a Tokio runtime"))?;

        metadata.ensure_id();
        metadata.priority = metadata.priority.min(self.inner.max_priority);

        let mut state = self.inner.state.lock();
        if state.closed {
            return Err(GovernorError::shutdown("request queue is closed"));
        }
        if state.pending.len() >= self.inner.max_size {
            debug!(
                "Queue full ({} items), rejecting request {}",
                state.pending.len(),
                metadata.id
            );
            return Err(GovernorError::QueueFull {
                capacity: self.inner.max_size,
            });
        }

        let seq = state.next_seq;
        state.next_seq += 1;

        let weak = Arc::downgrade(&self.inner);
        let timeout = self.inner.timeout;
        let timer = handle
            .spawn(async move {
                tokio::time::sleep(timeout).await;
                if let Some(inner) = weak.upgrade() {
                    QueueInner::expire(&inner, seq);
                }
            })
            .abort_handle();

        let (sender, receiver) = oneshot::channel();
        let request_id = metadata.id.clone();
        state.heap.push(QueueEntry {
            priority: metadata.priority,
            seq,
        });
        state.pending.insert(
            seq,
            PendingItem {
                metadata,
                enqueued_at: Instant::now(),
                sender,
                timer,
            },
        );
        debug!(
            "Queued request {} ({} waiting)",
            request_id,
            state.pending.len()
        );

        if !state.draining {
            state.draining = true;
            let inner = Arc::clone(&self.inner);
            handle.spawn(QueueInner::drain(inner));
        }

        Ok(AdmissionTicket {
            request_id,
            receiver,
        })
    }

    /// Number of requests waiting
    pub fn len(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.max_size
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Reject every waiting request with `Shutdown` and refuse new ones
    pub fn close(&self) {
        let drained: Vec<PendingItem> = {
            let mut state = self.inner.state.lock();
            state.closed = true;
            state.heap.clear();
            state.pending.drain().map(|(_, item)| item).collect()
        };

        if !drained.is_empty() {
            debug!("Closing queue with {} waiting requests", drained.len());
        }
        for item in drained {
            item.timer.abort();
            let _ = item
                .sender
                .send(Err(GovernorError::shutdown("request queue closed")));
        }
    }
}

impl QueueInner {
    fn expire(inner: &Arc<Self>, seq: u64) {
        let item = {
            let mut state = inner.state.lock();
            let item = state.pending.remove(&seq);
            if state.pending.is_empty() {
                state.heap.clear();
            }
            item
        };

        if let Some(item) = item {
            warn!(
                "Request {} timed out after {:?} in queue",
                item.metadata.id, inner.timeout
            );
            let _ = item.sender.send(Err(GovernorError::QueueTimeout {
                timeout: inner.timeout,
            }));
        }
    }

    fn next_step(&self) -> DrainStep {
        let mut state = self.state.lock();
        loop {
            let Some(&entry) = state.heap.peek() else {
                state.draining = false;
                return DrainStep::Stop;
            };
            if !state.pending.contains_key(&entry.seq) {
                state.heap.pop();
                continue;
            }

            if self.policy == DequeuePolicy::Recheck {
                if let Some(limiter) = &self.limiter {
                    let result = limiter.is_allowed();
                    if !result.allowed {
                        let wait = result.retry_after.unwrap_or(self.processing_interval);
                        return DrainStep::Wait(wait);
                    }
                }
            }

            state.heap.pop();
            if let Some(item) = state.pending.remove(&entry.seq) {
                return DrainStep::Admit(item);
            }
        }
    }

    async fn drain(inner: Arc<Self>) {
        loop {
            match inner.next_step() {
                DrainStep::Stop => return,
                DrainStep::Wait(wait) => {
                    debug!("Queue head denied by limiter, waiting {:?}", wait);
                    tokio::time::sleep(wait).await;
                }
                DrainStep::Admit(item) => {
                    item.timer.abort();
                    let status = AdmissionStatus {
                        request_id: item.metadata.id.clone(),
                        priority: item.metadata.priority,
                        queued_for: item.enqueued_at.elapsed(),
                    };
                    debug!(
                        "Admitted queued request {} after {:?}",
                        status.request_id, status.queued_for
                    );
                    if item.sender.send(Ok(status)).is_err() {
                        debug!("Caller abandoned queued request {}", item.metadata.id);
                    }
                    if !inner.processing_interval.is_zero() {
                        tokio::time::sleep(inner.processing_interval).await;
                    }
                }
            }
        }
    }
}
