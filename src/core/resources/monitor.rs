//! Periodic resource monitoring

use super::manager::ResourceLimitsManager;
use super::types::ResourceEvent;
use crate::config::models::ResourceType;
use crate::utils::error::{GovernorError, Result};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Running monitor task and its shutdown signal
#[derive(Debug)]
pub(super) struct MonitorHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// What one monitor tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorTick {
    pub memory_sampled: bool,
    pub violations_pruned: usize,
    pub peaks_reset: usize,
    pub at_limit: usize,
}

impl ResourceLimitsManager {
    /// Start the periodic monitor; a second call while running is a no-op
    ///
    /// The task only holds a weak reference and ends when the manager is dropped.
    pub fn start_monitoring(self: &Arc<Self>) -> Result<()> {
        let handle = Handle::try_current()
            .map_err(|_| GovernorError::config("resource monitoring requires a Tokio runtime"))?;

        let mut monitor = self.monitor.lock();
        if monitor.as_ref().is_some_and(|m| !m.task.is_finished()) {
            debug!("Resource monitoring already running");
            return Ok(());
        }

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let weak = Arc::downgrade(self);
        let period = self.settings.monitoring_interval();

        let task = handle.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let Some(manager) = weak.upgrade() else { break };
                        manager.monitor_tick();
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("Resource monitor task exited");
        });

        *monitor = Some(MonitorHandle { shutdown, task });
        info!("Resource monitoring started (interval {:?})", period);
        Ok(())
    }

    /// Stop the monitor and wait for its task to finish
    pub async fn stop_monitoring(&self) {
        let Some(handle) = self.monitor.lock().take() else {
            return;
        };

        let _ = handle.shutdown.send(true);
        let _ = handle.task.await;
        info!("Resource monitoring stopped");
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitor
            .lock()
            .as_ref()
            .is_some_and(|m| !m.task.is_finished())
    }

    /// One monitor pass: sample memory, clean up, re-check limits
    pub fn monitor_tick(&self) -> MonitorTick {
        let mut tick = MonitorTick::default();

        if self.is_monitored(ResourceType::Memory) {
            if let Some(bytes) = self.sampler.sample() {
                self.update_resource_usage(ResourceType::Memory, bytes);
                tick.memory_sampled = true;
            }
        }

        if self.settings.cleanup_enabled {
            tick.violations_pruned = self.prune_violations();
            tick.peaks_reset = self.reset_stale_peaks();
        }

        let at_limit = self.entries_at_limit();
        tick.at_limit = at_limit.len();
        for usage in at_limit {
            debug!(
                "{} at limit ({:.1}% utilization)",
                usage.resource_type, usage.utilization_percentage
            );
            self.fire(&ResourceEvent::AtLimit(usage));
        }

        tick
    }
}
