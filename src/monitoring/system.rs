//! Process memory sampling using the sysinfo crate
//!
//! Real sampling needs the `metrics` feature; without it the sampler reports nothing
//! and the resource monitor leaves memory usage to explicit updates.

use std::fmt::Debug;

#[cfg(feature = "metrics")]
use sysinfo::{Pid, ProcessesToUpdate, System};

/// Source of the current process memory footprint, in bytes
pub trait MemorySampler: Send + Sync + Debug {
    fn sample(&self) -> Option<u64>;
}

/// Samples the resident memory of the running process
#[derive(Debug)]
pub struct ProcessMemorySampler {
    #[cfg(feature = "metrics")]
    pid: Option<Pid>,
    #[cfg(feature = "metrics")]
    system: parking_lot::Mutex<System>,
}

impl Default for ProcessMemorySampler {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessMemorySampler {
    #[cfg(feature = "metrics")]
    pub fn new() -> Self {
        Self {
            pid: sysinfo::get_current_pid().ok(),
            system: parking_lot::Mutex::new(System::new()),
        }
    }

    #[cfg(not(feature = "metrics"))]
    pub fn new() -> Self {
        Self {}
    }
}

impl MemorySampler for ProcessMemorySampler {
    #[cfg(feature = "metrics")]
    fn sample(&self) -> Option<u64> {
        let pid = self.pid?;
        let mut system = self.system.lock();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        system.process(pid).map(|process| process.memory())
    }

    #[cfg(not(feature = "metrics"))]
    fn sample(&self) -> Option<u64> {
        None
    }
}
