//! Monitoring helpers shared by the governor components
//!
//! - **bounded**: size-capped `VecDeque` push for logs and samples
//! - **system**: process memory sampling

pub mod bounded;
pub mod system;

pub use bounded::BoundedPush;
pub use system::{MemorySampler, ProcessMemorySampler};
