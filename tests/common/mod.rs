//! Common test utilities for request-governor

pub mod fixtures;

pub use fixtures::{FixedSampler, MB, governor_config, resource_manager};
