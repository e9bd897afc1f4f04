//! Integration tests for request-governor
//!
//! These tests drive the public API across several components at once.

pub mod config_tests;
pub mod governor_tests;
pub mod limiter_tests;
pub mod resource_tests;
