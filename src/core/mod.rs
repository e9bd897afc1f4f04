//! Core admission and governance machinery
//!
//! Limiters decide, the queue waits, backoff spaces out retries, the resource
//! manager keeps budgets, and the governor runs work through all of them.

pub mod backoff;
pub mod governor;
pub mod queue;
pub mod rate_limiter;
pub mod resources;
