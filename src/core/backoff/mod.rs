//! Retry delay calculation
//!
//! A pure mapping from attempt number to delay, with optional jitter.

mod calculator;

#[cfg(test)]
mod tests;

pub use calculator::{BackoffCalculator, CustomDelayFn};
