//! Configuration validation
//!
//! - `trait_def`: core Validate trait definition
//! - `governor_validators`: validators for every governor config section
//! - `tests`: test suite for all validators

mod governor_validators;
mod trait_def;

pub use trait_def::Validate;
