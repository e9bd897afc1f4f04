//! Error handling for the governor
//!
//! This module defines the error taxonomy shared by every governance component.

mod helpers;
mod types;

pub use types::{GovernorError, Result};
