//! Validation trait definition
//!
//! Every configuration section implements this trait; errors are plain
//! messages that the loader wraps into `GovernorError::Config`.

/// Validation trait for configuration structures
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}
