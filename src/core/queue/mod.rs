//! Priority request queue
//!
//! Holding area for requests denied admission. Higher priority drains first,
//! equal priorities drain in arrival order, and every item carries its own
//! timeout.

#[allow(clippy::module_inception)]
mod queue;
mod types;


pub use queue::RequestQueue;
pub use types::{AdmissionStatus, AdmissionTicket, RequestMetadata};
