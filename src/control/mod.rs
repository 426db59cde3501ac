//! Control core: arbitration, position transit, occupancy debounce,
//! condition evaluation and error supervision.
//!
//! Everything in here is hardware-free and host-testable; side effects go
//! through the port traits in [`crate::app::ports`].

pub mod arbiter;
pub mod conditions;
pub mod context;
pub mod occupancy;
pub mod position;
pub mod supervisor;
