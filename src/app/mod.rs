//! Application layer: port traits, events and the cycle orchestrator.

pub mod events;
pub mod ports;
pub mod service;
