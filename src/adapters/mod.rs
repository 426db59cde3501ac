//! Adapters — concrete implementations of the port traits.
//!
//! Each adapter is dual-target: a real ESP-IDF backend behind
//! `#[cfg(target_os = "espidf")]` and an in-memory simulation backend for
//! host tests.

pub mod device_id;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod remote;
pub mod time;
