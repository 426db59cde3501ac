//! Hangline firmware library.
//!
//! Control engine for a motorized retractable clothes hanger: weather and
//! occupancy driven arbitration, remote command reconciliation and
//! timeout/error recovery.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod sync;

pub mod adapters;
pub mod drivers;
pub mod pins;
pub mod sensors;
