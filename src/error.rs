//! Unified error types for the Hangline firmware.
//!
//! A single `Error` enum that every subsystem converts into, so the top-level
//! control loop handles one type. All variants are `Copy` and allocation-free.
//!
//! None of these halts the control loop — every fault is resolved within the
//! cycle that detects it (stale value retained, field ignored, or escalation
//! to the error supervisor).

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor could not be read or returned out-of-range data.
    Sensor(SensorError),
    /// The motor ran past its timeout budget without reaching the target band.
    ActuationTimeout,
    /// The cloud record could not be read or written.
    Remote(RemoteError),
    /// A manual command arrived while another was still in progress.
    ConflictingCommand,
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::ActuationTimeout => write!(f, "actuation timeout"),
            Self::Remote(e) => write!(f, "remote: {e}"),
            Self::ConflictingCommand => write!(f, "manual command already in progress"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Echo/ADC read returned an error or timed out.
    ReadFailed,
    /// Reading is outside the physically plausible range.
    OutOfRange,
    /// Reading was NaN (disconnected DHT pin reads as NaN).
    NotANumber,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFailed => write!(f, "read failed"),
            Self::OutOfRange => write!(f, "reading out of range"),
            Self::NotANumber => write!(f, "reading is NaN"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Remote (cloud record) errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteError {
    /// No connectivity — reconciliation skipped, local state authoritative.
    Unavailable,
    /// Record was present but could not be parsed at all.
    InvalidData,
    /// A read from the backend failed.
    ReadFailed,
    /// A write-back (status, telemetry, requested-state clear) failed.
    WriteFailed,
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "backend unavailable"),
            Self::InvalidData => write!(f, "record invalid"),
            Self::ReadFailed => write!(f, "read failed"),
            Self::WriteFailed => write!(f, "write failed"),
        }
    }
}

impl From<RemoteError> for Error {
    fn from(e: RemoteError) -> Self {
        Self::Remote(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
