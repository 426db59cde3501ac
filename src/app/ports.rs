//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ control cycle (domain)
//! ```
//!
//! Driven adapters (sensors, the motor relay, the cloud record, storage,
//! event sinks) implement these traits.  The [`AppService`](super::service::AppService)
//! consumes them via generics, so the domain core never touches hardware
//! directly and every timing-sensitive path is testable with a mock clock.

use crate::config::SystemConfig;
use crate::control::context::SensorSnapshot;
use crate::error::RemoteError;
use crate::sync::record::RemoteRecord;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the domain calls this to obtain sensor data.
///
/// Implementations retain the previous valid value on a faulted reading —
/// a flaky sensor must not crash or stall the control loop.
pub trait SensorPort {
    /// Read every sensor and return a unified snapshot.
    fn read_all(&mut self) -> SensorSnapshot;

    /// Fast distance-only read for the transit polling loop.
    fn read_distance(&mut self) -> f32;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the single binary motor relay.
pub trait ActuatorPort {
    /// Engage the motor.
    fn motor_on(&mut self);

    /// Disengage the motor.  Must be idempotent — the safety layer calls
    /// this unconditionally on every transit exit path.
    fn motor_off(&mut self);

    /// Query whether the relay is currently engaged.
    fn is_motor_on(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Clock port (injected so timing is deterministic in tests)
// ───────────────────────────────────────────────────────────────

/// Monotonic time source plus the short sleeps of the transit poll loop.
pub trait Clock {
    /// Milliseconds since boot (monotonic).
    fn now_ms(&self) -> u64;

    /// Block the (single) control thread for `ms` milliseconds.
    fn sleep_ms(&mut self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, cloud
/// alert feed, display).  Fire-and-forget: no delivery guarantee.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Remote record port (domain ↔ per-device cloud record)
// ───────────────────────────────────────────────────────────────

/// The per-device cloud record: read once per cycle when connectivity
/// exists, written back by the core (requested-state clear, status).
pub trait RemotePort {
    /// Whether the backend is reachable right now.  When `false` the cycle
    /// skips reconciliation entirely and local state stays authoritative.
    fn is_connected(&self) -> bool;

    /// Fetch the current command/config record.
    fn fetch_record(&mut self) -> Result<RemoteRecord, RemoteError>;

    /// Write `requestedState = "none"` back to the record.
    fn clear_requested_state(&mut self) -> Result<(), RemoteError>;

    /// Publish the device status document.
    fn publish_status(&mut self, status: &super::events::DeviceStatus) -> Result<(), RemoteError>;

    /// Publish the sensor telemetry document.
    fn publish_sensors(&mut self, report: &super::events::SensorReport) -> Result<(), RemoteError>;

    /// Publish the one-shot device registration document at startup.
    fn register_device(
        &mut self,
        registration: &super::events::DeviceRegistration<'_>,
    ) -> Result<(), RemoteError>;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting; invalid
/// ranges are rejected with [`ConfigError::ValidationFailed`], not clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage over NVS-style namespaces.  Used for the
/// config blob and any future persisted state (crash counters, calibration).
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / decode check.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
