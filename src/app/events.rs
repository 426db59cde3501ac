//! Application events and published documents.
//!
//! The control core emits [`AppEvent`]s through the [`EventSink`] port;
//! adapters decide whether an event becomes a log line, a cloud alert, or
//! both.  The serializable documents at the bottom are what the remote
//! adapter publishes to the per-device record.
//!
//! [`EventSink`]: super::ports::EventSink

use serde::Serialize;

use crate::control::context::{Position, SensorSnapshot, Target};

/// Severity of an [`AppEvent::Alert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Info,
    Warning,
    Emergency,
    Error,
}

impl AlertLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Emergency => "EMERGENCY",
            Self::Error => "ERROR",
        }
    }
}

/// Fire-and-forget notifications out of the control core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// Controller finished startup at the given detected position.
    Started { position: Position },
    /// A transit completed and the position changed.
    PositionChanged { from: Position, to: Position },
    /// Leveled alert with a static, human-readable message.
    Alert {
        level: AlertLevel,
        message: &'static str,
    },
    /// A remote manual command passed validation and was accepted.
    ManualCommandAccepted { target: Target },
    /// The position matched a pending manual target.
    ManualCommandCompleted { target: Target },
}

/// Status document published to the device record each cycle.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceStatus {
    /// Current position as a display string.
    pub state: &'static str,
    pub auto_enabled: bool,
    pub manual_command_in_progress: bool,
    /// Milliseconds since boot.
    pub uptime_ms: u64,
}

/// Telemetry document published to the device record each cycle: the
/// sensor snapshot plus a timestamp so readers can spot a stalled device.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SensorReport {
    #[serde(flatten)]
    pub snapshot: SensorSnapshot,
    /// Milliseconds since boot at publication time.
    pub uptime_ms: u64,
}

/// One-shot registration document published at startup when connected.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceRegistration<'a> {
    pub name: &'a str,
    pub location: &'a str,
    pub id: &'a str,
}
