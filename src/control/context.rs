//! Shared mutable context threaded through every control-cycle component.
//!
//! `ControlContext` is the single struct that the arbiter, position driver,
//! remote sync and error supervisor read from and write to.  It replaces the
//! file-scope globals of a classic Arduino sketch with an explicit object so
//! ownership and mutation are visible and testable in isolation.

use serde::Serialize;

use crate::config::SystemConfig;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Proximity band the hanger currently occupies.
///
/// `Error` is sticky: only the error supervisor's recovery step leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Extended,
    Retracted,
    /// Motor timed out; true position unknown until recovery.
    Error,
}

impl Position {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Extended => "Extended",
            Self::Retracted => "Retracted",
            Self::Error => "Error",
        }
    }
}

/// A commandable transit target — `Position` minus the `Error` state,
/// so an invalid target is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Extend,
    Retract,
}

impl Target {
    /// The position reached when this transit succeeds.
    pub fn position(self) -> Position {
        match self {
            Self::Extend => Position::Extended,
            Self::Retract => Position::Retracted,
        }
    }

    /// Centre of the distance band for this target (cm).
    pub fn band_center_cm(self, config: &SystemConfig) -> f32 {
        match self {
            Self::Extend => config.distance_extended_cm,
            Self::Retract => config.distance_retracted_cm,
        }
    }
}

/// Classify a distance reading against the configured bands.
/// `None` when the reading sits between or outside both bands.
pub fn classify_distance(distance_cm: f32, config: &SystemConfig) -> Option<Position> {
    let tol = config.distance_tolerance_cm;
    if (distance_cm - config.distance_extended_cm).abs() <= tol {
        Some(Position::Extended)
    } else if (distance_cm - config.distance_retracted_cm).abs() <= tol {
        Some(Position::Retracted)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Mode flags
// ---------------------------------------------------------------------------

/// Control-mode flags.
///
/// Invariant: `manual_command_in_progress == true` implies
/// `auto_enabled == false`.  Enforced by the mutators below — fields are
/// private so the invariant cannot be bypassed.
#[derive(Debug, Clone, Copy)]
pub struct ModeFlags {
    auto_enabled: bool,
    manual_command_in_progress: bool,
    pending_target: Option<Target>,
}

impl Default for ModeFlags {
    fn default() -> Self {
        Self {
            auto_enabled: true,
            manual_command_in_progress: false,
            pending_target: None,
        }
    }
}

impl ModeFlags {
    pub fn auto_enabled(&self) -> bool {
        self.auto_enabled
    }

    pub fn manual_command_in_progress(&self) -> bool {
        self.manual_command_in_progress
    }

    pub fn pending_target(&self) -> Option<Target> {
        self.pending_target
    }

    /// Enable or disable automatic control.  Ignored (kept `false`) while a
    /// manual command is in progress.
    pub fn set_auto_enabled(&mut self, enabled: bool) {
        self.auto_enabled = enabled && !self.manual_command_in_progress;
    }

    /// Accept a manual command: records the target and suspends automatic
    /// control until completion.
    pub fn begin_manual(&mut self, target: Target) {
        self.manual_command_in_progress = true;
        self.pending_target = Some(target);
        self.auto_enabled = false;
    }

    /// Clear the manual command after the target position was reached.
    /// Automatic control stays off until explicitly re-enabled remotely,
    /// matching the original device behaviour.
    pub fn clear_manual(&mut self) {
        self.manual_command_in_progress = false;
        self.pending_target = None;
    }

    /// The invariant every reconcile/arbitrate call must preserve.
    pub fn invariant_holds(&self) -> bool {
        !self.manual_command_in_progress || !self.auto_enabled
    }
}

// ---------------------------------------------------------------------------
// Sensor snapshot
// ---------------------------------------------------------------------------

/// A point-in-time snapshot of every sensor in the system.
/// Refreshed at the top of each control cycle; read-only below that.
/// Flattened into the published telemetry document.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SensorSnapshot {
    /// Ambient temperature (°C).
    pub temperature_c: f32,
    /// Relative humidity (%).
    pub humidity_pct: f32,
    /// Rain sensor tripped.
    pub rain_detected: bool,
    /// Raw PIR level this cycle (debouncing is the occupancy module's job).
    pub presence_detected: bool,
    /// Ultrasonic distance to the hanger (cm).
    pub distance_cm: f32,
}

impl Default for SensorSnapshot {
    fn default() -> Self {
        Self {
            temperature_c: 25.0,
            humidity_pct: 50.0,
            rain_detected: false,
            presence_detected: false,
            distance_cm: 20.0,
        }
    }
}

// ---------------------------------------------------------------------------
// ControlContext
// ---------------------------------------------------------------------------

/// The shared context passed into every control-cycle component.
pub struct ControlContext {
    /// Current proximity band. Mutated only by the position driver and the
    /// error supervisor.
    pub position: Position,
    /// Control-mode flags (invariant-preserving mutators).
    pub modes: ModeFlags,
    /// Latest sensor readings. Updated before each cycle.
    pub sensors: SensorSnapshot,
    /// System configuration (tunable parameters).
    pub config: SystemConfig,
}

impl ControlContext {
    /// Create a new context with the given configuration.
    pub fn new(config: SystemConfig) -> Self {
        let mut modes = ModeFlags::default();
        modes.set_auto_enabled(config.auto_enabled);
        Self {
            position: Position::Retracted,
            modes,
            sensors: SensorSnapshot::default(),
            config,
        }
    }

    /// Classify the latest distance reading and adopt it as the starting
    /// position; anywhere outside both bands defaults to Retracted (safe).
    pub fn detect_initial_position(&mut self, distance_cm: f32) {
        self.position = classify_distance(distance_cm, &self.config).unwrap_or(Position::Retracted);
        log::info!(
            "initial position from {:.1} cm reading: {}",
            distance_cm,
            self.position.as_str()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_hits_both_bands() {
        let c = SystemConfig::default(); // 20 / 50 ± 5
        assert_eq!(classify_distance(50.0, &c), Some(Position::Extended));
        assert_eq!(classify_distance(45.0, &c), Some(Position::Extended));
        assert_eq!(classify_distance(55.0, &c), Some(Position::Extended));
        assert_eq!(classify_distance(20.0, &c), Some(Position::Retracted));
        assert_eq!(classify_distance(25.0, &c), Some(Position::Retracted));
        assert_eq!(classify_distance(35.0, &c), None);
        assert_eq!(classify_distance(300.0, &c), None);
    }

    #[test]
    fn initial_position_defaults_to_retracted() {
        let mut ctx = ControlContext::new(SystemConfig::default());
        ctx.detect_initial_position(120.0);
        assert_eq!(ctx.position, Position::Retracted);
        ctx.detect_initial_position(48.0);
        assert_eq!(ctx.position, Position::Extended);
    }

    #[test]
    fn begin_manual_disables_auto() {
        let mut m = ModeFlags::default();
        assert!(m.auto_enabled());
        m.begin_manual(Target::Extend);
        assert!(m.manual_command_in_progress());
        assert!(!m.auto_enabled());
        assert!(m.invariant_holds());
    }

    #[test]
    fn set_auto_ignored_while_manual_in_progress() {
        let mut m = ModeFlags::default();
        m.begin_manual(Target::Retract);
        m.set_auto_enabled(true);
        assert!(!m.auto_enabled(), "auto must stay off during a manual command");
        assert!(m.invariant_holds());
    }

    #[test]
    fn clear_manual_keeps_auto_off() {
        let mut m = ModeFlags::default();
        m.begin_manual(Target::Extend);
        m.clear_manual();
        assert!(!m.manual_command_in_progress());
        assert!(m.pending_target().is_none());
        assert!(!m.auto_enabled());
    }
}
