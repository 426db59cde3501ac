//! System configuration parameters
//!
//! All tunable parameters for the Hangline controller.
//! Values can be overridden via NVS (non-volatile storage) or reconciled
//! from the per-device cloud record.

use serde::{Deserialize, Serialize};

/// Fixed poll cadence of the position driver while a transit is running.
pub const TRANSIT_POLL_INTERVAL_MS: u32 = 100;

/// Sticky-presence hold window of the occupancy debouncer.
pub const OCCUPANCY_HOLD_WINDOW_MS: u64 = 10_000;

/// Minimum non-zero occupancy action delay (prevents command spam).
pub const OCCUPANCY_MIN_ACTION_DELAY_MS: u32 = 5_000;

/// How long the error supervisor holds the system before auto-recovery.
pub const ERROR_RECOVERY_WINDOW_MS: u64 = 30_000;

/// Temperature / humidity window considered favourable for drying.
///
/// Both pairs satisfy `min < max`; comparisons against them are strict,
/// so a reading exactly on a boundary is *not* favourable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DryingThresholds {
    /// Minimum temperature for good drying (Celsius).
    pub temp_min_c: f32,
    /// Maximum temperature for good drying (Celsius).
    pub temp_max_c: f32,
    /// Minimum relative humidity for good drying (%).
    pub humidity_min_pct: f32,
    /// Maximum relative humidity for good drying (%).
    pub humidity_max_pct: f32,
}

impl Default for DryingThresholds {
    fn default() -> Self {
        Self {
            temp_min_c: 25.0,
            temp_max_c: 40.0,
            humidity_min_pct: 30.0,
            humidity_max_pct: 70.0,
        }
    }
}

impl DryingThresholds {
    /// Each pair must satisfy `min < max`.
    pub fn is_valid(&self) -> bool {
        self.temp_min_c < self.temp_max_c && self.humidity_min_pct < self.humidity_max_pct
    }
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Device identity ---
    pub device_name: heapless::String<32>,
    pub device_location: heapless::String<32>,

    // --- Motor / position ---
    /// Maximum motor run time per transit (milliseconds).
    pub motor_timeout_ms: u32,
    /// Ultrasonic distance when fully extended (cm).
    pub distance_extended_cm: f32,
    /// Ultrasonic distance when fully retracted (cm).
    pub distance_retracted_cm: f32,
    /// Symmetric tolerance band around each target distance (cm).
    pub distance_tolerance_cm: f32,

    // --- Control modes ---
    /// Automatic weather/occupancy control enabled.
    pub auto_enabled: bool,

    // --- Drying thresholds ---
    /// Use the custom thresholds below instead of the built-in defaults.
    pub use_custom_thresholds: bool,
    pub thresholds: DryingThresholds,

    // --- Occupancy control ---
    /// Enable presence-based control.
    pub enable_occupancy_control: bool,
    /// Privacy policy (retract when present) when `true`; access policy
    /// (extend when present) when `false`.
    pub retract_on_present: bool,
    /// Delay before acting on a flip to Present (0 = immediate).
    pub occupancy_action_delay_ms: u32,

    // --- Timing ---
    /// Control cycle / sensor refresh interval (milliseconds).
    pub sensor_read_interval_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            device_name: heapless::String::try_from("Smart_Hanger_1").unwrap_or_default(),
            device_location: heapless::String::try_from("Backyard").unwrap_or_default(),

            motor_timeout_ms: 30_000,
            distance_extended_cm: 50.0,
            distance_retracted_cm: 20.0,
            distance_tolerance_cm: 5.0,

            auto_enabled: true,

            use_custom_thresholds: false,
            thresholds: DryingThresholds::default(),

            enable_occupancy_control: false,
            retract_on_present: true,
            occupancy_action_delay_ms: 5_000,

            sensor_read_interval_ms: 2_000,
        }
    }
}

impl SystemConfig {
    /// Thresholds the condition evaluator should use this cycle.
    pub fn active_thresholds(&self) -> DryingThresholds {
        if self.use_custom_thresholds {
            self.thresholds
        } else {
            DryingThresholds::default()
        }
    }
}
