//! Wire format of the per-device cloud record.
//!
//! Every field is optional and leniently decoded: a missing field, a
//! mistyped field, or unparseable junk all land as `None`, and `None`
//! always means "keep the local value".  A malformed record can therefore
//! never fail reconciliation as a whole.
//!
//! Key names follow the record layout the backend already uses
//! (camelCase, one key per tunable).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::control::context::Target;

/// A remote request for a manual transit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedState {
    Extend,
    Retract,
}

impl RequestedState {
    /// Case-insensitive parse; accepts both the verb and the participle
    /// spellings.  Anything else (including `"none"`) is no request.
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("extend") || s.eq_ignore_ascii_case("extended") {
            Some(Self::Extend)
        } else if s.eq_ignore_ascii_case("retract") || s.eq_ignore_ascii_case("retracted") {
            Some(Self::Retract)
        } else {
            None
        }
    }

    pub fn target(self) -> Target {
        match self {
            Self::Extend => Target::Extend,
            Self::Retract => Target::Retract,
        }
    }
}

/// The decoded cloud record.  `None` everywhere means "nothing to apply".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RemoteRecord {
    #[serde(rename = "requestedState", deserialize_with = "lenient_requested_state")]
    pub requested_state: Option<RequestedState>,

    #[serde(rename = "autoEnabled", deserialize_with = "lenient")]
    pub auto_enabled: Option<bool>,

    #[serde(rename = "motorTimeout", deserialize_with = "lenient")]
    pub motor_timeout_ms: Option<u32>,
    #[serde(rename = "sensorReadInterval", deserialize_with = "lenient")]
    pub sensor_read_interval_ms: Option<u32>,

    #[serde(rename = "distanceExtended", deserialize_with = "lenient")]
    pub distance_extended_cm: Option<f32>,
    #[serde(rename = "distanceRetracted", deserialize_with = "lenient")]
    pub distance_retracted_cm: Option<f32>,
    #[serde(rename = "distanceTolerance", deserialize_with = "lenient")]
    pub distance_tolerance_cm: Option<f32>,

    #[serde(rename = "useCustomThresholds", deserialize_with = "lenient")]
    pub use_custom_thresholds: Option<bool>,
    #[serde(rename = "tempMinThreshold", deserialize_with = "lenient")]
    pub temp_min_c: Option<f32>,
    #[serde(rename = "tempMaxThreshold", deserialize_with = "lenient")]
    pub temp_max_c: Option<f32>,
    #[serde(rename = "humidityMinThreshold", deserialize_with = "lenient")]
    pub humidity_min_pct: Option<f32>,
    #[serde(rename = "humidityMaxThreshold", deserialize_with = "lenient")]
    pub humidity_max_pct: Option<f32>,

    #[serde(rename = "enableOccupancyControl", deserialize_with = "lenient")]
    pub enable_occupancy_control: Option<bool>,
    #[serde(rename = "retractOnPresent", deserialize_with = "lenient")]
    pub retract_on_present: Option<bool>,
    #[serde(rename = "occupancyActionDelay", deserialize_with = "lenient")]
    pub occupancy_action_delay_ms: Option<u32>,

    #[serde(rename = "deviceName", deserialize_with = "lenient")]
    pub device_name: Option<String>,
    #[serde(rename = "deviceLocation", deserialize_with = "lenient")]
    pub device_location: Option<String>,
}

/// Decode into `Option<T>`; any type mismatch becomes `None` instead of a
/// record-level error.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_requested_state<'de, D>(deserializer: D) -> Result<Option<RequestedState>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_str().and_then(RequestedState::parse))
}
