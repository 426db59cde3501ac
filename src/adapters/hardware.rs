//! Hardware adapter — bridges real peripherals to domain port traits.
//!
//! Owns the [`SensorHub`] and the motor relay, exposing them through
//! [`SensorPort`] and [`ActuatorPort`].  This is the only module in the
//! system that touches actual hardware.  On non-espidf targets, the
//! underlying drivers use cfg-gated simulation backends.

use crate::app::ports::{ActuatorPort, SensorPort};
use crate::control::context::SensorSnapshot;
use crate::drivers::relay::RelayDriver;
use crate::pins;
use crate::sensors::climate::ClimateSensor;
use crate::sensors::distance::DistanceSensor;
use crate::sensors::presence::PresenceSensor;
use crate::sensors::rain::RainSensor;
use crate::sensors::SensorHub;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    hub: SensorHub,
    relay: RelayDriver,
}

impl HardwareAdapter {
    pub fn new(hub: SensorHub, relay: RelayDriver) -> Self {
        Self { hub, relay }
    }

    /// Build the adapter with the standard pin map.
    pub fn with_default_pins() -> Self {
        let hub = SensorHub::new(
            ClimateSensor::new(pins::DHT_GPIO),
            DistanceSensor::new(pins::ULTRASONIC_TRIG_GPIO, pins::ULTRASONIC_ECHO_GPIO),
            RainSensor::new(pins::RAIN_GPIO),
            PresenceSensor::new(pins::PIR_GPIO),
        );
        Self::new(hub, RelayDriver::new())
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl SensorPort for HardwareAdapter {
    fn read_all(&mut self) -> SensorSnapshot {
        self.hub.read_all()
    }

    fn read_distance(&mut self) -> f32 {
        self.hub.read_distance()
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl ActuatorPort for HardwareAdapter {
    fn motor_on(&mut self) {
        self.relay.engage();
    }

    fn motor_off(&mut self) {
        self.relay.disengage();
    }

    fn is_motor_on(&self) -> bool {
        self.relay.is_engaged()
    }
}
