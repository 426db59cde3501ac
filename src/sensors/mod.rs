//! Sensor subsystem — individual drivers and the aggregating [`SensorHub`].
//!
//! The hub owns every sensor driver and produces a [`SensorSnapshot`] each
//! cycle.  Faulted readings (DHT checksum failure, ultrasonic timeout,
//! implausible values) reuse the previous good value — a flaky sensor must
//! not crash or stall the control loop.

pub mod climate;
pub mod distance;
pub mod presence;
pub mod rain;

use log::warn;

use crate::control::context::SensorSnapshot;
use climate::ClimateSensor;
use distance::DistanceSensor;
use presence::PresenceSensor;
use rain::RainSensor;

/// Aggregates all sensor drivers and produces a unified snapshot.
pub struct SensorHub {
    pub climate: ClimateSensor,
    pub distance: DistanceSensor,
    pub rain: RainSensor,
    pub presence: PresenceSensor,
    last_good: SensorSnapshot,
}

impl SensorHub {
    /// Construct a new hub.  Pass in pre-built drivers (built in main
    /// where pin ownership is established).
    pub fn new(
        climate: ClimateSensor,
        distance: DistanceSensor,
        rain: RainSensor,
        presence: PresenceSensor,
    ) -> Self {
        Self {
            climate,
            distance,
            rain,
            presence,
            last_good: SensorSnapshot::default(),
        }
    }

    /// Read every sensor and return a unified snapshot.
    pub fn read_all(&mut self) -> SensorSnapshot {
        match self.climate.read() {
            Ok(reading) => {
                self.last_good.temperature_c = reading.celsius;
                self.last_good.humidity_pct = reading.humidity_pct;
            }
            Err(e) => warn!("climate: {}, keeping previous values", e),
        }

        match self.distance.read() {
            Ok(cm) => self.last_good.distance_cm = cm,
            Err(e) => warn!("distance: {}, keeping previous value", e),
        }

        // Digital reads cannot fault.
        self.last_good.rain_detected = self.rain.read();
        self.last_good.presence_detected = self.presence.read();

        self.last_good
    }

    /// Distance-only read for the transit polling loop; same stale-value
    /// retention as the full snapshot.
    pub fn read_distance(&mut self) -> f32 {
        if let Ok(cm) = self.distance.read() {
            self.last_good.distance_cm = cm;
        }
        self.last_good.distance_cm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pins;
    use std::sync::Mutex;

    // The sim statics are process-global; serialize the tests that poke them.
    static SIM_LOCK: Mutex<()> = Mutex::new(());

    fn make_hub() -> SensorHub {
        SensorHub::new(
            ClimateSensor::new(pins::DHT_GPIO),
            DistanceSensor::new(pins::ULTRASONIC_TRIG_GPIO, pins::ULTRASONIC_ECHO_GPIO),
            RainSensor::new(pins::RAIN_GPIO),
            PresenceSensor::new(pins::PIR_GPIO),
        )
    }

    #[test]
    fn faulted_distance_keeps_previous_value() {
        let _guard = SIM_LOCK.lock().unwrap();
        let mut hub = make_hub();
        distance::sim_set_distance_cm(42.0);
        assert_eq!(hub.read_all().distance_cm, 42.0);

        // Implausible reading: previous value retained.
        distance::sim_set_distance_cm(-1.0);
        assert_eq!(hub.read_all().distance_cm, 42.0);

        distance::sim_set_distance_cm(20.0);
    }

    #[test]
    fn snapshot_carries_all_channels() {
        let _guard = SIM_LOCK.lock().unwrap();
        let mut hub = make_hub();
        climate::sim_set_climate(31_500, 62_000);
        rain::sim_set_rain(true);
        presence::sim_set_motion(true);
        distance::sim_set_distance_cm(48.0);

        let snap = hub.read_all();
        assert!((snap.temperature_c - 31.5).abs() < 0.01);
        assert!((snap.humidity_pct - 62.0).abs() < 0.01);
        assert!(snap.rain_detected);
        assert!(snap.presence_detected);
        assert_eq!(snap.distance_cm, 48.0);

        climate::sim_set_climate(25_000, 50_000);
        rain::sim_set_rain(false);
        presence::sim_set_motion(false);
        distance::sim_set_distance_cm(20.0);
    }
}
