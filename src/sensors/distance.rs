//! HC-SR04 ultrasonic distance sensor.
//!
//! A 10 µs trigger pulse starts a ranging cycle; the echo pulse width in
//! microseconds divided by 58 gives centimetres.  Readings outside the
//! sensor's physical range (0 < d < 400 cm) are rejected and the caller
//! keeps the previous good value.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: bit-bangs trigger/echo via `hw_init`.
//! On host/test: reads from a static atomic for injection.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU32, Ordering};

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;
use crate::error::SensorError;

/// Stored as `f32::to_bits` so the atomic can carry fractional centimetres.
#[cfg(not(target_os = "espidf"))]
static SIM_DISTANCE_CM_BITS: AtomicU32 = AtomicU32::new(0x41A0_0000); // 20.0

/// Inject a simulated distance reading.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_distance_cm(cm: f32) {
    SIM_DISTANCE_CM_BITS.store(cm.to_bits(), Ordering::Relaxed);
}

/// Echo wait budget: 400 cm round trip is ~23 ms; 30 ms leaves margin.
#[cfg(target_os = "espidf")]
const ECHO_TIMEOUT_US: u64 = 30_000;

const MAX_RANGE_CM: f32 = 400.0;

pub struct DistanceSensor {
    _trig_gpio: i32,
    _echo_gpio: i32,
}

impl DistanceSensor {
    pub fn new(trig_gpio: i32, echo_gpio: i32) -> Self {
        Self {
            _trig_gpio: trig_gpio,
            _echo_gpio: echo_gpio,
        }
    }

    /// One ranging cycle.
    #[cfg(target_os = "espidf")]
    pub fn read(&mut self) -> Result<f32, SensorError> {
        hw_init::gpio_write(self._trig_gpio, false);
        hw_init::delay_us(2);
        hw_init::gpio_write(self._trig_gpio, true);
        hw_init::delay_us(10);
        hw_init::gpio_write(self._trig_gpio, false);

        let width =
            hw_init::pulse_in_us(self._echo_gpio, true, ECHO_TIMEOUT_US).ok_or(SensorError::ReadFailed)?;
        plausible(width as f32 / 58.0)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn read(&mut self) -> Result<f32, SensorError> {
        plausible(f32::from_bits(SIM_DISTANCE_CM_BITS.load(Ordering::Relaxed)))
    }
}

fn plausible(cm: f32) -> Result<f32, SensorError> {
    if cm.is_nan() {
        Err(SensorError::NotANumber)
    } else if cm > 0.0 && cm < MAX_RANGE_CM {
        Ok(cm)
    } else {
        Err(SensorError::OutOfRange)
    }
}
