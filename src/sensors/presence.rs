//! PIR motion sensor.
//!
//! Reports the raw pin level; the sticky hold window and the action delay
//! live in the occupancy debouncer, not here.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads the digital GPIO (HIGH = motion).
//! On host/test: reads from a static atomic for injection.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, Ordering};

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;

#[cfg(not(target_os = "espidf"))]
static SIM_MOTION: AtomicBool = AtomicBool::new(false);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_motion(motion: bool) {
    SIM_MOTION.store(motion, Ordering::Relaxed);
}

pub struct PresenceSensor {
    _gpio: i32,
}

impl PresenceSensor {
    pub fn new(gpio: i32) -> Self {
        Self { _gpio: gpio }
    }

    #[cfg(target_os = "espidf")]
    pub fn read(&mut self) -> bool {
        hw_init::gpio_read(self._gpio)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn read(&mut self) -> bool {
        SIM_MOTION.load(Ordering::Relaxed)
    }
}
