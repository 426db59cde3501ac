//! Rain sensor (comparator board, digital output).
//!
//! The comparator pulls the line LOW when the sensing grid is wet, so the
//! reading is inverted here and the rest of the system only ever sees
//! `true` = rain.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads the digital GPIO.
//! On host/test: reads from a static atomic for injection.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, Ordering};

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;

#[cfg(not(target_os = "espidf"))]
static SIM_RAIN: AtomicBool = AtomicBool::new(false);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_rain(raining: bool) {
    SIM_RAIN.store(raining, Ordering::Relaxed);
}

pub struct RainSensor {
    _gpio: i32,
}

impl RainSensor {
    pub fn new(gpio: i32) -> Self {
        Self { _gpio: gpio }
    }

    #[cfg(target_os = "espidf")]
    pub fn read(&mut self) -> bool {
        // Active low.
        !hw_init::gpio_read(self._gpio)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn read(&mut self) -> bool {
        SIM_RAIN.load(Ordering::Relaxed)
    }
}
