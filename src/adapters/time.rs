//! Clock adapter.
//!
//! Implements the [`Clock`] port:
//!
//! - **`target_os = "espidf"`** — milliseconds from `esp_timer_get_time()`
//!   (monotonic, microsecond precision); sleeps yield to FreeRTOS through
//!   `std::thread::sleep`.
//! - **`not(target_os = "espidf")`** — `std::time::Instant` for host-side
//!   testing and simulation.

use std::time::Duration;

use crate::app::ports::Clock;

pub struct Esp32Clock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32Clock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }
}

impl Clock for Esp32Clock {
    #[cfg(target_os = "espidf")]
    fn now_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    #[cfg(not(target_os = "espidf"))]
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn sleep_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}
