//! Motor relay driver.
//!
//! A single relay powers the hanger motor; direction is handled by the
//! mechanism itself, so the driver is strictly on/off.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the relay coil GPIO.
//! On host/test: tracks state in-memory only.

use log::debug;

use crate::drivers::hw_init;
use crate::pins;

pub struct RelayDriver {
    engaged: bool,
}

impl Default for RelayDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayDriver {
    pub fn new() -> Self {
        Self { engaged: false }
    }

    pub fn engage(&mut self) {
        if !self.engaged {
            debug!("relay: engage");
        }
        hw_init::gpio_write(pins::MOTOR_RELAY_GPIO, true);
        self.engaged = true;
    }

    /// Idempotent; called unconditionally on every transit exit path.
    pub fn disengage(&mut self) {
        if self.engaged {
            debug!("relay: disengage");
        }
        hw_init::gpio_write(pins::MOTOR_RELAY_GPIO, false);
        self.engaged = false;
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disengage_is_idempotent() {
        let mut relay = RelayDriver::new();
        relay.disengage();
        relay.disengage();
        assert!(!relay.is_engaged());
        relay.engage();
        assert!(relay.is_engaged());
        relay.disengage();
        assert!(!relay.is_engaged());
    }
}
