//! Low-level hardware drivers (GPIO init plus the motor relay).

pub mod hw_init;
pub mod relay;
