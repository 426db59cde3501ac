//! One-shot hardware peripheral initialization and raw GPIO helpers.
//!
//! Configures GPIO directions using raw ESP-IDF sys calls.  Called once
//! from `main()` before the control loop starts.  Sensor drivers use the
//! read/write/pulse helpers below instead of touching the sys API
//! directly.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
        }
    }
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: called once from main() before the control loop; single-threaded.
    unsafe {
        init_gpio_inputs()?;
        init_gpio_outputs()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO inputs ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> Result<(), HwInitError> {
    let input_pins = [pins::PIR_GPIO, pins::RAIN_GPIO, pins::ULTRASONIC_ECHO_GPIO];

    for &pin in &input_pins {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
    }

    // Boot button: active-low with internal pull-up.
    let btn_cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::CONFIG_BUTTON_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&btn_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }

    info!("hw_init: GPIO inputs configured");
    Ok(())
}

// ── GPIO outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let output_pins = [pins::MOTOR_RELAY_GPIO, pins::ULTRASONIC_TRIG_GPIO];

    for &pin in &output_pins {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
        // Relay and trigger both idle low.
        unsafe {
            gpio_set_level(pin, 0);
        }
    }

    info!("hw_init: GPIO outputs configured");
    Ok(())
}

// ── Raw GPIO helpers ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn gpio_write(gpio: i32, high: bool) {
    unsafe {
        gpio_set_level(gpio, u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_gpio: i32, _high: bool) {}

#[cfg(target_os = "espidf")]
pub fn gpio_read(gpio: i32) -> bool {
    unsafe { gpio_get_level(gpio) != 0 }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_gpio: i32) -> bool {
    false
}

/// Microseconds since boot, for pulse timing.
#[cfg(target_os = "espidf")]
pub fn micros() -> u64 {
    (unsafe { esp_timer_get_time() }) as u64
}

#[cfg(not(target_os = "espidf"))]
pub fn micros() -> u64 {
    0
}

/// Busy-wait for `us` microseconds.  Only for the short pulses of the
/// ultrasonic trigger and the DHT start signal.
#[cfg(target_os = "espidf")]
pub fn delay_us(us: u32) {
    unsafe {
        esp_rom_delay_us(us);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn delay_us(_us: u32) {}

/// Measure the duration of the next `high` (or low) pulse on `gpio`,
/// in microseconds.  Returns `None` on timeout.
#[cfg(target_os = "espidf")]
pub fn pulse_in_us(gpio: i32, level: bool, timeout_us: u64) -> Option<u64> {
    let deadline = micros() + timeout_us;

    // Wait for any previous pulse to end.
    while gpio_read(gpio) == level {
        if micros() > deadline {
            return None;
        }
    }
    // Wait for the pulse to start.
    while gpio_read(gpio) != level {
        if micros() > deadline {
            return None;
        }
    }
    let start = micros();
    // Wait for it to end.
    while gpio_read(gpio) == level {
        if micros() > deadline {
            return None;
        }
    }
    Some(micros() - start)
}

#[cfg(not(target_os = "espidf"))]
pub fn pulse_in_us(_gpio: i32, _level: bool, _timeout_us: u64) -> Option<u64> {
    None
}
