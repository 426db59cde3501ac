//! DHT22 temperature/humidity sensor, single-wire protocol.
//!
//! The read sequence bit-bangs the DHT handshake: pull the line low for
//! 2 ms, release, then sample 40 data bits by measuring each high-pulse
//! width (≈28 µs = 0, ≈70 µs = 1), and verify the checksum byte.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: bit-bangs the data GPIO with interrupt-unsafe timing, so
//! reads must come from the single control-loop task.
//! On host/test: reads from static atomics for injection.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU32, Ordering};

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;
use crate::error::SensorError;

#[cfg(not(target_os = "espidf"))]
static SIM_TEMP_MILLI_C: AtomicU32 = AtomicU32::new(25_000);
#[cfg(not(target_os = "espidf"))]
static SIM_HUMIDITY_MILLI_PCT: AtomicU32 = AtomicU32::new(50_000);

/// Inject a simulated reading (milli-degrees / milli-percent).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_climate(temp_milli_c: u32, humidity_milli_pct: u32) {
    SIM_TEMP_MILLI_C.store(temp_milli_c, Ordering::Relaxed);
    SIM_HUMIDITY_MILLI_PCT.store(humidity_milli_pct, Ordering::Relaxed);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    pub celsius: f32,
    pub humidity_pct: f32,
}

pub struct ClimateSensor {
    _data_gpio: i32,
}

impl ClimateSensor {
    pub fn new(data_gpio: i32) -> Self {
        Self { _data_gpio: data_gpio }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn read(&mut self) -> Result<ClimateReading, SensorError> {
        Ok(ClimateReading {
            celsius: SIM_TEMP_MILLI_C.load(Ordering::Relaxed) as f32 / 1_000.0,
            humidity_pct: SIM_HUMIDITY_MILLI_PCT.load(Ordering::Relaxed) as f32 / 1_000.0,
        })
    }

    #[cfg(target_os = "espidf")]
    pub fn read(&mut self) -> Result<ClimateReading, SensorError> {
        let bytes = self.read_raw_bits().ok_or(SensorError::ReadFailed)?;
        decode(bytes)
    }

    /// One DHT22 transaction: start signal, response handshake, 40 bits.
    #[cfg(target_os = "espidf")]
    fn read_raw_bits(&mut self) -> Option<[u8; 5]> {
        use esp_idf_svc::sys::*;

        let pin = self._data_gpio;

        // Start signal: drive low for 2 ms, then release to input.
        unsafe {
            gpio_set_direction(pin, gpio_mode_t_GPIO_MODE_OUTPUT);
        }
        hw_init::gpio_write(pin, false);
        hw_init::delay_us(2_000);
        hw_init::gpio_write(pin, true);
        hw_init::delay_us(30);
        unsafe {
            gpio_set_direction(pin, gpio_mode_t_GPIO_MODE_INPUT);
        }

        // Sensor response: 80 µs low then 80 µs high.
        hw_init::pulse_in_us(pin, true, 200)?;

        // 40 data bits: each is a 50 µs low followed by a high whose width
        // encodes the bit.
        let mut bytes = [0u8; 5];
        for i in 0..40 {
            let width = hw_init::pulse_in_us(pin, true, 200)?;
            if width > 48 {
                bytes[i / 8] |= 1 << (7 - (i % 8));
            }
        }
        Some(bytes)
    }
}

/// Decode the 5-byte frame: humidity, temperature (0.1 units, sign bit in
/// the temperature high byte) and checksum.
#[allow(dead_code)]
fn decode(bytes: [u8; 5]) -> Result<ClimateReading, SensorError> {
    let sum = bytes[0]
        .wrapping_add(bytes[1])
        .wrapping_add(bytes[2])
        .wrapping_add(bytes[3]);
    if sum != bytes[4] {
        return Err(SensorError::ReadFailed);
    }

    let humidity_pct = f32::from(u16::from_be_bytes([bytes[0], bytes[1]])) / 10.0;
    let raw_temp = u16::from_be_bytes([bytes[2] & 0x7F, bytes[3]]);
    let mut celsius = f32::from(raw_temp) / 10.0;
    if bytes[2] & 0x80 != 0 {
        celsius = -celsius;
    }

    if !(-40.0..=80.0).contains(&celsius) || !(0.0..=100.0).contains(&humidity_pct) {
        return Err(SensorError::OutOfRange);
    }
    Ok(ClimateReading {
        celsius,
        humidity_pct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_nominal_frame() {
        // 55.2 % RH, 25.6 °C.
        let bytes = [0x02, 0x28, 0x01, 0x00, 0x2B];
        let r = decode(bytes).unwrap();
        assert!((r.humidity_pct - 55.2).abs() < 0.05);
        assert!((r.celsius - 25.6).abs() < 0.05);
    }

    #[test]
    fn decode_negative_temperature() {
        // -10.0 °C: sign bit set in the temperature high byte.
        let bytes = [0x01, 0xF4, 0x80, 0x64, 0xD9];
        let r = decode(bytes).unwrap();
        assert!((r.celsius + 10.0).abs() < 0.05);
    }

    #[test]
    fn bad_checksum_is_rejected() {
        let bytes = [0x02, 0x28, 0x01, 0x00, 0xFF];
        assert_eq!(decode(bytes), Err(SensorError::ReadFailed));
    }
}
