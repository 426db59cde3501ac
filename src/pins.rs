//! GPIO pin assignments for the hanger controller board.
//!
//! Single source of truth — every driver references this module rather
//! than hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Motor (single relay, one direction toggle per transit)
// ---------------------------------------------------------------------------

/// Digital output: motor relay coil (active HIGH).
pub const MOTOR_RELAY_GPIO: i32 = 2;

// ---------------------------------------------------------------------------
// Sensors — digital
// ---------------------------------------------------------------------------

/// DHT22 temperature/humidity sensor, single-wire protocol.
pub const DHT_GPIO: i32 = 4;

/// PIR motion sensor output. HIGH = motion.
pub const PIR_GPIO: i32 = 19;

/// Rain sensor digital output. LOW = rain detected (comparator board).
pub const RAIN_GPIO: i32 = 34;

// ---------------------------------------------------------------------------
// Sensors — ultrasonic (HC-SR04)
// ---------------------------------------------------------------------------

/// Digital output: ultrasonic trigger pulse.
pub const ULTRASONIC_TRIG_GPIO: i32 = 25;
/// Digital input: ultrasonic echo pulse.
pub const ULTRASONIC_ECHO_GPIO: i32 = 26;

// ---------------------------------------------------------------------------
// User button (boot button, active-low)
// ---------------------------------------------------------------------------

/// Hold at boot to factory-reset the stored configuration.
pub const CONFIG_BUTTON_GPIO: i32 = 0;
