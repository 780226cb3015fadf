//! GPIO / peripheral pin assignments for the APIC carrier board.
//!
//! Single source of truth. Every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Analog front end (ADC1)
// ---------------------------------------------------------------------------

/// Pulse-stretcher output, sampled by every acquisition mode.
/// ADC1 channel 3 (GPIO 4 on ESP32-S3).
pub const PEAK_ADC_GPIO: i32 = 4;
pub const PEAK_ADC_CHANNEL: u32 = 3;

/// Microseconds between the four conversions of one timed read.
pub const TIMED_READ_SPACING_US: u32 = 1;

// ---------------------------------------------------------------------------
// Edge inputs
// ---------------------------------------------------------------------------

/// Peak-detected edge, rising.  Drives burst capture.
pub const BURST_EDGE_GPIO: i32 = 5;
/// Comparator edge, rising.  Counted by the rate mode.
pub const RATE_EDGE_GPIO: i32 = 6;

// ---------------------------------------------------------------------------
// Digital outputs
// ---------------------------------------------------------------------------

/// Polarity select.  LOW = negative pulses, HIGH = positive.
pub const POLARITY_GPIO: i32 = 7;
/// Peak-hold clear strobe.
pub const CLEAR_GPIO: i32 = 15;
/// Clear mode select.  HIGH disables manual clearing (automatic mode).
pub const CLEAR_MODE_GPIO: i32 = 16;
/// On-board test pulse generator enable.
pub const TEST_PULSE_GPIO: i32 = 17;

// ---------------------------------------------------------------------------
// I2C (potentiometer bus)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 8;
pub const I2C_SCL_GPIO: i32 = 9;
pub const I2C_BAUDRATE_HZ: u32 = 400_000;
