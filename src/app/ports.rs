//! Port traits: the boundary between acquisition logic and the board.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Device dispatcher / acquisition modes
//! ```
//!
//! Board adapters (ESP32 peripherals, simulated peripherals, test mocks)
//! implement these traits.  The [`Device`](super::dispatcher::Device)
//! consumes them via generics, so no handler touches hardware directly.

use crate::error::Result;

// ───────────────────────────────────────────────────────────────
// Analog port (board → domain)
// ───────────────────────────────────────────────────────────────

/// Hardware-timed analog sampling.
pub trait AnalogPort {
    /// Fill `out` with consecutive 12-bit conversions taken at the
    /// board's fixed sample clock.  Blocks for the duration of the read.
    fn read_timed(&mut self, out: &mut [u16]);
}

// ───────────────────────────────────────────────────────────────
// Signal port (domain → board)
// ───────────────────────────────────────────────────────────────

/// Digital outputs on the front end.
pub trait SignalPort {
    /// Drive the polarity select line (0 = negative).
    fn set_polarity(&mut self, bit: bool);

    /// Enable or disable the on-board test pulse generator.
    fn set_test_pulse(&mut self, on: bool);

    /// Strobe the peak-hold clear line high then low.
    fn pulse_clear(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Bus port (domain ↔ potentiometers)
// ───────────────────────────────────────────────────────────────

/// Two-wire bus carrying the digital potentiometers.
pub trait BusPort {
    /// Whether a device acknowledges at `addr`.
    fn is_ready(&mut self, addr: u8) -> bool;

    /// Read one byte from `addr`.
    fn read_byte(&mut self, addr: u8) -> Result<u8>;

    /// Write `bytes` to `addr`.
    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<()>;

    /// Probe the bus, writing responding addresses into `out` in probe
    /// order.  Returns how many were found (at most `out.len()`).
    fn scan(&mut self, out: &mut [u8]) -> usize;
}

// ───────────────────────────────────────────────────────────────
// Interrupt port (board → domain)
// ───────────────────────────────────────────────────────────────

/// The two edge-triggered inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    /// Peak-detected edge that triggers a burst capture.
    Burst,
    /// Comparator edge counted by the rate mode.
    Rate,
}

/// Edge interrupt control.
///
/// Adapters only latch edges (a GPIO ISR bumping an atomic, or a timer
/// model in simulation).  The edge body runs from the dispatcher's spin
/// loop once for every edge returned by [`take_latched`](Self::take_latched).
pub trait InterruptPort {
    fn enable(&mut self, line: Line);

    fn disable(&mut self, line: Line);

    /// Edges seen on `line` since the previous call.  Always 0 while the
    /// line is disabled.
    fn take_latched(&mut self, line: Line) -> u32;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time source.
pub trait ClockPort {
    /// Microseconds since an arbitrary fixed origin.
    fn now_us(&mut self) -> u64;

    fn sleep_ms(&mut self, ms: u32);

    /// Short cooperative pause inside spin loops.
    fn relax(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Board
// ───────────────────────────────────────────────────────────────

/// Everything the device agent needs from the hardware.
pub trait Board: AnalogPort + SignalPort + BusPort + InterruptPort + ClockPort {}

impl<T: AnalogPort + SignalPort + BusPort + InterruptPort + ClockPort> Board for T {}
