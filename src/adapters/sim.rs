//! Simulated board peripherals for host builds.
//!
//! Used by the `apic-sim` binary and by the test suites.  The I2C bus and
//! output pins implement the `embedded-hal` traits so the real drivers in
//! [`crate::drivers`] run unchanged on top of them.
//!
//! Edge lines are modelled as periodic sources: once enabled, a line fires
//! every `period_us`, the first edge `phase_us` after the enable.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::time::Instant;

use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

use crate::app::ports::{AnalogPort, BusPort, ClockPort, InterruptPort, Line, SignalPort};
use crate::drivers::potentiometer::PotentiometerBus;
use crate::drivers::signals::SignalPins;
use crate::error::Result;
use crate::protocol::codec::ADC_MAX;
use crate::protocol::{GAIN_POT_ADDR, THRESHOLD_POT_ADDR};

// ── I2C ───────────────────────────────────────────────────────

/// Bus of single-register wiper devices keyed by address.
#[derive(Debug, Default, Clone)]
pub struct SimI2c {
    devices: BTreeMap<u8, u8>,
}

impl SimI2c {
    pub fn with_devices(addrs: &[u8]) -> Self {
        Self {
            devices: addrs.iter().map(|a| (*a, 0)).collect(),
        }
    }

    /// Current wiper position at `addr`.
    pub fn position(&self, addr: u8) -> Option<u8> {
        self.devices.get(&addr).copied()
    }
}

impl ErrorType for SimI2c {
    type Error = ErrorKind;
}

impl I2c for SimI2c {
    fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> core::result::Result<(), ErrorKind> {
        let Some(wiper) = self.devices.get_mut(&address) else {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        };
        for op in operations {
            match op {
                // [instruction, value]; a bare address probe carries no bytes.
                Operation::Write(bytes) => {
                    if let [_, value, ..] = bytes {
                        *wiper = *value;
                    }
                }
                Operation::Read(buf) => buf.fill(*wiper),
            }
        }
        Ok(())
    }
}

// ── Output pin ────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
pub struct SimPin {
    high: bool,
    rising: u32,
}

impl SimPin {
    pub fn is_high(&self) -> bool {
        self.high
    }

    /// Low→high transitions seen so far.
    pub fn rising_edges(&self) -> u32 {
        self.rising
    }
}

impl PinErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> core::result::Result<(), Infallible> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> core::result::Result<(), Infallible> {
        if !self.high {
            self.rising += 1;
        }
        self.high = true;
        Ok(())
    }
}

// ── ADC ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum SimAdc {
    /// Every conversion returns the same value.
    Constant(u16),
    /// Pseudo-random 12-bit values from a linear congruential generator.
    Noise { state: u32 },
}

impl AnalogPort for SimAdc {
    fn read_timed(&mut self, out: &mut [u16]) {
        match self {
            Self::Constant(v) => out.fill(*v & ADC_MAX),
            Self::Noise { state } => {
                for s in out {
                    *state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                    *s = (*state >> 20) as u16 & ADC_MAX;
                }
            }
        }
    }
}

// ── Clock ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum SimClock {
    /// Time only moves when the device sleeps or relaxes.
    Virtual { now_us: u64, relax_step_us: u64 },
    /// Wall-clock time.
    Real { origin: Instant },
}

impl SimClock {
    pub fn virtual_clock(relax_step_us: u64) -> Self {
        Self::Virtual {
            now_us: 0,
            relax_step_us,
        }
    }

    pub fn real() -> Self {
        Self::Real {
            origin: Instant::now(),
        }
    }
}

impl ClockPort for SimClock {
    fn now_us(&mut self) -> u64 {
        match self {
            Self::Virtual { now_us, .. } => *now_us,
            Self::Real { origin } => origin.elapsed().as_micros() as u64,
        }
    }

    fn sleep_ms(&mut self, ms: u32) {
        match self {
            Self::Virtual { now_us, .. } => *now_us += u64::from(ms) * 1000,
            Self::Real { .. } => std::thread::sleep(std::time::Duration::from_millis(u64::from(ms))),
        }
    }

    fn relax(&mut self) {
        match self {
            Self::Virtual { now_us, relax_step_us } => *now_us += *relax_step_us,
            Self::Real { .. } => std::thread::yield_now(),
        }
    }
}

// ── Edge lines ────────────────────────────────────────────────

/// Periodic edge source.
#[derive(Debug, Clone, Copy)]
pub struct EdgeSource {
    pub period_us: u64,
    pub phase_us: u64,
}

#[derive(Debug, Clone, Copy)]
struct EdgeLine {
    source: Option<EdgeSource>,
    /// Enable time, or `None` while disabled.
    armed_at: Option<u64>,
    /// Edges already handed out since `armed_at`.
    taken: u64,
}

impl EdgeLine {
    const fn idle(source: Option<EdgeSource>) -> Self {
        Self {
            source,
            armed_at: None,
            taken: 0,
        }
    }

    fn fired_by(&self, now_us: u64) -> u64 {
        match (self.source, self.armed_at) {
            (Some(src), Some(t0)) if src.period_us > 0 => {
                let since = now_us.saturating_sub(t0);
                if since < src.phase_us {
                    0
                } else {
                    (since - src.phase_us) / src.period_us + 1
                }
            }
            _ => 0,
        }
    }
}

// ── Board ─────────────────────────────────────────────────────

/// Complete simulated board.
pub struct SimBoard {
    pub adc: SimAdc,
    pub signals: SignalPins<SimPin>,
    pub bus: PotentiometerBus<SimI2c>,
    pub clock: SimClock,
    burst: EdgeLine,
    rate: EdgeLine,
}

impl SimBoard {
    /// Both potentiometers present, constant ADC, virtual clock, no edges.
    pub fn new() -> Self {
        Self {
            adc: SimAdc::Constant(0),
            signals: SignalPins::new(SimPin::default(), SimPin::default(), SimPin::default()),
            bus: PotentiometerBus::new(SimI2c::with_devices(&[GAIN_POT_ADDR, THRESHOLD_POT_ADDR])),
            clock: SimClock::virtual_clock(10),
            burst: EdgeLine::idle(None),
            rate: EdgeLine::idle(None),
        }
    }

    pub fn with_adc(mut self, adc: SimAdc) -> Self {
        self.adc = adc;
        self
    }

    pub fn with_bus(mut self, devices: &[u8]) -> Self {
        self.bus = PotentiometerBus::new(SimI2c::with_devices(devices));
        self
    }

    pub fn with_clock(mut self, clock: SimClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_edges(mut self, line: Line, source: EdgeSource) -> Self {
        *self.line_mut(line) = EdgeLine::idle(Some(source));
        self
    }

    pub fn is_enabled(&self, line: Line) -> bool {
        match line {
            Line::Burst => self.burst.armed_at.is_some(),
            Line::Rate => self.rate.armed_at.is_some(),
        }
    }

    fn line_mut(&mut self, line: Line) -> &mut EdgeLine {
        match line {
            Line::Burst => &mut self.burst,
            Line::Rate => &mut self.rate,
        }
    }
}

impl Default for SimBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalogPort for SimBoard {
    fn read_timed(&mut self, out: &mut [u16]) {
        self.adc.read_timed(out);
    }
}

impl SignalPort for SimBoard {
    fn set_polarity(&mut self, bit: bool) {
        self.signals.set_polarity(bit);
    }

    fn set_test_pulse(&mut self, on: bool) {
        self.signals.set_test_pulse(on);
    }

    fn pulse_clear(&mut self) {
        self.signals.pulse_clear();
    }
}

impl BusPort for SimBoard {
    fn is_ready(&mut self, addr: u8) -> bool {
        self.bus.is_ready(addr)
    }

    fn read_byte(&mut self, addr: u8) -> Result<u8> {
        self.bus.read_byte(addr)
    }

    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<()> {
        self.bus.write(addr, bytes)
    }

    fn scan(&mut self, out: &mut [u8]) -> usize {
        self.bus.scan(out)
    }
}

impl InterruptPort for SimBoard {
    fn enable(&mut self, line: Line) {
        let now = self.clock.now_us();
        let l = self.line_mut(line);
        l.armed_at = Some(now);
        l.taken = 0;
    }

    fn disable(&mut self, line: Line) {
        self.line_mut(line).armed_at = None;
    }

    fn take_latched(&mut self, line: Line) -> u32 {
        let now = self.clock.now_us();
        let l = self.line_mut(line);
        let fired = l.fired_by(now);
        let fresh = fired.saturating_sub(l.taken);
        l.taken = fired;
        u32::try_from(fresh).unwrap_or(u32::MAX)
    }
}

impl ClockPort for SimBoard {
    fn now_us(&mut self) -> u64 {
        self.clock.now_us()
    }

    fn sleep_ms(&mut self, ms: u32) {
        self.clock.sleep_ms(ms);
    }

    fn relax(&mut self) {
        self.clock.relax();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_line_never_fires() {
        let mut board = SimBoard::new().with_edges(
            Line::Rate,
            EdgeSource {
                period_us: 100,
                phase_us: 0,
            },
        );
        board.sleep_ms(10);
        assert_eq!(board.take_latched(Line::Rate), 0);
    }

    #[test]
    fn periodic_edges_are_counted_once() {
        let mut board = SimBoard::new().with_edges(
            Line::Rate,
            EdgeSource {
                period_us: 200_000,
                phase_us: 100_000,
            },
        );
        board.enable(Line::Rate);
        board.sleep_ms(99);
        assert_eq!(board.take_latched(Line::Rate), 0);
        board.sleep_ms(1);
        assert_eq!(board.take_latched(Line::Rate), 1);
        board.sleep_ms(2900);
        assert_eq!(board.take_latched(Line::Rate), 14);
        assert_eq!(board.take_latched(Line::Rate), 0);
    }

    #[test]
    fn noise_adc_stays_within_twelve_bits() {
        let mut adc = SimAdc::Noise { state: 7 };
        let mut buf = [0u16; 64];
        adc.read_timed(&mut buf);
        assert!(buf.iter().all(|s| *s <= ADC_MAX));
        assert!(buf.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn probe_without_bytes_does_not_move_wiper() {
        let mut bus = SimI2c::with_devices(&[0x2C]);
        bus.write(0x2C, &[0x00, 9]).unwrap();
        bus.write(0x2C, &[]).unwrap();
        assert_eq!(bus.position(0x2C), Some(9));
    }
}
