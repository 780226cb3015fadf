//! Hardware adapter: bridges the ESP32 peripherals to the board ports.
//!
//! Owns the potentiometer bus and the front-end outputs, and forwards the
//! analog, edge and clock ports to the raw helpers in
//! [`hw_init`](crate::drivers::hw_init).  This is the only module that
//! touches real hardware.

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{AnyIOPin, AnyOutputPin, Output, PinDriver};
use esp_idf_hal::i2c::{I2C0, I2cConfig, I2cDriver};
use esp_idf_hal::units::Hertz;

use crate::app::ports::{AnalogPort, BusPort, ClockPort, InterruptPort, Line, SignalPort};
use crate::drivers::hw_init;
use crate::drivers::potentiometer::PotentiometerBus;
use crate::drivers::signals::SignalPins;
use crate::error::Result;
use crate::pins;

type OutPin = PinDriver<'static, AnyOutputPin, Output>;

/// Concrete board backed by ESP-IDF drivers.
pub struct HardwareBoard {
    bus: PotentiometerBus<I2cDriver<'static>>,
    signals: SignalPins<OutPin>,
    relax_us: u32,
}

impl HardwareBoard {
    /// Take the I2C controller and the output pins.  `relax_us` is the
    /// busy-wait between edge polls while an acquisition spins.
    pub fn new(
        i2c: I2C0,
        sda: AnyIOPin,
        scl: AnyIOPin,
        polarity: AnyOutputPin,
        test_pulse: AnyOutputPin,
        clear: AnyOutputPin,
        relax_us: u32,
    ) -> anyhow::Result<Self> {
        let config = I2cConfig::new().baudrate(Hertz(pins::I2C_BAUDRATE_HZ));
        let i2c = I2cDriver::new(i2c, sda, scl, &config)?;
        let signals = SignalPins::new(
            PinDriver::output(polarity)?,
            PinDriver::output(test_pulse)?,
            PinDriver::output(clear)?,
        );
        Ok(Self {
            bus: PotentiometerBus::new(i2c),
            signals,
            relax_us,
        })
    }
}

impl AnalogPort for HardwareBoard {
    fn read_timed(&mut self, out: &mut [u16]) {
        hw_init::adc_read_timed(out);
    }
}

impl SignalPort for HardwareBoard {
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

impl BusPort for HardwareBoard {
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

impl InterruptPort for HardwareBoard {
    fn enable(&mut self, line: Line) {
        hw_init::edge_enable(line);
    }

    fn disable(&mut self, line: Line) {
        hw_init::edge_disable(line);
    }

    fn take_latched(&mut self, line: Line) -> u32 {
        hw_init::edge_take(line)
    }
}

impl ClockPort for HardwareBoard {
    fn now_us(&mut self) -> u64 {
        hw_init::now_us()
    }

    fn sleep_ms(&mut self, ms: u32) {
        FreeRtos::delay_ms(ms);
    }

    fn relax(&mut self) {
        hw_init::delay_us(self.relax_us);
    }
}
