//! Front-end digital outputs: polarity select, test pulse enable and the
//! peak-hold clear strobe.
//!
//! Generic over `embedded_hal::digital::OutputPin`; the ESP-IDF build
//! hands in `PinDriver`s, host builds hand in simulated pins.

use embedded_hal::digital::{OutputPin, PinState};

use crate::app::ports::SignalPort;

pub struct SignalPins<P> {
    polarity: P,
    test_pulse: P,
    clear: P,
}

impl<P: OutputPin> SignalPins<P> {
    /// Take ownership of the three outputs and drive them to their
    /// power-on levels (negative polarity, test pulse off, clear low).
    pub fn new(polarity: P, test_pulse: P, clear: P) -> Self {
        let mut pins = Self {
            polarity,
            test_pulse,
            clear,
        };
        pins.set_polarity(false);
        pins.set_test_pulse(false);
        drive(&mut pins.clear, false);
        pins
    }

    pub fn polarity_pin(&self) -> &P {
        &self.polarity
    }

    pub fn test_pulse_pin(&self) -> &P {
        &self.test_pulse
    }

    pub fn clear_pin(&self) -> &P {
        &self.clear
    }
}

impl<P: OutputPin> SignalPort for SignalPins<P> {
    fn set_polarity(&mut self, bit: bool) {
        drive(&mut self.polarity, bit);
    }

    fn set_test_pulse(&mut self, on: bool) {
        drive(&mut self.test_pulse, on);
    }

    fn pulse_clear(&mut self) {
        drive(&mut self.clear, true);
        drive(&mut self.clear, false);
    }
}

fn drive<P: OutputPin>(pin: &mut P, high: bool) {
    if let Err(e) = pin.set_state(PinState::from(high)) {
        log::warn!("output pin: {e:?}");
    }
}
