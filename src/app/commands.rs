//! Decoded device commands.
//!
//! Each known [`Opcode`] maps to exactly one `Command`; the fixed
//! parameter implied by the subcode travels in the variant.

use core::fmt;

use crate::protocol::opcode::{self, Opcode};
use crate::protocol::{Polarity, Potentiometer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Reply with the gain then the threshold wiper position.
    ReadPotentiometers,
    /// Reply with up to two responding bus addresses.
    ScanBus,
    /// Read one position byte and write it to the wiper.
    WritePotentiometer(Potentiometer),
    /// Read a u32 count and stream that many timed samples.
    StartStreaming,
    /// Read a u64 count and capture that many edge-triggered groups.
    StartBurst,
    /// Read a u32 count and send that many polled groups.
    StartPolled,
    SetPolarity(Polarity),
    /// Count rate-line edges over the rate window and reply in Hz.
    MeasureRate,
    SetTestPulse(bool),
    /// Reply with the state label.
    GetState,
    /// Read a new state label.
    SetState,
}

impl Command {
    pub fn from_opcode(op: Opcode) -> Option<Self> {
        let cmd = match op {
            opcode::READ_POTENTIOMETERS => Self::ReadPotentiometers,
            opcode::SCAN_BUS => Self::ScanBus,
            opcode::WRITE_GAIN => Self::WritePotentiometer(Potentiometer::Gain),
            opcode::WRITE_THRESHOLD => Self::WritePotentiometer(Potentiometer::Threshold),
            opcode::START_STREAMING => Self::StartStreaming,
            opcode::START_BURST => Self::StartBurst,
            opcode::START_POLLED => Self::StartPolled,
            opcode::POLARITY_NEGATIVE => Self::SetPolarity(Polarity::Negative),
            opcode::POLARITY_POSITIVE => Self::SetPolarity(Polarity::Positive),
            opcode::MEASURE_RATE => Self::MeasureRate,
            opcode::TEST_PULSE_OFF => Self::SetTestPulse(false),
            opcode::TEST_PULSE_ON => Self::SetTestPulse(true),
            opcode::GET_STATE => Self::GetState,
            opcode::SET_STATE => Self::SetState,
            _ => return None,
        };
        Some(cmd)
    }

    pub fn opcode(self) -> Opcode {
        match self {
            Self::ReadPotentiometers => opcode::READ_POTENTIOMETERS,
            Self::ScanBus => opcode::SCAN_BUS,
            Self::WritePotentiometer(Potentiometer::Gain) => opcode::WRITE_GAIN,
            Self::WritePotentiometer(Potentiometer::Threshold) => opcode::WRITE_THRESHOLD,
            Self::StartStreaming => opcode::START_STREAMING,
            Self::StartBurst => opcode::START_BURST,
            Self::StartPolled => opcode::START_POLLED,
            Self::SetPolarity(Polarity::Negative) => opcode::POLARITY_NEGATIVE,
            Self::SetPolarity(Polarity::Positive) => opcode::POLARITY_POSITIVE,
            Self::MeasureRate => opcode::MEASURE_RATE,
            Self::SetTestPulse(false) => opcode::TEST_PULSE_OFF,
            Self::SetTestPulse(true) => opcode::TEST_PULSE_ON,
            Self::GetState => opcode::GET_STATE,
            Self::SetState => opcode::SET_STATE,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}", self, self.opcode())
    }
}
