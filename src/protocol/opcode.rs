//! Two-byte opcodes.
//!
//! Wire format:
//! ```text
//! ┌──────────┬─────────┐
//! │ category │ subcode │
//! │   u8     │   u8    │
//! └──────────┴─────────┘
//! ```

use core::fmt;

/// A `(category, subcode)` operation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode {
    pub category: u8,
    pub subcode: u8,
}

impl Opcode {
    /// Size of every request on the wire.
    pub const LEN: usize = 2;

    pub const fn new(category: u8, subcode: u8) -> Self {
        Self { category, subcode }
    }

    pub const fn to_bytes(self) -> [u8; 2] {
        [self.category, self.subcode]
    }

    /// Decode the first two bytes of a datagram.
    /// Returns `None` if fewer than two bytes arrived.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [category, subcode, ..] => Some(Self::new(*category, *subcode)),
            _ => None,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.category, self.subcode)
    }
}

// ── Opcode table ──────────────────────────────────────────────

pub const READ_POTENTIOMETERS: Opcode = Opcode::new(0, 0);
pub const SCAN_BUS: Opcode = Opcode::new(0, 2);
pub const WRITE_GAIN: Opcode = Opcode::new(1, 0);
pub const WRITE_THRESHOLD: Opcode = Opcode::new(1, 1);
pub const START_STREAMING: Opcode = Opcode::new(2, 0);
pub const START_BURST: Opcode = Opcode::new(2, 1);
pub const START_POLLED: Opcode = Opcode::new(3, 0);
pub const POLARITY_NEGATIVE: Opcode = Opcode::new(4, 0);
pub const POLARITY_POSITIVE: Opcode = Opcode::new(4, 1);
pub const MEASURE_RATE: Opcode = Opcode::new(5, 1);
pub const TEST_PULSE_OFF: Opcode = Opcode::new(6, 0);
pub const TEST_PULSE_ON: Opcode = Opcode::new(6, 1);
pub const GET_STATE: Opcode = Opcode::new(7, 0);
pub const SET_STATE: Opcode = Opcode::new(7, 1);
