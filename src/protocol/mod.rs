//! Transport framing shared by the device agent and the host controller.
//!
//! ```text
//!  host                                         device
//!  ────                                         ──────
//!  [cat, sub] ───────── command port ─────────▶ dispatcher
//!  [payload]  ───────── command port ─────────▶ handler
//!             ◀──────── command port ────────── fixed-size replies
//!             ◀──────── stream port ─────────── TimedSample chunks
//! ```
//!
//! Requests are always two bytes.  Whatever follows is a fixed-size,
//! little-endian payload whose shape is implied by the opcode.  There is
//! no length prefix, no version field, no checksum and no retry.

pub mod codec;
pub mod opcode;
pub mod transport;

pub use opcode::Opcode;
pub use transport::{Datagram, UdpTransport, drain};

/// Bus address of the gain potentiometer.
pub const GAIN_POT_ADDR: u8 = 0x2D;
/// Bus address of the threshold potentiometer.
pub const THRESHOLD_POT_ADDR: u8 = 0x2C;

/// The two digital potentiometers on the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Potentiometer {
    Gain,
    Threshold,
}

impl Potentiometer {
    /// Fixed bus address of this device.
    pub const fn address(self) -> u8 {
        match self {
            Self::Gain => GAIN_POT_ADDR,
            Self::Threshold => THRESHOLD_POT_ADDR,
        }
    }
}

/// Input pulse polarity selected on the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Polarity {
    #[default]
    Negative,
    Positive,
}

impl Polarity {
    /// Level driven onto the polarity pin.
    pub const fn bit(self) -> u8 {
        match self {
            Self::Negative => 0,
            Self::Positive => 1,
        }
    }

    /// Any non-zero bit selects positive polarity.
    pub const fn from_bit(bit: u8) -> Self {
        if bit == 0 { Self::Negative } else { Self::Positive }
    }
}
