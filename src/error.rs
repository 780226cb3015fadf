//! Unified error types for the APIC controller.
//!
//! A single `Error` enum that both the device agent and the host
//! controller funnel into.  All variants are `Copy` so they can be passed
//! out of the dispatcher loop and logged without allocation.

use core::fmt;

use crate::protocol::opcode::Opcode;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The datagram transport failed or timed out.
    Transport(TransportError),
    /// The device received an opcode that is not in its command table.
    /// Fatal on the device: host and device disagree on the protocol.
    UnknownOpcode(Opcode),
    /// No device acknowledged at this bus address.
    BusDeviceAbsent(u8),
    /// A unit conversion to something other than ADU or mV was requested.
    MalformedUnit,
    /// A fixed-size payload was short or otherwise unusable.
    Payload(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::UnknownOpcode(op) => write!(f, "unknown opcode {op}"),
            Self::BusDeviceAbsent(addr) => write!(f, "no bus device at 0x{addr:02X}"),
            Self::MalformedUnit => {
                write!(f, "unit is not supported, acceptable values are \"mV\" or \"ADU\"")
            }
            Self::Payload(msg) => write!(f, "payload: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// Nothing arrived within the configured timeout.
    Timeout,
    /// The underlying socket reported an error.
    Io(std::io::ErrorKind),
    /// The transport was closed by the peer or the local side.
    Closed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timed out"),
            Self::Io(kind) => write!(f, "I/O error ({kind})"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => Self::Timeout,
            kind => Self::Io(kind),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Transport(e.into())
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
