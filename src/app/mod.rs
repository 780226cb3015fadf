//! Device application core.
//!
//! The dispatcher and the commands it runs.  All interaction with hardware
//! happens through the **port traits** defined in [`ports`], keeping this
//! layer fully testable against simulated peripherals.

pub mod commands;
pub mod dispatcher;
pub mod ports;

pub use commands::Command;
pub use dispatcher::{DispatchState, Device};
