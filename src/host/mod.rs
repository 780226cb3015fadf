//! Host controller: issues opcodes, reconstructs the replies, applies
//! unit conversion and calibration, and writes raw dumps.

pub mod controller;
pub mod dump;
pub mod units;

pub use controller::Controller;
pub use units::{CalibrationCurve, SampleTable, StreamRecord, Units};
