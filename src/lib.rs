//! APIC pulse-detection controller library.
//!
//! The device agent (dispatcher, acquisition modes, board ports) and the
//! host controller share this crate and the [`protocol`] module.  All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module; host builds run the agent against
//! [`adapters::sim`].

#![deny(unused_must_use)]

pub mod acquisition;
pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod host;
pub mod isr;
pub mod pins;
pub mod protocol;

pub use error::{Error, Result};
