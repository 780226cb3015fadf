//! Peripheral drivers and one-shot hardware initialisation.

#[cfg(target_os = "espidf")]
pub mod hw_init;
pub mod potentiometer;
pub mod signals;
