//! Digital potentiometer bus (two single-channel wipers on I2C).
//!
//! Gain sits at `0x2D`, threshold at `0x2C`.  A write is the instruction
//! byte `0x00` followed by the wiper position; a read returns the current
//! position as a single byte.
//!
//! ## Dual-target design
//!
//! Generic over `embedded_hal::i2c::I2c`, so the same driver runs on the
//! ESP-IDF I2C master and on the simulated bus used by host builds.

use embedded_hal::i2c::I2c;

use crate::app::ports::BusPort;
use crate::error::{Error, Result};

/// Wiper write instruction.
const WRITE_WIPER: u8 = 0x00;

/// Highest and lowest non-reserved 7-bit addresses.
const PROBE_TOP: u8 = 0x77;
const PROBE_BOTTOM: u8 = 0x08;

pub struct PotentiometerBus<I> {
    i2c: I,
}

impl<I: I2c> PotentiometerBus<I> {
    pub fn new(i2c: I) -> Self {
        Self { i2c }
    }

    /// Set the wiper position of the device at `addr`.
    pub fn set_position(&mut self, addr: u8, position: u8) -> Result<()> {
        self.write(addr, &[WRITE_WIPER, position])
    }

    pub fn i2c(&self) -> &I {
        &self.i2c
    }

    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I: I2c> BusPort for PotentiometerBus<I> {
    fn is_ready(&mut self, addr: u8) -> bool {
        // Zero-length write: address phase only.
        self.i2c.write(addr, &[]).is_ok()
    }

    fn read_byte(&mut self, addr: u8) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.i2c.read(addr, &mut buf).map_err(|e| {
            log::warn!("bus read 0x{addr:02X}: {e:?}");
            Error::BusDeviceAbsent(addr)
        })?;
        Ok(buf[0])
    }

    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<()> {
        self.i2c.write(addr, bytes).map_err(|e| {
            log::warn!("bus write 0x{addr:02X}: {e:?}");
            Error::BusDeviceAbsent(addr)
        })
    }

    fn scan(&mut self, out: &mut [u8]) -> usize {
        let mut found = 0;
        for addr in (PROBE_BOTTOM..=PROBE_TOP).rev() {
            if found == out.len() {
                break;
            }
            if self.is_ready(addr) {
                out[found] = addr;
                found += 1;
            }
        }
        found
    }
}
