//! System configuration parameters
//!
//! `Settings` is the host-side settings document, loaded once at start.
//! `DeviceConfig` holds the device agent's tunables.  Both are plain
//! immutable structs passed around by reference.

use std::net::Ipv4Addr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::protocol::Polarity;

/// Lower bound on the potentiometer settling delay.
pub const MIN_POT_SETTLE_MS: u32 = 200;

/// Upper bound on the host reply timeout.
pub const MAX_TIMEOUT_SECS: f64 = 86_400.0;

/// Port the device listens on for commands and the host receives replies on.
pub const DEFAULT_COMMAND_PORT: u16 = 8080;
/// Port the host receives streaming chunks on.
pub const DEFAULT_STREAM_PORT: u16 = 9000;

// ---------------------------------------------------------------------------
// Host settings
// ---------------------------------------------------------------------------

/// Host controller settings document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // --- Calibration ---
    #[serde(alias = "calibgradient")]
    pub calib_gradient: f64,
    #[serde(alias = "caliboffset")]
    pub calib_offset: f64,

    // --- Front end ---
    /// 0 = negative, anything else = positive.
    pub polarity: u8,
    #[serde(alias = "gainpos")]
    pub gain_pos: u8,
    #[serde(alias = "threshpos")]
    pub thresh_pos: u8,

    // --- Presentation (consumed downstream) ---
    pub bins: u32,
    pub boundaries: (f64, f64),
    pub title: String,

    // --- Link ---
    #[serde(alias = "timeout")]
    pub timeout_secs: f64,
    pub device_addr: Ipv4Addr,
    pub command_port: u16,
    pub stream_port: u16,

    // --- Timing ---
    /// Delay between a potentiometer write opcode and its value.
    pub pot_settle_ms: u32,
    /// Delay between an acquisition opcode and its count.
    pub arm_delay_ms: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            calib_gradient: 1.0,
            calib_offset: 0.0,

            polarity: 0,
            gain_pos: 0,
            thresh_pos: 0,

            bins: 500,
            boundaries: (0.0, 4096.0),
            title: "APIC".into(),

            timeout_secs: 10.0,
            device_addr: Ipv4Addr::new(192, 168, 4, 1),
            command_port: DEFAULT_COMMAND_PORT,
            stream_port: DEFAULT_STREAM_PORT,

            pot_settle_ms: MIN_POT_SETTLE_MS,
            arm_delay_ms: 500,
        }
    }
}

impl Settings {
    /// Parse and validate a JSON settings document.
    pub fn from_json(text: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(text).map_err(|e| {
            log::error!("settings: {e}");
            Error::Config("malformed settings document")
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from a file path.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            log::error!("{}: {e}", path.display());
            Error::Config("settings file unreadable")
        })?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.calib_gradient == 0.0 || !self.calib_gradient.is_finite() {
            return Err(Error::Config("calibration gradient must be non-zero"));
        }
        if !self.calib_offset.is_finite() {
            return Err(Error::Config("calibration offset must be finite"));
        }
        if !(self.timeout_secs > 0.0 && self.timeout_secs <= MAX_TIMEOUT_SECS) {
            return Err(Error::Config("timeout must be positive and at most a day"));
        }
        if self.pot_settle_ms < MIN_POT_SETTLE_MS {
            return Err(Error::Config("potentiometer settle delay below 200 ms"));
        }
        if self.boundaries.0 >= self.boundaries.1 {
            return Err(Error::Config("boundaries must be increasing"));
        }
        if self.bins == 0 {
            return Err(Error::Config("bins must be non-zero"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }

    pub fn polarity(&self) -> Polarity {
        Polarity::from_bit(self.polarity)
    }

    pub fn pot_settle(&self) -> Duration {
        Duration::from_millis(u64::from(self.pot_settle_ms))
    }

    pub fn arm_delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.arm_delay_ms))
    }
}

// ---------------------------------------------------------------------------
// Device configuration
// ---------------------------------------------------------------------------

/// Device agent configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    // --- Network ---
    /// Soft access point the host joins.
    pub ap_ssid: heapless::String<32>,
    pub ap_channel: u8,
    pub command_port: u16,
    pub host_addr: Ipv4Addr,
    /// Host port replies are sent to.
    pub host_command_port: u16,
    /// Host port streaming chunks are sent to.
    pub host_stream_port: u16,

    // --- Acquisition ---
    /// Rate measurement window (milliseconds).
    pub rate_window_ms: u32,
    /// Interval between streaming samples (microseconds).
    pub stream_sample_period_us: u32,
    /// Edge-line poll interval while spinning (microseconds).
    pub edge_poll_interval_us: u32,
    /// Receive timeout on the command link (milliseconds).  Covers both
    /// idle waits and payloads that follow an opcode.
    pub recv_timeout_ms: u32,

    pub default_label: heapless::String<32>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        // Both literals fit in 32 bytes.
        let mut default_label = heapless::String::new();
        let _ = default_label.push_str("STARTUP");
        let mut ap_ssid = heapless::String::new();
        let _ = ap_ssid.push_str("APIC");
        Self {
            ap_ssid,
            ap_channel: 1,
            command_port: DEFAULT_COMMAND_PORT,
            host_addr: Ipv4Addr::new(192, 168, 4, 16),
            host_command_port: DEFAULT_COMMAND_PORT,
            host_stream_port: DEFAULT_STREAM_PORT,

            rate_window_ms: 3000,
            stream_sample_period_us: 1000,
            edge_poll_interval_us: 100,
            recv_timeout_ms: 2000,

            default_label,
        }
    }
}

impl DeviceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.ap_ssid.is_empty() || !(1..=13).contains(&self.ap_channel) {
            return Err(Error::Config("access point needs an SSID and a channel in 1..=13"));
        }
        if self.rate_window_ms == 0 {
            return Err(Error::Config("rate window must be non-zero"));
        }
        if self.stream_sample_period_us == 0 {
            return Err(Error::Config("stream sample period must be non-zero"));
        }
        if self.recv_timeout_ms == 0 {
            return Err(Error::Config("receive timeout must be non-zero"));
        }
        if self.command_port == 0 || self.host_command_port == 0 || self.host_stream_port == 0 {
            return Err(Error::Config("ports must be non-zero"));
        }
        Ok(())
    }

    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.recv_timeout_ms))
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_millis(u64::from(self.rate_window_ms))
    }
}
