//! APIC firmware entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  HardwareBoard            AccessPoint      UdpTransport x2   │
//! │  (Analog+Signal+Bus+      (soft AP)        (command, stream) │
//! │   Interrupt+Clock)                                           │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────      │
//! │                                                              │
//! │  ┌──────────────────────────────────────────────────────┐    │
//! │  │       Device (dispatcher) + acquisition modes        │    │
//! │  └──────────────────────────────────────────────────────┘    │
//! │                                                              │
//! │  IsrShared (atomic counters + SPSC sample ring)              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::Result;
use esp_idf_hal::gpio::{IOPin, OutputPin};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{error, info};

use apic::adapters::access_point::AccessPoint;
use apic::adapters::hardware::HardwareBoard;
use apic::app::Device;
use apic::config::DeviceConfig;
use apic::drivers::hw_init;
use apic::isr::IsrShared;
use apic::protocol::UdpTransport;

static SHARED: IsrShared = IsrShared::new();

fn halt() -> ! {
    #[allow(clippy::empty_loop)]
    loop {}
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    info!("APIC v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Peripherals ────────────────────────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        error!("peripheral init failed: {e}; halting");
        halt();
    }

    let config = DeviceConfig::default();
    config.validate()?;

    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;
    let board = HardwareBoard::new(
        peripherals.i2c0,
        pins.gpio8.downgrade(),
        pins.gpio9.downgrade(),
        pins.gpio7.downgrade_output(),
        pins.gpio17.downgrade_output(),
        pins.gpio15.downgrade_output(),
        config.edge_poll_interval_us,
    )?;

    // ── 3. Network ────────────────────────────────────────────
    let ap = AccessPoint::start(
        peripherals.modem,
        EspSystemEventLoop::take()?,
        EspDefaultNvsPartition::take()?,
        config.ap_ssid.as_str(),
        config.ap_channel,
    )?;
    ap.wait_for_station(Duration::from_millis(500));

    let local = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.command_port));
    let link = UdpTransport::bind(local, (config.host_addr, config.host_command_port))?;
    let stream = UdpTransport::bind(
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
        (config.host_addr, config.host_stream_port),
    )?;
    info!(
        "command link {} -> {}, stream link -> {}",
        link.local_addr()?,
        link.peer(),
        stream.peer()
    );

    // ── 4. Dispatcher ─────────────────────────────────────────
    let mut device = Device::new(board, link, stream, &SHARED, &config)?;
    info!("ready, '{}'", device.label());
    let reason = device.run();
    error!("dispatcher stopped: {reason}; halting");
    halt()
}
