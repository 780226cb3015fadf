//! Device agent on the host, backed by simulated peripherals.
//!
//! Speaks the same UDP protocol as the firmware, so `apic-host` can be
//! exercised without a board:
//!
//! ```text
//! apic-sim --bind 127.0.0.2 --host 127.0.0.1 --burst-hz 2000 --rate-hz 5
//! apic-host --device 127.0.0.2 --bind 127.0.0.1 rate
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::process::exit;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use apic::adapters::sim::{EdgeSource, SimAdc, SimBoard, SimClock};
use apic::app::Device;
use apic::app::ports::Line;
use apic::config::DeviceConfig;
use apic::isr::IsrShared;
use apic::protocol::UdpTransport;

static SHARED: IsrShared = IsrShared::new();

#[derive(Parser, Debug)]
#[command(name = "apic-sim", version, about = "Run the APIC device agent against simulated hardware")]
struct Cli {
    /// JSON device configuration; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Address to listen for commands on.
    #[arg(long, default_value_t = Ipv4Addr::LOCALHOST)]
    bind: Ipv4Addr,
    /// Host that replies and stream chunks are sent to.
    #[arg(long)]
    host: Option<Ipv4Addr>,
    /// Pulse rate seen on the burst edge line (Hz, 0 = silent).
    #[arg(long, default_value_t = 0)]
    burst_hz: u32,
    /// Pulse rate seen on the rate edge line (Hz, 0 = silent).
    #[arg(long, default_value_t = 0)]
    rate_hz: u32,
    /// Constant ADC reading; pseudo-random noise when omitted.
    #[arg(long)]
    adc: Option<u16>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {e:#}");
        exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<DeviceConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => DeviceConfig::default(),
    };
    if let Some(host) = cli.host {
        config.host_addr = host;
    }
    config.validate()?;
    Ok(config)
}

fn edges(hz: u32) -> Option<EdgeSource> {
    (hz > 0).then(|| {
        let period_us = 1_000_000 / u64::from(hz);
        EdgeSource {
            period_us,
            phase_us: period_us / 2,
        }
    })
}

fn build_board(cli: &Cli) -> SimBoard {
    let adc = match cli.adc {
        Some(v) => SimAdc::Constant(v),
        None => SimAdc::Noise { state: 0x1234_5678 },
    };
    let mut board = SimBoard::new().with_adc(adc).with_clock(SimClock::real());
    if let Some(src) = edges(cli.burst_hz) {
        board = board.with_edges(Line::Burst, src);
    }
    if let Some(src) = edges(cli.rate_hz) {
        board = board.with_edges(Line::Rate, src);
    }
    board
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let board = build_board(&cli);

    let link = UdpTransport::bind(
        SocketAddr::from((cli.bind, config.command_port)),
        (config.host_addr, config.host_command_port),
    )
    .context("binding command port")?;
    let stream = UdpTransport::bind(
        SocketAddr::from((cli.bind, 0)),
        (config.host_addr, config.host_stream_port),
    )
    .context("binding stream port")?;
    info!(
        "simulated device on {}, burst {} Hz, rate {} Hz",
        link.local_addr()?,
        cli.burst_hz,
        cli.rate_hz
    );

    let mut device = Device::new(board, link, stream, &SHARED, &config)?;
    let reason = device.run();
    error!("dispatcher stopped after {} commands: {reason}", device.handled());
    Err(reason.into())
}
