//! Host-side command line controller.
//!
//! Joins the device's access point beforehand, then:
//!
//! ```text
//! apic-host scan
//! apic-host write-gain 40
//! apic-host burst 10000 --units mV --out pulses.txt
//! apic-host rate
//! ```
//!
//! Against `apic-sim` on one machine, give each side its own loopback
//! address: `apic-host --device 127.0.0.2 --bind 127.0.0.1 scan`.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::process::exit;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};

use apic::config::Settings;
use apic::host::dump;
use apic::host::{Controller, SampleTable, Units};
use apic::protocol::{Polarity, Potentiometer, UdpTransport};

#[derive(Parser, Debug)]
#[command(name = "apic-host", version, about = "Drive an APIC pulse-detection front end over WiFi")]
struct Cli {
    /// JSON settings document; defaults apply when omitted.
    #[arg(short, long)]
    settings: Option<PathBuf>,
    /// Override the device address from the settings.
    #[arg(long)]
    device: Option<Ipv4Addr>,
    /// Local address to bind both ports on.
    #[arg(long, default_value_t = Ipv4Addr::UNSPECIFIED)]
    bind: Ipv4Addr,
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// List responding I2C addresses.
    Scan,
    /// Read both potentiometer wiper positions.
    ReadPots,
    /// Set the gain potentiometer wiper.
    WriteGain { position: u8 },
    /// Set the threshold potentiometer wiper.
    WriteThreshold { position: u8 },
    /// Select the input pulse polarity.
    Polarity {
        #[arg(value_enum)]
        polarity: PolarityArg,
    },
    /// Switch the test pulse generator.
    TestPulse {
        #[arg(action = clap::ArgAction::Set)]
        on: bool,
    },
    /// Polled acquisition of COUNT four-sample groups.
    Polled {
        count: u32,
        #[command(flatten)]
        output: Output,
    },
    /// Edge-triggered acquisition of COUNT four-sample groups.
    Burst {
        count: u64,
        #[command(flatten)]
        output: Output,
    },
    /// Timestamped streaming of COUNT single samples.
    Stream {
        count: u32,
        #[command(flatten)]
        output: Output,
    },
    /// Count pulses over the device's rate window.
    Rate,
    /// Print the device's state label.
    GetState,
    /// Replace the device's state label (at most 32 bytes).
    SetState { label: String },
}

#[derive(clap::Args, Debug)]
struct Output {
    /// "ADU" or "mV".
    #[arg(short, long, default_value = "ADU")]
    units: Units,
    /// Write the raw dump here.
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PolarityArg {
    Negative,
    Positive,
}

impl From<PolarityArg> for Polarity {
    fn from(p: PolarityArg) -> Self {
        match p {
            PolarityArg::Negative => Self::Negative,
            PolarityArg::Positive => Self::Positive,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {e:#}");
        exit(1);
    }
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.settings {
        Some(path) => Settings::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Settings::default(),
    };
    if let Some(addr) = cli.device {
        settings.device_addr = addr;
    }
    Ok(settings)
}

fn connect(settings: Settings, bind: Ipv4Addr) -> Result<Controller<UdpTransport>> {
    let device = SocketAddr::from((settings.device_addr, settings.command_port));
    let link = UdpTransport::bind((bind, settings.command_port), device)
        .context("binding command port")?;
    let stream = UdpTransport::bind((bind, settings.stream_port), device)
        .context("binding stream port")?;
    info!("talking to {device}");
    Ok(Controller::new(link, stream, settings)?)
}

fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(&cli)?;
    let mut ctl = connect(settings, cli.bind)?;

    match cli.command {
        Cmd::Scan => {
            let found = ctl.scan_bus()?;
            println!("{}", found.iter().map(|a| format!("0x{a:02X}")).collect::<Vec<_>>().join(" "));
        }
        Cmd::ReadPots => {
            let (gain, threshold) = ctl.read_potentiometers()?;
            println!("gain {gain} threshold {threshold}");
        }
        Cmd::WriteGain { position } => ctl.write_potentiometer(position, Potentiometer::Gain)?,
        Cmd::WriteThreshold { position } => ctl.write_potentiometer(position, Potentiometer::Threshold)?,
        Cmd::Polarity { polarity } => ctl.set_polarity(polarity.into())?,
        Cmd::TestPulse { on } => ctl.set_test_pulse(on)?,
        Cmd::Polled { count, output } => {
            let table = ctl.acquire_polled(count)?;
            report_table(table, &output)?;
        }
        Cmd::Burst { count, output } => {
            let table = ctl.acquire_interrupt(count)?;
            report_table(table, &output)?;
        }
        Cmd::Stream { count, output } => {
            let mut record = ctl.acquire_streaming(count)?;
            record.set_units(output.units);
            if let (Some(first), Some(last)) = (record.t().first(), record.t().last()) {
                println!("{} samples over {:.6} s", record.len(), last - first);
            }
            if let Some(path) = &output.out {
                dump::save_stream(path, &record).with_context(|| format!("writing {}", path.display()))?;
                info!("stream written to {}", path.display());
            }
        }
        Cmd::Rate => println!("{} Hz", ctl.measure_rate()?),
        Cmd::GetState => println!("{}", ctl.check_state()?),
        Cmd::SetState { label } => ctl.send_state(&label)?,
    }

    ctl.disconnect();
    Ok(())
}

fn report_table(mut table: SampleTable, output: &Output) -> Result<()> {
    table.set_units(output.units);
    let means = table.row_means();
    if means.is_empty() {
        warn!("no rows received");
    } else {
        let avg = means.iter().sum::<f64>() / means.len() as f64;
        let max = means.iter().copied().fold(f64::MIN, f64::max);
        println!("{} rows, mean {avg:.2} {u}, max {max:.2} {u}", table.len(), u = table.units());
    }
    if let Some(path) = &output.out {
        dump::save_table(path, &table).with_context(|| format!("writing {}", path.display()))?;
        info!("table written to {}", path.display());
    }
    Ok(())
}
