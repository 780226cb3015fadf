//! Dispatcher behaviour driven one datagram at a time.
//!
//! The device runs on the test thread; the test holds the host end of
//! both links and queues datagrams before each `serve_one`.

use apic::Error;
use apic::adapters::sim::SimBoard;
use apic::app::{Command, DispatchState, Device};
use apic::config::DeviceConfig;
use apic::error::TransportError;
use apic::isr::IsrShared;
use apic::protocol::opcode::{self, Opcode};
use apic::protocol::{Datagram, Polarity, Potentiometer};

use crate::mock_hw::{MemoryTransport, device_config, link_pair};

struct Rig {
    host: MemoryTransport,
    host_stream: MemoryTransport,
    device_link: MemoryTransport,
    device_stream: MemoryTransport,
}

fn rig() -> Rig {
    let (mut host, device_link) = link_pair();
    let (host_stream, device_stream) = link_pair();
    host.set_timeout(Some(std::time::Duration::from_millis(200))).unwrap();
    Rig {
        host,
        host_stream,
        device_link,
        device_stream,
    }
}

fn device<'a>(
    board: SimBoard,
    rig: Rig,
    shared: &'a IsrShared,
    config: &'a DeviceConfig,
) -> (Device<'a, SimBoard, MemoryTransport>, MemoryTransport, MemoryTransport) {
    let dev = Device::new(board, rig.device_link, rig.device_stream, shared, config).unwrap();
    (dev, rig.host, rig.host_stream)
}

fn reply(host: &mut MemoryTransport) -> Vec<u8> {
    let mut buf = [0u8; 2048];
    let n = host.recv(&mut buf).unwrap();
    buf[..n].to_vec()
}

// ── Framing ───────────────────────────────────────────────────

#[test]
fn unknown_opcode_runs_nothing() {
    let (shared, config) = (IsrShared::new(), device_config());
    let (mut dev, mut host, _s) = device(SimBoard::new(), rig(), &shared, &config);

    host.send(&[5, 0]).unwrap();
    assert_eq!(dev.serve_one(), Err(Error::UnknownOpcode(Opcode::new(5, 0))));
    assert_eq!(dev.state(), DispatchState::Idle);
    assert_eq!(dev.handled(), 0);
}

#[test]
fn short_datagram_is_ignored() {
    let (shared, config) = (IsrShared::new(), device_config());
    let (mut dev, mut host, _s) = device(SimBoard::new(), rig(), &shared, &config);

    host.send(&[4]).unwrap();
    assert_eq!(dev.serve_one(), Ok(None));
    assert_eq!(dev.handled(), 0);
}

#[test]
fn idle_timeout_is_not_an_error() {
    let (shared, config) = (IsrShared::new(), device_config());
    let (mut dev, _host, _s) = device(SimBoard::new(), rig(), &shared, &config);
    assert_eq!(dev.serve_one(), Ok(None));
}

#[test]
fn run_stops_on_unknown_opcode_after_serving_earlier_commands() {
    let (shared, config) = (IsrShared::new(), device_config());
    let (mut dev, mut host, _s) = device(SimBoard::new(), rig(), &shared, &config);

    host.send(&opcode::POLARITY_POSITIVE.to_bytes()).unwrap();
    host.send(&[9, 9]).unwrap();
    assert_eq!(dev.run(), Error::UnknownOpcode(Opcode::new(9, 9)));
    assert_eq!(dev.handled(), 1);
    assert_eq!(dev.polarity(), Polarity::Positive);
}

#[test]
fn run_stops_when_host_hangs_up() {
    let (shared, config) = (IsrShared::new(), device_config());
    let (mut dev, host, _s) = device(SimBoard::new(), rig(), &shared, &config);
    drop(host);
    assert_eq!(dev.run(), Error::Transport(TransportError::Closed));
}

// ── Front end ─────────────────────────────────────────────────

#[test]
fn polarity_drives_the_polarity_line() {
    let (shared, config) = (IsrShared::new(), device_config());
    let (mut dev, mut host, _s) = device(SimBoard::new(), rig(), &shared, &config);

    host.send(&opcode::POLARITY_POSITIVE.to_bytes()).unwrap();
    assert_eq!(
        dev.serve_one(),
        Ok(Some(Command::SetPolarity(Polarity::Positive)))
    );
    assert!(dev.board().signals.polarity_pin().is_high());

    host.send(&opcode::POLARITY_NEGATIVE.to_bytes()).unwrap();
    dev.serve_one().unwrap();
    assert!(!dev.board().signals.polarity_pin().is_high());
    assert_eq!(dev.polarity(), Polarity::Negative);
    assert_eq!(dev.handled(), 2);
}

#[test]
fn test_pulse_toggles() {
    let (shared, config) = (IsrShared::new(), device_config());
    let (mut dev, mut host, _s) = device(SimBoard::new(), rig(), &shared, &config);

    host.send(&opcode::TEST_PULSE_ON.to_bytes()).unwrap();
    dev.serve_one().unwrap();
    assert!(dev.test_pulse());
    assert!(dev.board().signals.test_pulse_pin().is_high());

    host.send(&opcode::TEST_PULSE_OFF.to_bytes()).unwrap();
    dev.serve_one().unwrap();
    assert!(!dev.test_pulse());
    assert!(!dev.board().signals.test_pulse_pin().is_high());
}

// ── Bus ───────────────────────────────────────────────────────

#[test]
fn scan_reports_top_down_and_pads_with_zero() {
    let (shared, config) = (IsrShared::new(), device_config());
    let (mut dev, mut host, _s) = device(SimBoard::new(), rig(), &shared, &config);
    host.send(&opcode::SCAN_BUS.to_bytes()).unwrap();
    dev.serve_one().unwrap();
    assert_eq!(reply(&mut host), vec![0x2D, 0x2C]);

    let (shared, config) = (IsrShared::new(), device_config());
    let board = SimBoard::new().with_bus(&[0x2C]);
    let (mut dev, mut host, _s) = device(board, rig(), &shared, &config);
    host.send(&opcode::SCAN_BUS.to_bytes()).unwrap();
    dev.serve_one().unwrap();
    assert_eq!(reply(&mut host), vec![0x2C, 0x00]);
}

#[test]
fn potentiometer_write_lands_on_the_bus() {
    let (shared, config) = (IsrShared::new(), device_config());
    let (mut dev, mut host, _s) = device(SimBoard::new(), rig(), &shared, &config);

    host.send(&opcode::WRITE_THRESHOLD.to_bytes()).unwrap();
    host.send(&[77]).unwrap();
    assert_eq!(
        dev.serve_one(),
        Ok(Some(Command::WritePotentiometer(Potentiometer::Threshold)))
    );
    assert_eq!(dev.board().bus.i2c().position(0x2C), Some(77));
    assert_eq!(dev.board().bus.i2c().position(0x2D), Some(0));

    host.send(&opcode::READ_POTENTIOMETERS.to_bytes()).unwrap();
    dev.serve_one().unwrap();
    assert_eq!(reply(&mut host), vec![0]);
    assert_eq!(reply(&mut host), vec![77]);
}

#[test]
fn absent_device_aborts_without_consuming_the_value() {
    let (shared, config) = (IsrShared::new(), device_config());
    let board = SimBoard::new().with_bus(&[0x2C]);
    let (mut dev, mut host, _s) = device(board, rig(), &shared, &config);

    host.send(&opcode::WRITE_GAIN.to_bytes()).unwrap();
    host.send(&[10]).unwrap();
    assert_eq!(dev.serve_one(), Err(Error::BusDeviceAbsent(0x2D)));
    assert_eq!(dev.state(), DispatchState::Idle);

    // The orphaned value is then seen as a short datagram and dropped.
    assert_eq!(dev.serve_one(), Ok(None));
}

#[test]
fn reading_pots_with_one_absent_sends_nothing() {
    let (shared, config) = (IsrShared::new(), device_config());
    let board = SimBoard::new().with_bus(&[0x2D]);
    let (mut dev, mut host, _s) = device(board, rig(), &shared, &config);

    host.send(&opcode::READ_POTENTIOMETERS.to_bytes()).unwrap();
    assert_eq!(dev.serve_one(), Err(Error::BusDeviceAbsent(0x2C)));
    let mut buf = [0u8; 8];
    assert_eq!(host.recv(&mut buf), Err(Error::Transport(TransportError::Timeout)));
}

// ── State label ───────────────────────────────────────────────

#[test]
fn label_round_trips_through_set_and_get() {
    let (shared, config) = (IsrShared::new(), device_config());
    let (mut dev, mut host, _s) = device(SimBoard::new(), rig(), &shared, &config);

    host.send(&opcode::GET_STATE.to_bytes()).unwrap();
    dev.serve_one().unwrap();
    assert_eq!(reply(&mut host), b"STARTUP".to_vec());

    host.send(&opcode::SET_STATE.to_bytes()).unwrap();
    host.send(b"RUN 12").unwrap();
    assert_eq!(dev.serve_one(), Ok(Some(Command::SetState)));
    assert_eq!(dev.label(), "RUN 12");

    host.send(&opcode::GET_STATE.to_bytes()).unwrap();
    dev.serve_one().unwrap();
    assert_eq!(reply(&mut host), b"RUN 12".to_vec());
}

#[test]
fn oversized_label_keeps_the_old_one() {
    let (shared, config) = (IsrShared::new(), device_config());
    let (mut dev, mut host, _s) = device(SimBoard::new(), rig(), &shared, &config);

    host.send(&opcode::SET_STATE.to_bytes()).unwrap();
    host.send(&[b'x'; 33]).unwrap();
    assert!(matches!(dev.serve_one(), Err(Error::Payload(_))));
    assert_eq!(dev.label(), "STARTUP");
    assert_eq!(dev.handled(), 1);
}

#[test]
fn missing_label_times_out() {
    let (shared, config) = (IsrShared::new(), device_config());
    let (mut dev, mut host, _s) = device(SimBoard::new(), rig(), &shared, &config);

    host.send(&opcode::SET_STATE.to_bytes()).unwrap();
    assert_eq!(
        dev.serve_one(),
        Err(Error::Transport(TransportError::Timeout))
    );
    assert_eq!(dev.state(), DispatchState::Idle);
}

// ── Payloads ──────────────────────────────────────────────────

#[test]
fn short_count_payload_is_rejected() {
    let (shared, config) = (IsrShared::new(), device_config());
    let (mut dev, mut host, _s) = device(SimBoard::new(), rig(), &shared, &config);

    host.send(&opcode::START_POLLED.to_bytes()).unwrap();
    host.send(&[3, 0]).unwrap();
    assert!(matches!(dev.serve_one(), Err(Error::Payload(_))));
}

#[test]
fn polled_capture_sends_one_group_per_datagram() {
    let (shared, config) = (IsrShared::new(), device_config());
    let board = SimBoard::new().with_adc(apic::adapters::sim::SimAdc::Constant(0x123));
    let (mut dev, mut host, _s) = device(board, rig(), &shared, &config);

    host.send(&opcode::START_POLLED.to_bytes()).unwrap();
    host.send(&3u32.to_le_bytes()).unwrap();
    dev.serve_one().unwrap();
    for _ in 0..3 {
        assert_eq!(reply(&mut host), vec![0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01]);
    }
}
