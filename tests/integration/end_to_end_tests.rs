//! Host controller against a device agent running in a worker thread.
//!
//! The device uses the simulated board with a virtual clock, so edge
//! timing is deterministic regardless of how fast the test machine is.

use apic::Error;
use apic::adapters::sim::{EdgeSource, SimAdc, SimBoard};
use apic::app::ports::Line;
use apic::error::TransportError;
use apic::host::Units;
use apic::protocol::{Polarity, Potentiometer};

use crate::mock_hw::{host_settings, with_device, with_stale_replies};

fn every(period_us: u64) -> EdgeSource {
    EdgeSource {
        period_us,
        phase_us: period_us / 2,
    }
}

#[test]
fn scan_lists_both_potentiometers() {
    let done = with_device(SimBoard::new(), host_settings(), |ctl| ctl.scan_bus());
    assert_eq!(done.host, Ok(vec![0x2D, 0x2C]));
    assert_eq!(done.stop, Error::Transport(TransportError::Closed));
    assert_eq!(done.handled, 1);
}

#[test]
fn written_positions_read_back() {
    let done = with_device(SimBoard::new(), host_settings(), |ctl| {
        ctl.write_potentiometer(40, Potentiometer::Gain)?;
        ctl.write_potentiometer(12, Potentiometer::Threshold)?;
        ctl.read_potentiometers()
    });
    assert_eq!(done.host, Ok((40, 12)));
    assert_eq!(done.board.bus.i2c().position(0x2D), Some(40));
    assert_eq!(done.board.bus.i2c().position(0x2C), Some(12));
}

#[test]
fn front_end_settings_reach_the_pins() {
    let done = with_device(SimBoard::new(), host_settings(), |ctl| {
        ctl.set_polarity(Polarity::Positive)?;
        ctl.set_test_pulse(true)?;
        // A round trip so both commands have been served before hanging up.
        ctl.check_state()
    });
    assert_eq!(done.host, Ok("STARTUP".to_string()));
    assert!(done.board.signals.polarity_pin().is_high());
    assert!(done.board.signals.test_pulse_pin().is_high());
    assert_eq!(done.handled, 3);
}

#[test]
fn interrupt_burst_returns_calibrated_rows() {
    let board = SimBoard::new()
        .with_adc(SimAdc::Constant(1000))
        .with_edges(Line::Burst, every(1000));
    let mut settings = host_settings();
    settings.calib_gradient = 2.0;
    settings.calib_offset = 10.0;

    let done = with_device(board, settings, |ctl| ctl.acquire_interrupt(40));
    let table = done.host.unwrap();
    assert_eq!(table.len(), 40);
    assert!(table.rows().iter().flatten().all(|v| (*v - 505.0).abs() < 1e-9));
    assert!(!done.board.is_enabled(Line::Burst));
}

#[test]
fn burst_larger_than_one_buffer_half_arrives_whole() {
    let board = SimBoard::new()
        .with_adc(SimAdc::Noise { state: 99 })
        .with_edges(Line::Burst, every(500));

    let done = with_device(board, host_settings(), |ctl| ctl.acquire_interrupt(150));
    let mut table = done.host.unwrap();
    assert_eq!(table.len(), 150);
    table.set_units(Units::Millivolts);
    assert!(table.rows().iter().flatten().all(|v| (0.0..3300.0).contains(v)));
}

#[test]
fn polled_capture_collects_every_group() {
    let board = SimBoard::new().with_adc(SimAdc::Constant(0x0FFF));
    let done = with_device(board, host_settings(), |ctl| ctl.acquire_polled(25));
    let table = done.host.unwrap();
    assert_eq!(table.len(), 25);
    assert_eq!(table.row_means(), vec![4095.0; 25]);
}

#[test]
fn streaming_delivers_timestamps_in_order() {
    let board = SimBoard::new().with_adc(SimAdc::Constant(321));
    let done = with_device(board, host_settings(), |ctl| ctl.acquire_streaming(250));
    let record = done.host.unwrap();
    assert_eq!(record.len(), 250);
    assert!(record.adc().iter().all(|v| *v == 321.0));
    assert!(record.t().windows(2).all(|w| w[1] > w[0]));
    // One sample per millisecond of device time.
    let span = record.t()[249] - record.t()[0];
    assert!((span - 0.249).abs() < 1e-3, "span {span}");
}

#[test]
fn rate_counts_edges_over_the_window() {
    let board = SimBoard::new().with_edges(
        Line::Rate,
        EdgeSource {
            period_us: 200_000,
            phase_us: 100_000,
        },
    );
    let done = with_device(board, host_settings(), |ctl| ctl.measure_rate());
    assert_eq!(done.host, Ok(5));
    assert_eq!(done.board.signals.clear_pin().rising_edges(), 15);
}

#[test]
fn label_survives_between_commands() {
    let done = with_device(SimBoard::new(), host_settings(), |ctl| {
        ctl.send_state("CALIBRATING")?;
        ctl.scan_bus()?;
        ctl.check_state()
    });
    assert_eq!(done.host, Ok("CALIBRATING".to_string()));
}

#[test]
fn host_times_out_when_device_has_no_reply() {
    let board = SimBoard::new().with_bus(&[0x2C]);
    let mut settings = host_settings();
    settings.timeout_secs = 0.3;
    let done = with_device(board, settings, |ctl| ctl.read_potentiometers());
    assert_eq!(done.host, Err(Error::Transport(TransportError::Timeout)));
}

// Samples left over from an earlier capture that was cut short.
const LEFTOVER: &[u8] = &[9, 0, 9, 0, 9, 0, 9, 0];

#[test]
fn polled_capture_ignores_leftover_samples() {
    let board = SimBoard::new().with_adc(SimAdc::Constant(1000));
    let done = with_stale_replies(board, host_settings(), &[LEFTOVER, LEFTOVER], |ctl| {
        ctl.acquire_polled(3)
    });
    let table = done.host.unwrap();
    assert_eq!(table.row_means(), vec![1000.0; 3]);
}

#[test]
fn burst_ignores_leftover_samples() {
    let board = SimBoard::new()
        .with_adc(SimAdc::Constant(1000))
        .with_edges(Line::Burst, every(1000));
    let done = with_stale_replies(board, host_settings(), &[LEFTOVER], |ctl| {
        ctl.acquire_interrupt(5)
    });
    let table = done.host.unwrap();
    assert_eq!(table.len(), 5);
    assert_eq!(table.row_means(), vec![1000.0; 5]);
}
