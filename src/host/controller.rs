//! Host-side controller.
//!
//! Mirrors the device dispatcher: every method sends one opcode, any
//! payload it needs, and then blocks on a predictable number of replies.
//! A receive timeout aborts the operation; nothing is retried.

use std::thread;
use std::time::Duration;

use log::{debug, info};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::protocol::codec::{
    MAX_DATAGRAM, SAMPLES_PER_GROUP, decode_samples, decode_u32, decode_words,
};
use crate::protocol::opcode::{self, Opcode};
use crate::protocol::transport::recv_byte;
use crate::protocol::{Datagram, Polarity, Potentiometer, drain};

use super::units::{CalibrationCurve, SampleTable, StreamRecord};

pub struct Controller<C, S = C> {
    link: C,
    stream: S,
    settings: Settings,
    curve: CalibrationCurve,
    polarity: Polarity,
}

impl<C: Datagram, S: Datagram> Controller<C, S> {
    /// Apply the settings' receive timeout to both links.
    pub fn new(mut link: C, mut stream: S, settings: Settings) -> Result<Self> {
        settings.validate()?;
        let curve = CalibrationCurve::new(settings.calib_gradient, settings.calib_offset)?;
        link.set_timeout(Some(settings.timeout()))?;
        stream.set_timeout(Some(settings.timeout()))?;
        let polarity = settings.polarity();
        Ok(Self {
            link,
            stream,
            settings,
            curve,
            polarity,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn curve(&self) -> &CalibrationCurve {
        &self.curve
    }

    /// Polarity last sent to the device.
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    fn send_op(&mut self, op: Opcode) -> Result<()> {
        debug!("-> {op}");
        self.link.send(&op.to_bytes())
    }

    // ── Potentiometers ────────────────────────────────────────

    /// Returns `(gain, threshold)` wiper positions.
    pub fn read_potentiometers(&mut self) -> Result<(u8, u8)> {
        self.send_op(opcode::READ_POTENTIOMETERS)?;
        let gain = recv_byte(&mut self.link)?;
        let threshold = recv_byte(&mut self.link)?;
        self.settings.gain_pos = gain;
        self.settings.thresh_pos = threshold;
        Ok((gain, threshold))
    }

    /// Responding bus addresses in the device's probe order.
    pub fn scan_bus(&mut self) -> Result<Vec<u8>> {
        self.send_op(opcode::SCAN_BUS)?;
        let mut buf = [0u8; MAX_DATAGRAM];
        let n = self.link.recv(&mut buf)?;
        Ok(buf[..n.min(2)].iter().copied().filter(|a| *a != 0).collect())
    }

    pub fn write_potentiometer(&mut self, position: u8, which: Potentiometer) -> Result<()> {
        let op = match which {
            Potentiometer::Gain => opcode::WRITE_GAIN,
            Potentiometer::Threshold => opcode::WRITE_THRESHOLD,
        };
        self.send_op(op)?;
        // The value datagram is lost if it arrives before the device is
        // waiting for it.
        thread::sleep(self.settings.pot_settle());
        self.link.send(&[position])?;
        match which {
            Potentiometer::Gain => self.settings.gain_pos = position,
            Potentiometer::Threshold => self.settings.thresh_pos = position,
        }
        Ok(())
    }

    // ── Front end ─────────────────────────────────────────────

    pub fn set_polarity(&mut self, polarity: Polarity) -> Result<()> {
        self.send_op(match polarity {
            Polarity::Negative => opcode::POLARITY_NEGATIVE,
            Polarity::Positive => opcode::POLARITY_POSITIVE,
        })?;
        self.polarity = polarity;
        self.settings.polarity = polarity.bit();
        Ok(())
    }

    pub fn set_test_pulse(&mut self, on: bool) -> Result<()> {
        self.send_op(if on { opcode::TEST_PULSE_ON } else { opcode::TEST_PULSE_OFF })
    }

    // ── Acquisition ───────────────────────────────────────────

    /// Polled capture of `count` groups.
    pub fn acquire_polled(&mut self, count: u32) -> Result<SampleTable> {
        let want = sample_count(count as usize, SAMPLES_PER_GROUP)?;
        drain(&mut self.link)?;
        self.send_op(opcode::START_POLLED)?;
        thread::sleep(self.settings.arm_delay());
        self.link.send(&count.to_le_bytes())?;
        let samples = self.collect_samples(want)?;
        Ok(SampleTable::from_raw(&samples, count as usize, &self.curve))
    }

    /// Edge-triggered capture of `count` groups.
    pub fn acquire_interrupt(&mut self, count: u64) -> Result<SampleTable> {
        let rows = usize::try_from(count).map_err(|_| Error::Payload("count exceeds host memory"))?;
        let want = sample_count(rows, SAMPLES_PER_GROUP)?;
        drain(&mut self.link)?;
        self.send_op(opcode::START_BURST)?;
        thread::sleep(self.settings.arm_delay());
        self.link.send(&count.to_le_bytes())?;
        let samples = self.collect_samples(want)?;
        drain(&mut self.link)?;
        Ok(SampleTable::from_raw(&samples, rows, &self.curve))
    }

    /// Read sample datagrams until `want` samples have arrived.
    fn collect_samples(&mut self, want: usize) -> Result<Vec<u16>> {
        let mut samples = Vec::with_capacity(want.min(MAX_DATAGRAM));
        let mut buf = [0u8; MAX_DATAGRAM];
        while samples.len() < want {
            let n = self.link.recv(&mut buf)?;
            decode_samples(&buf[..n], &mut samples);
        }
        info!("received {} samples, {want} requested", samples.len());
        Ok(samples)
    }

    /// Streaming capture of `count` timed samples.
    pub fn acquire_streaming(&mut self, count: u32) -> Result<StreamRecord> {
        let want = sample_count(count as usize, 2)?;
        drain(&mut self.stream)?;
        self.send_op(opcode::START_STREAMING)?;
        thread::sleep(self.settings.arm_delay());
        self.link.send(&count.to_le_bytes())?;

        let mut words = Vec::with_capacity(want.min(MAX_DATAGRAM));
        let mut buf = [0u8; MAX_DATAGRAM];
        while words.len() < want {
            let n = self.stream.recv(&mut buf)?;
            decode_words(&buf[..n], &mut words);
        }
        info!("received {} stream words for {count} samples", words.len());
        Ok(StreamRecord::from_words(&words, count as usize))
    }

    /// Pulse rate in Hz, counted by the device over its rate window.
    pub fn measure_rate(&mut self) -> Result<u32> {
        drain(&mut self.link)?;
        self.send_op(opcode::MEASURE_RATE)?;
        let mut buf = [0u8; MAX_DATAGRAM];
        let n = self.link.recv(&mut buf)?;
        decode_u32(&buf[..n])
    }

    // ── State label ───────────────────────────────────────────

    pub fn check_state(&mut self) -> Result<String> {
        self.send_op(opcode::GET_STATE)?;
        let mut buf = [0u8; MAX_DATAGRAM];
        let n = self.link.recv(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf[..n.min(32)]).into_owned())
    }

    pub fn send_state(&mut self, label: &str) -> Result<()> {
        if label.len() > 32 {
            return Err(Error::Payload("label longer than 32 bytes"));
        }
        self.send_op(opcode::SET_STATE)?;
        // Give the device time to start waiting for the label.
        thread::sleep(Duration::from_millis(100));
        self.link.send(label.as_bytes())
    }

    /// Close both links.
    pub fn disconnect(self) {
        info!("disconnecting");
        drop(self);
    }
}

/// Total words expected for `count` items of `per` words each.
fn sample_count(count: usize, per: usize) -> Result<usize> {
    count.checked_mul(per).ok_or(Error::Payload("count too large"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::protocol::transport::Recorder;

    fn settings() -> Settings {
        Settings {
            calib_gradient: 2.0,
            calib_offset: 0.0,
            arm_delay_ms: 0,
            ..Settings::default()
        }
    }

    fn controller(replies: &[&[u8]]) -> Controller<Recorder> {
        Controller::new(Recorder::with_inbox(replies), Recorder::default(), settings()).unwrap()
    }

    #[test]
    fn scan_drops_zero_padding() {
        let mut c = controller(&[&[0x2D, 0x00]]);
        assert_eq!(c.scan_bus().unwrap(), vec![0x2D]);
    }

    #[test]
    fn potentiometer_positions_arrive_in_two_datagrams() {
        let mut c = controller(&[&[40], &[12]]);
        assert_eq!(c.read_potentiometers().unwrap(), (40, 12));
        assert_eq!((c.settings().gain_pos, c.settings().thresh_pos), (40, 12));
    }

    #[test]
    fn stale_replies_are_drained_before_rate_request() {
        // The only queued datagram predates the request.
        let mut c = controller(&[&[5, 0, 0, 0]]);
        assert_eq!(
            c.measure_rate(),
            Err(Error::Transport(TransportError::Timeout))
        );
        assert_eq!(c.link.sent, vec![vec![5, 1]]);
    }

    #[test]
    fn sample_rows_are_calibrated() {
        let mut c = controller(&[&[10, 0, 20, 0, 30, 0, 40, 0], &[2, 0, 2, 0, 2, 0, 2, 0]]);
        let samples = c.collect_samples(8).unwrap();
        let table = SampleTable::from_raw(&samples, 2, c.curve());
        assert_eq!(table.rows()[0], [5.0, 10.0, 15.0, 20.0]);
        assert_eq!(table.rows()[1], [1.0; 4]);
    }

    #[test]
    fn oversized_burst_count_is_refused_before_sending() {
        let mut c = controller(&[]);
        assert!(matches!(
            c.acquire_interrupt(u64::MAX),
            Err(Error::Payload(_))
        ));
        assert!(c.link.sent.is_empty());
    }

    #[test]
    fn stale_samples_are_drained_before_polled_request() {
        // Leftovers from an earlier capture; no fresh reply follows.
        let mut c = controller(&[&[9, 0, 9, 0, 9, 0, 9, 0]]);
        assert_eq!(
            c.acquire_polled(1),
            Err(Error::Transport(TransportError::Timeout))
        );
        assert_eq!(c.link.sent, vec![vec![3, 0], vec![1, 0, 0, 0]]);
    }

    #[test]
    fn missing_reply_aborts_with_timeout() {
        let mut c = controller(&[]);
        assert_eq!(
            c.check_state(),
            Err(Error::Transport(TransportError::Timeout))
        );
    }

    #[test]
    fn oversized_label_is_rejected_before_sending() {
        let mut c = controller(&[]);
        let long = "x".repeat(33);
        assert!(c.send_state(&long).is_err());
        assert!(c.link.sent.is_empty());
    }

    #[test]
    fn writes_send_opcode_then_position() {
        let mut s = settings();
        s.pot_settle_ms = 200;
        let mut c = Controller::new(Recorder::default(), Recorder::default(), s).unwrap();
        c.write_potentiometer(99, Potentiometer::Threshold).unwrap();
        assert_eq!(c.link.sent, vec![vec![1, 1], vec![99]]);
    }
}
