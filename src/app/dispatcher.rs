//! Command dispatcher: the device agent's main loop.
//!
//! [`Device`] owns the board, the command link and the stream link, plus
//! the small amount of in-memory state the commands mutate (state label,
//! polarity, test pulse).  One command runs at a time.
//!
//! ```text
//!            known opcode
//!   ┌──────┐ ───────────▶ ┌───────────┐
//!   │ Idle │              │ Executing │
//!   └──────┘ ◀─────────── └───────────┘
//!      │      handler returns
//!      │ unknown opcode
//!      ▼
//!   Err(UnknownOpcode)
//! ```

use log::{debug, info, warn};

use crate::acquisition::{burst, polled, rate, stream};
use crate::config::DeviceConfig;
use crate::error::{Error, Result, TransportError};
use crate::isr::IsrShared;
use crate::protocol::codec::{MAX_DATAGRAM, STATE_LABEL_MAX, decode_u32, decode_u64};
use crate::protocol::transport::recv_byte;
use crate::protocol::{Datagram, GAIN_POT_ADDR, Opcode, Polarity, THRESHOLD_POT_ADDR};

use super::commands::Command;
use super::ports::Board;

/// Dispatcher state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Waiting for an opcode.
    Idle,
    /// A handler is running.
    Executing(Command),
}

/// The device agent.
pub struct Device<'a, B, T, S = T> {
    board: B,
    link: T,
    stream: S,
    shared: &'a IsrShared,
    config: &'a DeviceConfig,
    state: DispatchState,
    label: heapless::String<STATE_LABEL_MAX>,
    polarity: Polarity,
    test_pulse: bool,
    handled: u32,
}

impl<'a, B: Board, T: Datagram, S: Datagram> Device<'a, B, T, S> {
    /// Build the agent and drive the front end to its power-on levels.
    pub fn new(
        mut board: B,
        mut link: T,
        stream: S,
        shared: &'a IsrShared,
        config: &'a DeviceConfig,
    ) -> Result<Self> {
        link.set_timeout(Some(config.recv_timeout()))?;
        board.set_polarity(false);
        board.set_test_pulse(false);
        Ok(Self {
            board,
            link,
            stream,
            shared,
            config,
            state: DispatchState::Idle,
            label: config.default_label.clone(),
            polarity: Polarity::default(),
            test_pulse: false,
            handled: 0,
        })
    }

    // ── Main loop ─────────────────────────────────────────────

    /// Serve commands until an unknown opcode arrives or the command link
    /// closes.  Handler failures are logged and the loop continues.
    pub fn run(&mut self) -> Error {
        info!("dispatcher: serving, label {:?}", self.label.as_str());
        loop {
            match self.serve_one() {
                Ok(_) => {}
                Err(e @ (Error::UnknownOpcode(_) | Error::Transport(TransportError::Closed))) => {
                    warn!("dispatcher: stopping: {e}");
                    return e;
                }
                Err(e) => warn!("dispatcher: command aborted: {e}"),
            }
        }
    }

    /// Wait for one datagram and execute it.
    ///
    /// Returns `Ok(None)` if nothing arrived within the receive timeout or
    /// the datagram was too short to be an opcode.  An unknown opcode is
    /// returned as an error without running anything.
    pub fn serve_one(&mut self) -> Result<Option<Command>> {
        let mut buf = [0u8; MAX_DATAGRAM];
        let n = match self.link.recv(&mut buf) {
            Ok(n) => n,
            Err(Error::Transport(TransportError::Timeout)) => return Ok(None),
            Err(e) => return Err(e),
        };

        let Some(op) = Opcode::from_bytes(&buf[..n]) else {
            debug!("dispatcher: ignoring {n}-byte datagram");
            return Ok(None);
        };
        let cmd = Command::from_opcode(op).ok_or(Error::UnknownOpcode(op))?;

        info!("dispatcher: {cmd}");
        self.state = DispatchState::Executing(cmd);
        let outcome = self.execute(cmd);
        self.state = DispatchState::Idle;
        self.handled = self.handled.wrapping_add(1);
        outcome.map(|()| Some(cmd))
    }

    fn execute(&mut self, cmd: Command) -> Result<()> {
        match cmd {
            Command::ReadPotentiometers => self.read_potentiometers(),
            Command::ScanBus => self.scan_bus(),
            Command::WritePotentiometer(pot) => {
                let addr = pot.address();
                if !self.board.is_ready(addr) {
                    return Err(Error::BusDeviceAbsent(addr));
                }
                let position = recv_byte(&mut self.link)?;
                self.board.write(addr, &[0x00, position])
            }
            Command::StartStreaming => {
                let target = decode_u32(&self.recv_payload()?)?;
                stream::run(
                    &mut self.board,
                    &mut self.stream,
                    target,
                    self.config.stream_sample_period_us,
                );
                Ok(())
            }
            Command::StartBurst => {
                let target = decode_u64(&self.recv_payload()?)?;
                burst::run(&mut self.board, &mut self.link, self.shared, target)
            }
            Command::StartPolled => {
                let repeats = decode_u32(&self.recv_payload()?)?;
                polled::run(&mut self.board, &mut self.link, repeats)
            }
            Command::SetPolarity(p) => {
                self.board.set_polarity(p == Polarity::Positive);
                self.polarity = p;
                Ok(())
            }
            Command::MeasureRate => {
                let hz = rate::run(&mut self.board, self.shared, self.config.rate_window());
                self.link.send(&hz.to_le_bytes())
            }
            Command::SetTestPulse(on) => {
                self.board.set_test_pulse(on);
                self.test_pulse = on;
                Ok(())
            }
            Command::GetState => self.link.send(self.label.as_bytes()),
            Command::SetState => self.set_state(),
        }
    }

    // ── Handlers ──────────────────────────────────────────────

    fn read_potentiometers(&mut self) -> Result<()> {
        for addr in [GAIN_POT_ADDR, THRESHOLD_POT_ADDR] {
            if !self.board.is_ready(addr) {
                return Err(Error::BusDeviceAbsent(addr));
            }
        }
        let gain = self.board.read_byte(GAIN_POT_ADDR)?;
        let threshold = self.board.read_byte(THRESHOLD_POT_ADDR)?;
        self.link.send(&[gain])?;
        self.link.send(&[threshold])
    }

    fn scan_bus(&mut self) -> Result<()> {
        let mut found = [0u8; 2];
        let n = self.board.scan(&mut found);
        debug!("scan: {:02X?}", &found[..n]);
        self.link.send(&found)
    }

    fn set_state(&mut self) -> Result<()> {
        let mut buf = [0u8; MAX_DATAGRAM];
        let n = self.link.recv(&mut buf)?;
        let text = core::str::from_utf8(&buf[..n]).map_err(|_| Error::Payload("label is not UTF-8"))?;
        let mut label = heapless::String::new();
        label
            .push_str(text)
            .map_err(|()| Error::Payload("label longer than 32 bytes"))?;
        info!("state: {:?} -> {:?}", self.label.as_str(), text);
        self.label = label;
        Ok(())
    }

    /// Receive the fixed-size payload that follows an opcode.  Bytes past
    /// the largest fixed payload are ignored.
    fn recv_payload(&mut self) -> Result<heapless::Vec<u8, 8>> {
        let mut buf = [0u8; MAX_DATAGRAM];
        let n = self.link.recv(&mut buf)?;
        heapless::Vec::from_slice(&buf[..n.min(8)]).map_err(|()| Error::Payload("oversized payload"))
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn test_pulse(&self) -> bool {
        self.test_pulse
    }

    /// Commands executed so far, aborted ones included.
    pub fn handled(&self) -> u32 {
        self.handled
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    pub fn into_parts(self) -> (B, T, S) {
        (self.board, self.link, self.stream)
    }
}
