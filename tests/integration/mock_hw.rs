//! In-memory links and a threaded device harness for integration tests.
//!
//! `MemoryTransport` pairs behave like two connected UDP sockets: each
//! `send` is one datagram, receive timeouts surface as
//! `TransportError::Timeout`, and dropping one end closes the other.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use apic::Error;
use apic::adapters::sim::SimBoard;
use apic::app::Device;
use apic::config::{DeviceConfig, Settings};
use apic::error::TransportError;
use apic::host::Controller;
use apic::isr::IsrShared;
use apic::protocol::Datagram;

// ── MemoryTransport ───────────────────────────────────────────

pub struct MemoryTransport {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
    timeout: Option<Duration>,
}

/// Two connected endpoints.
pub fn link_pair() -> (MemoryTransport, MemoryTransport) {
    let (a_tx, b_rx) = mpsc::channel();
    let (b_tx, a_rx) = mpsc::channel();
    (
        MemoryTransport {
            tx: a_tx,
            rx: a_rx,
            timeout: None,
        },
        MemoryTransport {
            tx: b_tx,
            rx: b_rx,
            timeout: None,
        },
    )
}

const CLOSED: Error = Error::Transport(TransportError::Closed);
const TIMEOUT: Error = Error::Transport(TransportError::Timeout);

impl Datagram for MemoryTransport {
    fn send(&mut self, data: &[u8]) -> apic::Result<()> {
        self.tx.send(data.to_vec()).map_err(|_| CLOSED)
    }

    fn recv(&mut self, buf: &mut [u8]) -> apic::Result<usize> {
        let datagram = match self.timeout {
            None => self.rx.recv().map_err(|_| CLOSED)?,
            Some(d) if d.is_zero() => self.rx.try_recv().map_err(|e| match e {
                TryRecvError::Empty => TIMEOUT,
                TryRecvError::Disconnected => CLOSED,
            })?,
            Some(d) => self.rx.recv_timeout(d).map_err(|e| match e {
                RecvTimeoutError::Timeout => TIMEOUT,
                RecvTimeoutError::Disconnected => CLOSED,
            })?,
        };
        // Oversized datagrams are truncated, as with a UDP socket.
        let n = datagram.len().min(buf.len());
        buf[..n].copy_from_slice(&datagram[..n]);
        Ok(n)
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> apic::Result<()> {
        self.timeout = timeout;
        Ok(())
    }
}

// ── Configurations ────────────────────────────────────────────

/// Host settings with no arming delay and a short reply timeout.
pub fn host_settings() -> Settings {
    Settings {
        arm_delay_ms: 0,
        timeout_secs: 5.0,
        ..Settings::default()
    }
}

/// Device configuration with a receive timeout that outlasts the host's
/// potentiometer settle delay.
pub fn device_config() -> DeviceConfig {
    DeviceConfig {
        recv_timeout_ms: 500,
        ..DeviceConfig::default()
    }
}

// ── Threaded session ──────────────────────────────────────────

/// What the device looked like once the host hung up.
pub struct Finished<R> {
    pub host: R,
    pub stop: Error,
    pub board: SimBoard,
    pub handled: u32,
}

/// Run a device on `board` in a worker thread and drive it from `host`.
///
/// The controller is dropped when `host` returns, which closes both
/// links and stops the dispatcher.
pub fn with_device<R>(
    board: SimBoard,
    settings: Settings,
    host: impl FnOnce(&mut Controller<MemoryTransport>) -> R,
) -> Finished<R> {
    with_stale_replies(board, settings, &[], host)
}

/// As [`with_device`], with `stale` already waiting on the host's
/// command link before the first request.
pub fn with_stale_replies<R>(
    board: SimBoard,
    settings: Settings,
    stale: &[&[u8]],
    host: impl FnOnce(&mut Controller<MemoryTransport>) -> R,
) -> Finished<R> {
    let (host_link, mut device_link) = link_pair();
    for datagram in stale {
        device_link.send(datagram).expect("queue stale reply");
    }
    let (host_stream, device_stream) = link_pair();
    let shared = IsrShared::new();
    let config = device_config();

    thread::scope(|s| {
        let (shared, config) = (&shared, &config);
        let worker = s.spawn(move || {
            let mut device = Device::new(board, device_link, device_stream, shared, config)
                .expect("device construction");
            let stop = device.run();
            let handled = device.handled();
            let (board, _, _) = device.into_parts();
            (stop, board, handled)
        });

        let mut ctl = Controller::new(host_link, host_stream, settings).expect("controller construction");
        let result = host(&mut ctl);
        ctl.disconnect();

        let (stop, board, handled) = worker.join().expect("device thread panicked");
        Finished {
            host: result,
            stop,
            board,
            handled,
        }
    })
}
