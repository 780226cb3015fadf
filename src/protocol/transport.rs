//! Datagram transport abstraction.
//!
//! Concrete implementations:
//! - UDP socket with a fixed peer (both device and host; ESP-IDF provides `std::net`)
//! - In-memory channel pair (integration tests)
//!
//! The dispatcher, the acquisition modes and the host controller are all
//! generic over `Datagram`, so none of them touch sockets directly.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use crate::error::{Error, Result, TransportError};

use super::codec::MAX_DATAGRAM;

/// Message-oriented, unreliable channel.
///
/// Timeout semantics follow `std::net::UdpSocket`: `None` blocks forever,
/// `Some(Duration::ZERO)` polls without blocking.
pub trait Datagram {
    /// Send one datagram.
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive one datagram into `buf`, truncating anything that does not
    /// fit.  Returns `Error::Transport(Timeout)` when nothing arrives
    /// within the configured timeout.
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Current receive timeout.
    fn timeout(&self) -> Option<Duration>;

    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()>;
}

impl<T: Datagram + ?Sized> Datagram for &mut T {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        (**self).send(data)
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).recv(buf)
    }

    fn timeout(&self) -> Option<Duration> {
        (**self).timeout()
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        (**self).set_timeout(timeout)
    }
}

/// Discard everything already queued on `link`.
///
/// The previous timeout is restored even if a receive fails with
/// something other than a timeout.  Returns the number of bytes dropped.
pub fn drain<D: Datagram + ?Sized>(link: &mut D) -> Result<usize> {
    let saved = link.timeout();
    link.set_timeout(Some(Duration::ZERO))?;

    let mut scratch = [0u8; MAX_DATAGRAM];
    let mut dropped = 0usize;
    let outcome = loop {
        match link.recv(&mut scratch) {
            Ok(n) => dropped += n,
            Err(Error::Transport(TransportError::Timeout)) => break Ok(dropped),
            Err(e) => break Err(e),
        }
    };

    link.set_timeout(saved)?;
    if dropped > 0 {
        log::debug!("drained {dropped} stale bytes");
    }
    outcome
}

/// Receive exactly one byte-sized reply, ignoring any extra bytes.
pub fn recv_byte<D: Datagram + ?Sized>(link: &mut D) -> Result<u8> {
    let mut buf = [0u8; MAX_DATAGRAM];
    let n = link.recv(&mut buf)?;
    if n == 0 {
        return Err(Error::Payload("empty reply"));
    }
    Ok(buf[0])
}

// ── UDP ───────────────────────────────────────────────────────

/// UDP socket bound locally and talking to one fixed peer.
pub struct UdpTransport {
    socket: UdpSocket,
    peer: SocketAddr,
    timeout: Option<Duration>,
}

impl UdpTransport {
    /// Bind `local` and send everything to `peer`.
    pub fn bind(local: impl ToSocketAddrs, peer: impl ToSocketAddrs) -> Result<Self> {
        let socket = UdpSocket::bind(local)?;
        let peer = peer
            .to_socket_addrs()?
            .next()
            .ok_or(Error::Config("peer address did not resolve"))?;
        log::info!("udp {} -> {peer}", socket.local_addr()?);
        Ok(Self {
            socket,
            peer,
            timeout: None,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Redirect sends to a different peer.
    pub fn set_peer(&mut self, peer: SocketAddr) {
        self.peer = peer;
    }
}

impl Datagram for UdpTransport {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.socket.send_to(data, self.peer)?;
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        let (n, _from) = self.socket.recv_from(buf)?;
        Ok(n)
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        match timeout {
            Some(d) if d.is_zero() => self.socket.set_nonblocking(true)?,
            other => {
                self.socket.set_nonblocking(false)?;
                self.socket.set_read_timeout(other)?;
            }
        }
        self.timeout = timeout;
        Ok(())
    }
}

/// Scripted link for unit tests: replies come from `inbox`, sends are
/// recorded.  An empty inbox reads as a timeout.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct Recorder {
    pub inbox: std::collections::VecDeque<Vec<u8>>,
    pub sent: Vec<Vec<u8>>,
    timeout: Option<Duration>,
}

#[cfg(test)]
impl Recorder {
    pub fn with_inbox(datagrams: &[&[u8]]) -> Self {
        Self {
            inbox: datagrams.iter().map(|d| d.to_vec()).collect(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
impl Datagram for Recorder {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.sent.push(data.to_vec());
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        let d = self.inbox.pop_front().ok_or(TransportError::Timeout)?;
        let n = d.len().min(buf.len());
        buf[..n].copy_from_slice(&d[..n]);
        Ok(n)
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.timeout = timeout;
        Ok(())
    }
}
