//! # Transport Layer
//!
//! The ingress unit's socket and the rule for where reports go.
//!
//! ```text
//! peer:any_port  --command-->  node:listen_port
//! peer:response_port  <--report--  node:listen_port
//! ```
//!
//! Datagrams are fire-and-forget. Reports are addressed to the IP of the
//! last peer that sent a command; before any peer is known they have
//! nowhere to go and are dropped by the caller.

use std::io;
use std::net::{IpAddr, SocketAddr, UdpSocket};

use crate::error::TransportError;

/// Receive buffer size. Larger than any packet the node accepts, so an
/// oversized datagram arrives longer than the limit instead of cut to it.
pub const RECV_BUFFER_SIZE: usize = 2048;

/// Socket counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Datagrams written.
    pub packets_sent: u64,
    /// Datagrams read.
    pub packets_received: u64,
    /// Payload bytes written.
    pub bytes_sent: u64,
    /// Payload bytes read (after any truncation to the buffer).
    pub bytes_received: u64,
    /// Failed writes.
    pub send_errors: u64,
    /// Failed reads, not counting an empty socket.
    pub recv_errors: u64,
}

/// The node's UDP endpoint. Reads never block.
pub struct UdpTransport {
    socket: UdpSocket,
    bound: SocketAddr,
    inbox: Box<[u8; RECV_BUFFER_SIZE]>,
    stats: TransportStats,
}

impl UdpTransport {
    /// Opens the endpoint on `addr`.
    ///
    /// # Errors
    ///
    /// [`TransportError::Bind`] when the address is taken or the socket
    /// cannot be made non-blocking.
    pub fn bind(addr: SocketAddr) -> Result<Self, TransportError> {
        let open = || -> io::Result<(UdpSocket, SocketAddr)> {
            let socket = UdpSocket::bind(addr)?;
            socket.set_nonblocking(true)?;
            let bound = socket.local_addr()?;
            Ok((socket, bound))
        };
        let (socket, bound) = open().map_err(|source| TransportError::Bind { addr, source })?;

        Ok(Self { socket, bound, inbox: Box::new([0u8; RECV_BUFFER_SIZE]), stats: TransportStats::default() })
    }

    /// Opens the endpoint on `host:port` as written in the config file.
    ///
    /// # Errors
    ///
    /// [`TransportError::InvalidAddress`] if `host` is not an IP literal,
    /// otherwise as [`Self::bind`].
    pub fn bind_host(host: &str, port: u16) -> Result<Self, TransportError> {
        let ip: IpAddr = host.parse().map_err(|_| TransportError::InvalidAddress(host.to_string()))?;
        Self::bind(SocketAddr::new(ip, port))
    }

    /// Address actually bound; port 0 is resolved to the one the OS chose.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.bound
    }

    /// Writes one datagram to `to`.
    ///
    /// # Errors
    ///
    /// Whatever the socket reports. Failures are counted either way.
    pub fn send_to(&mut self, payload: &[u8], to: SocketAddr) -> io::Result<usize> {
        let written = self.socket.send_to(payload, to);
        match &written {
            Ok(n) => {
                self.stats.packets_sent += 1;
                self.stats.bytes_sent += *n as u64;
            }
            Err(_) => self.stats.send_errors += 1,
        }
        written
    }

    /// Takes the next waiting datagram, or `None` when the socket is empty.
    /// The slice borrows the internal buffer until the next call.
    pub fn poll_datagram(&mut self) -> Option<(&[u8], SocketAddr)> {
        let (len, from) = match self.socket.recv_from(self.inbox.as_mut_slice()) {
            Ok(received) => received,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return None,
            Err(e) => {
                self.stats.recv_errors += 1;
                tracing::debug!("Socket read failed: {e}");
                return None;
            }
        };
        self.stats.packets_received += 1;
        self.stats.bytes_received += len as u64;
        Some((&self.inbox[..len], from))
    }

    /// Counters so far.
    #[must_use]
    pub const fn stats(&self) -> &TransportStats {
        &self.stats
    }
}

/// Remembers which host reports should go to.
#[derive(Clone, Copy, Debug)]
pub struct PeerTracker {
    peer: Option<IpAddr>,
    response_port: u16,
}

impl PeerTracker {
    /// No peer yet; reports will go to `response_port` once one appears.
    #[must_use]
    pub const fn new(response_port: u16) -> Self {
        Self { peer: None, response_port }
    }

    /// Notes the sender of a well-formed packet. The newest sender wins.
    pub fn observe(&mut self, from: SocketAddr) {
        let ip = from.ip();
        if self.peer.replace(ip) != Some(ip) {
            tracing::info!("Peer is now {ip}");
        }
    }

    /// True once any peer has been seen.
    #[inline]
    #[must_use]
    pub const fn is_known(&self) -> bool {
        self.peer.is_some()
    }

    /// Report destination, if a peer is known.
    #[must_use]
    pub fn target(&self) -> Option<SocketAddr> {
        self.peer.map(|ip| SocketAddr::new(ip, self.response_port))
    }
}
