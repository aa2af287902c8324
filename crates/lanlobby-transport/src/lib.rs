//! Transport abstraction layer for LAN session discovery.
//!
//! Provides the [`BeaconTransport`] and [`TransportFactory`] traits that
//! abstract over a non-blocking datagram socket, plus two implementations:
//!
//! - [`UdpFactory`] / [`UdpBeacon`]: real UDP sockets built with `socket2`
//!   (reuse-address, broadcast-capable, non-blocking).
//! - [`MemoryNetwork`]: an in-process subnet with virtual IPs, used by
//!   tests and demos to run hosts and searchers side by side.
//!
//! # Feature Flags
//!
//! - `udp` (default): the `socket2`-backed UDP transport.

mod error;
mod memory;
#[cfg(feature = "udp")]
mod udp;

pub use error::TransportError;
pub use memory::{MemoryBeacon, MemoryFactory, MemoryNetwork};
#[cfg(feature = "udp")]
pub use udp::{UdpBeacon, UdpFactory};

use std::net::{Ipv4Addr, SocketAddrV4};

/// Sequential ports to try when the requested port can't be bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortFallback {
    /// First fallback port.
    pub base: u16,
    /// How many ports, starting at `base`, to try.
    pub attempts: u16,
}

/// Everything needed to open a beacon socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindSpec {
    /// Port to listen on.
    pub port: u16,
    /// Where [`BeaconTransport::broadcast`] sends. Usually the subnet
    /// broadcast address on the announce port; for routed searches, the
    /// host's address.
    pub target: SocketAddrV4,
    /// Fallback ports, or `None` to fail outright when `port` is taken.
    pub fallback: Option<PortFallback>,
}

impl BindSpec {
    /// Listen on `port` and broadcast to `255.255.255.255:port`.
    pub fn broadcast(port: u16) -> Self {
        Self {
            port,
            target: SocketAddrV4::new(Ipv4Addr::BROADCAST, port),
            fallback: None,
        }
    }

    pub fn with_target(mut self, target: SocketAddrV4) -> Self {
        self.target = target;
        self
    }

    pub fn with_fallback(mut self, base: u16, attempts: u16) -> Self {
        self.fallback = Some(PortFallback { base, attempts });
        self
    }

    /// The ports to try, in order: the requested one, then the fallbacks.
    pub fn candidate_ports(&self) -> impl Iterator<Item = u16> + '_ {
        let fallback = self
            .fallback
            .into_iter()
            .flat_map(|f| (0..f.attempts).filter_map(move |i| f.base.checked_add(i)))
            .filter(move |p| *p != self.port);
        std::iter::once(self.port).chain(fallback)
    }
}

/// A bound, non-blocking datagram socket.
///
/// Implementations must never block the caller.
pub trait BeaconTransport: Send + 'static {
    /// Reads one pending datagram into `buf`.
    ///
    /// Returns `Ok(0)` when nothing is pending.
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Sends to the cached target address. Succeeds only if every byte was
    /// accepted by the socket.
    fn broadcast(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Sends to whoever sent the most recently received datagram.
    fn reply(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// The port this socket actually bound.
    fn local_port(&self) -> u16;

    /// Source of the most recently received datagram.
    fn last_sender(&self) -> Option<SocketAddrV4>;
}

/// Opens [`BeaconTransport`]s and knows the local interface address.
pub trait TransportFactory: Send + Sync + 'static {
    /// The socket type produced by this factory.
    type Transport: BeaconTransport;

    /// Binds a socket, walking [`BindSpec::candidate_ports`] until one works.
    ///
    /// Callers compare [`BeaconTransport::local_port`] against
    /// `spec.port` to find out whether a fallback port was used.
    fn open(&self, spec: &BindSpec) -> Result<Self::Transport, TransportError>;

    /// Best guess at this machine's LAN-facing IPv4 address.
    fn local_ipv4(&self) -> Ipv4Addr;
}

/// Tries each candidate port with `bind_one`, returning the first success
/// or the error from the requested port.
pub(crate) fn bind_first<T>(
    spec: &BindSpec,
    mut bind_one: impl FnMut(u16) -> std::io::Result<T>,
) -> Result<T, TransportError> {
    let mut first_error = None;
    for port in spec.candidate_ports() {
        match bind_one(port) {
            Ok(t) => {
                if port != spec.port {
                    tracing::info!(requested = spec.port, port, "bound fallback port");
                }
                return Ok(t);
            }
            Err(e) => {
                tracing::debug!(port, error = %e, "bind attempt failed");
                first_error.get_or_insert(e);
            }
        }
    }
    Err(TransportError::BindFailed {
        port: spec.port,
        source: first_error
            .unwrap_or_else(|| std::io::Error::other("no candidate ports")),
    })
}
