//! An in-process subnet for tests and demos.
//!
//! [`MemoryNetwork`] is a shared hub. Each [`MemoryFactory`] is one
//! "machine" on it with its own virtual IPv4 address; sockets opened from a
//! factory are [`MemoryBeacon`]s. Delivery is synchronous: a datagram sent
//! now is readable by the next `receive` on the other side.
//!
//! Like UDP with `SO_REUSEADDR`, several sockets may share one address.
//! Sending to `255.255.255.255:port` delivers to every socket on `port`
//! except the sender. Sending to a unicast address delivers to every socket
//! bound to exactly that address.
//!
//! Failure injection: [`MemoryNetwork::block_port`] makes a port
//! unbindable, and [`MemoryNetwork::fail_sends`] makes every send fail.

use std::collections::{HashSet, VecDeque};
use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{BeaconTransport, BindSpec, TransportError, TransportFactory, bind_first};

type Datagram = (SocketAddrV4, Vec<u8>);

struct Endpoint {
    id: u64,
    addr: SocketAddrV4,
    inbox: VecDeque<Datagram>,
}

#[derive(Default)]
struct Hub {
    next_id: u64,
    endpoints: Vec<Endpoint>,
    blocked_ports: HashSet<u16>,
    fail_sends: bool,
}

impl Hub {
    fn deliver(&mut self, from_id: u64, from: SocketAddrV4, to: SocketAddrV4, data: &[u8]) {
        let is_broadcast = to.ip().is_broadcast();
        for ep in self.endpoints.iter_mut().filter(|ep| ep.id != from_id) {
            let hit = if is_broadcast {
                ep.addr.port() == to.port()
            } else {
                ep.addr == to
            };
            if hit {
                ep.inbox.push_back((from, data.to_vec()));
            }
        }
    }
}

/// A shared virtual subnet.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    hub: Arc<Mutex<Hub>>,
}

impl std::fmt::Debug for MemoryNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hub = self.hub.lock();
        f.debug_struct("MemoryNetwork")
            .field("endpoints", &hub.endpoints.len())
            .field("blocked_ports", &hub.blocked_ports)
            .field("fail_sends", &hub.fail_sends)
            .finish()
    }
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// A machine on this subnet with address `ip`.
    pub fn interface(&self, ip: Ipv4Addr) -> MemoryFactory {
        MemoryFactory {
            network: self.clone(),
            ip,
        }
    }

    /// Makes `port` unbindable on every interface, as if another process
    /// held it exclusively.
    pub fn block_port(&self, port: u16) {
        self.hub.lock().blocked_ports.insert(port);
    }

    pub fn unblock_port(&self, port: u16) {
        self.hub.lock().blocked_ports.remove(&port);
    }

    /// Makes every subsequent send fail (or succeed again).
    pub fn fail_sends(&self, fail: bool) {
        self.hub.lock().fail_sends = fail;
    }

    /// Number of open sockets on the subnet.
    pub fn open_sockets(&self) -> usize {
        self.hub.lock().endpoints.len()
    }

    /// Injects a raw datagram as if `from` had sent it to `to`.
    pub fn inject(&self, from: SocketAddrV4, to: SocketAddrV4, data: &[u8]) {
        self.hub.lock().deliver(u64::MAX, from, to, data);
    }
}

/// One machine on a [`MemoryNetwork`].
#[derive(Debug, Clone)]
pub struct MemoryFactory {
    network: MemoryNetwork,
    ip: Ipv4Addr,
}

impl MemoryFactory {
    pub fn network(&self) -> &MemoryNetwork {
        &self.network
    }
}

impl TransportFactory for MemoryFactory {
    type Transport = MemoryBeacon;

    fn open(&self, spec: &BindSpec) -> Result<MemoryBeacon, TransportError> {
        let mut hub = self.network.hub.lock();
        let port = bind_first(spec, |port| {
            if port == 0 || hub.blocked_ports.contains(&port) {
                Err(io::Error::from(io::ErrorKind::AddrInUse))
            } else {
                Ok(port)
            }
        })?;

        let id = hub.next_id;
        hub.next_id += 1;
        let addr = SocketAddrV4::new(self.ip, port);
        hub.endpoints.push(Endpoint {
            id,
            addr,
            inbox: VecDeque::new(),
        });
        tracing::trace!(%addr, "memory socket open");

        Ok(MemoryBeacon {
            network: self.network.clone(),
            id,
            addr,
            target: spec.target,
            last_sender: None,
        })
    }

    fn local_ipv4(&self) -> Ipv4Addr {
        self.ip
    }
}

/// A socket on a [`MemoryNetwork`]. Closes itself on drop.
pub struct MemoryBeacon {
    network: MemoryNetwork,
    id: u64,
    addr: SocketAddrV4,
    target: SocketAddrV4,
    last_sender: Option<SocketAddrV4>,
}

impl std::fmt::Debug for MemoryBeacon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBeacon")
            .field("addr", &self.addr)
            .field("target", &self.target)
            .finish()
    }
}

impl MemoryBeacon {
    pub fn local_addr(&self) -> SocketAddrV4 {
        self.addr
    }

    fn send_to(&self, data: &[u8], to: SocketAddrV4) -> Result<(), TransportError> {
        let mut hub = self.network.hub.lock();
        if hub.fail_sends {
            return Err(TransportError::SendFailed(io::Error::other(
                "send disabled on memory network",
            )));
        }
        hub.deliver(self.id, self.addr, to, data);
        Ok(())
    }
}

impl BeaconTransport for MemoryBeacon {
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let mut hub = self.network.hub.lock();
        let Some(ep) = hub.endpoints.iter_mut().find(|ep| ep.id == self.id) else {
            return Ok(0);
        };
        let Some((from, data)) = ep.inbox.pop_front() else {
            return Ok(0);
        };
        // Datagram semantics: anything past the buffer is lost.
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        self.last_sender = Some(from);
        Ok(n)
    }

    fn broadcast(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.send_to(data, self.target)
    }

    fn reply(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let to = self.last_sender.ok_or(TransportError::NoPeer)?;
        self.send_to(data, to)
    }

    fn local_port(&self) -> u16 {
        self.addr.port()
    }

    fn last_sender(&self) -> Option<SocketAddrV4> {
        self.last_sender
    }
}

impl Drop for MemoryBeacon {
    fn drop(&mut self) {
        self.network.hub.lock().endpoints.retain(|ep| ep.id != self.id);
    }
}
