//! UDP beacon sockets built with `socket2`.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};

use socket2::{Domain, Protocol, Socket, Type};

use crate::{BeaconTransport, BindSpec, TransportError, TransportFactory, bind_first};

/// Opens real UDP sockets on all IPv4 interfaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpFactory;

impl UdpFactory {
    pub fn new() -> Self {
        Self
    }
}

fn bind_socket(port: u16) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    // Host and searcher on one machine both sit on the announce port.
    socket.set_reuse_address(true)?;
    socket.set_broadcast(true)?;
    socket.set_nonblocking(true)?;
    let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port);
    socket.bind(&SocketAddr::V4(addr).into())?;
    Ok(socket.into())
}

impl TransportFactory for UdpFactory {
    type Transport = UdpBeacon;

    fn open(&self, spec: &BindSpec) -> Result<UdpBeacon, TransportError> {
        let socket = bind_first(spec, bind_socket)?;
        let port = socket
            .local_addr()
            .map(|a| a.port())
            .map_err(|e| TransportError::BindFailed {
                port: spec.port,
                source: e,
            })?;
        tracing::debug!(port, target = %spec.target, "udp beacon socket open");
        Ok(UdpBeacon {
            socket,
            port,
            target: spec.target,
            last_sender: None,
        })
    }

    /// Finds the address of the interface the OS would route off-box
    /// traffic through. `connect` on UDP sends nothing.
    fn local_ipv4(&self) -> Ipv4Addr {
        let resolve = || -> io::Result<Ipv4Addr> {
            let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
            socket.connect((Ipv4Addr::new(10, 254, 254, 254), 1))?;
            match socket.local_addr()? {
                SocketAddr::V4(a) => Ok(*a.ip()),
                SocketAddr::V6(_) => Ok(Ipv4Addr::LOCALHOST),
            }
        };
        resolve().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not resolve local address, using loopback");
            Ipv4Addr::LOCALHOST
        })
    }
}

/// A non-blocking UDP socket with a cached send target.
#[derive(Debug)]
pub struct UdpBeacon {
    socket: UdpSocket,
    port: u16,
    target: SocketAddrV4,
    last_sender: Option<SocketAddrV4>,
}

impl UdpBeacon {
    fn send_to(&self, data: &[u8], to: SocketAddrV4) -> Result<(), TransportError> {
        let sent = self
            .socket
            .send_to(data, to)
            .map_err(TransportError::SendFailed)?;
        if sent != data.len() {
            return Err(TransportError::PartialSend {
                sent,
                expected: data.len(),
            });
        }
        tracing::trace!(bytes = sent, %to, "datagram sent");
        Ok(())
    }
}

impl BeaconTransport for UdpBeacon {
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        match self.socket.recv_from(buf) {
            Ok((n, SocketAddr::V4(from))) => {
                self.last_sender = Some(from);
                Ok(n)
            }
            // IPv4-only socket; skip anything else.
            Ok((_, SocketAddr::V6(_))) => Ok(0),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(TransportError::ReceiveFailed(e)),
        }
    }

    fn broadcast(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.send_to(data, self.target)
    }

    fn reply(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let to = self.last_sender.ok_or(TransportError::NoPeer)?;
        self.send_to(data, to)
    }

    fn local_port(&self) -> u16 {
        self.port
    }

    fn last_sender(&self) -> Option<SocketAddrV4> {
        self.last_sender
    }
}
