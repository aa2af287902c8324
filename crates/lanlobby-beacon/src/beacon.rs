//! The beacon state machine.
//!
//! ```text
//!                 host()                      search()
//!   Hosting ◄────────────── NotUsingLanBeacon ──────────────► Searching
//!      │                          ▲     ▲                         │
//!      └────────── stop() ────────┘     └──── stop() / timeout ───┘
//! ```
//!
//! One socket at a time. `host()` or `search()` while already active stops
//! the current socket first. `stop()` closes the socket and throws away any
//! undelivered packets, so nothing from an old role leaks into a new one.
//!
//! While hosting, only queries are accepted. While searching, only
//! responses carrying our nonce are accepted. Everything else is dropped
//! silently (logged at `trace`).

use std::net::SocketAddrV4;
use std::time::Duration;

use lanlobby_protocol::{GameIdentity, NboWriter, begin_response, build_query, validate_query, validate_response};
use lanlobby_transport::{BeaconTransport, BindSpec, TransportFactory};

use crate::{BeaconConfig, BeaconError};

/// What the beacon is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeaconState {
    NotUsingLanBeacon,
    Hosting,
    Searching,
}

/// How a host socket is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostMode {
    /// Listen on the announce port; broadcast responses to the subnet.
    Lan,
    /// Listen on `listen_port` (or a fallback); reply to each querier directly.
    Routed { listen_port: u16 },
}

/// Where a search query goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Broadcast to the announce port and listen there for responses.
    Lan,
    /// Send to one known host; listen on `listen_port` (or a fallback).
    Routed {
        listen_port: u16,
        target: SocketAddrV4,
    },
}

/// Result of opening a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindOutcome {
    /// The port actually bound.
    pub port: u16,
    /// True if `port` differs from the one requested.
    pub port_changed: bool,
}

/// Something that happened during a [`LanBeacon::tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeaconEvent {
    /// A valid query arrived while hosting.
    QueryReceived {
        nonce: u64,
        from: Option<SocketAddrV4>,
    },
    /// A valid response to our search arrived. `payload` is everything
    /// after the header.
    ResponseReceived {
        payload: Vec<u8>,
        from: Option<SocketAddrV4>,
    },
    /// The search went a full timeout without any traffic. Fires once.
    SearchTimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Host(HostMode),
    Search(SearchMode),
}

/// A discovery beacon over a pluggable transport.
pub struct LanBeacon<F: TransportFactory> {
    factory: F,
    config: BeaconConfig,
    identity: GameIdentity,
    transport: Option<F::Transport>,
    role: Option<Role>,
    nonce: u64,
    time_left: Duration,
    timed_out: bool,
}

impl<F: TransportFactory> std::fmt::Debug for LanBeacon<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanBeacon")
            .field("state", &self.state())
            .field("role", &self.role)
            .field("port", &self.local_port())
            .field("time_left", &self.time_left)
            .finish()
    }
}

impl<F: TransportFactory> LanBeacon<F> {
    pub fn new(factory: F, config: BeaconConfig) -> Self {
        let identity = config.identity();
        Self {
            factory,
            config,
            identity,
            transport: None,
            role: None,
            nonce: 0,
            time_left: Duration::ZERO,
            timed_out: false,
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn config(&self) -> &BeaconConfig {
        &self.config
    }

    pub fn state(&self) -> BeaconState {
        match self.role {
            None => BeaconState::NotUsingLanBeacon,
            Some(Role::Host(_)) => BeaconState::Hosting,
            Some(Role::Search(_)) => BeaconState::Searching,
        }
    }

    pub fn is_active(&self) -> bool {
        self.role.is_some()
    }

    /// The host mode, if hosting.
    pub fn host_mode(&self) -> Option<HostMode> {
        match self.role {
            Some(Role::Host(mode)) => Some(mode),
            _ => None,
        }
    }

    /// Nonce of the current (or last) search.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn local_port(&self) -> Option<u16> {
        self.transport.as_ref().map(BeaconTransport::local_port)
    }

    /// Time left before the current search times out.
    pub fn time_left(&self) -> Duration {
        self.time_left
    }

    fn open(&mut self, spec: BindSpec) -> Result<BindOutcome, BeaconError> {
        let transport = self.factory.open(&spec).inspect_err(|e| {
            tracing::error!(port = spec.port, error = %e, "failed to open beacon socket");
        })?;
        let port = transport.local_port();
        self.transport = Some(transport);
        Ok(BindOutcome {
            port,
            port_changed: port != spec.port,
        })
    }

    fn announce_spec(&self) -> BindSpec {
        BindSpec::broadcast(self.config.announce_port).with_target(SocketAddrV4::new(
            self.config.broadcast_addr,
            self.config.announce_port,
        ))
    }

    fn routed_spec(&self, listen_port: u16, target: SocketAddrV4) -> BindSpec {
        BindSpec::broadcast(listen_port)
            .with_target(target)
            .with_fallback(self.config.fallback_base_port, self.config.fallback_port_attempts)
    }

    /// Starts answering queries.
    ///
    /// # Errors
    /// Returns [`BeaconError::Transport`] if no port could be bound. The
    /// beacon is left inactive.
    pub fn host(&mut self, mode: HostMode) -> Result<BindOutcome, BeaconError> {
        self.stop();
        let spec = match mode {
            HostMode::Lan => self.announce_spec(),
            HostMode::Routed { listen_port } => {
                let broadcast = SocketAddrV4::new(self.config.broadcast_addr, listen_port);
                self.routed_spec(listen_port, broadcast)
            }
        };
        let outcome = self.open(spec)?;
        self.role = Some(Role::Host(mode));
        tracing::info!(port = outcome.port, ?mode, "beacon hosting");
        Ok(outcome)
    }

    /// Opens a search socket and sends one query tagged with `nonce`.
    ///
    /// # Errors
    /// Fails if the socket can't be opened or the query can't be sent. In
    /// both cases the beacon is left inactive.
    pub fn search(&mut self, mode: SearchMode, nonce: u64) -> Result<BindOutcome, BeaconError> {
        self.stop();
        let spec = match mode {
            SearchMode::Lan => self.announce_spec(),
            SearchMode::Routed { listen_port, target } => self.routed_spec(listen_port, target),
        };
        let outcome = self.open(spec)?;

        let query = build_query(&self.identity, nonce);
        let sent = match self.transport.as_mut() {
            Some(transport) => transport.broadcast(&query),
            None => Ok(()),
        };
        if let Err(e) = sent {
            tracing::warn!(error = %e, "failed to send search query");
            self.stop();
            return Err(e.into());
        }

        self.role = Some(Role::Search(mode));
        self.nonce = nonce;
        self.time_left = self.config.query_timeout();
        self.timed_out = false;
        tracing::info!(port = outcome.port, nonce, ?mode, "beacon searching");
        Ok(outcome)
    }

    /// Closes the socket and forgets the current role. Safe to call when
    /// already stopped.
    pub fn stop(&mut self) {
        if let Some(role) = self.role.take() {
            tracing::debug!(?role, "beacon stopped");
        }
        self.transport = None;
        self.time_left = Duration::ZERO;
        self.timed_out = false;
    }

    /// Starts a response to the query tagged `nonce`. Append the advert,
    /// then hand the writer to [`send_response`](Self::send_response).
    pub fn begin_response(&self, nonce: u64) -> NboWriter {
        begin_response(&self.identity, nonce, self.config.max_packet_size)
    }

    /// Sends a finished response: broadcast in LAN mode, straight back to
    /// the querier in routed mode.
    ///
    /// # Errors
    /// Fails if not hosting, if the packet overflowed `max_packet_size`, or
    /// if the send fails. None of these stop the beacon.
    pub fn send_response(&mut self, packet: NboWriter) -> Result<(), BeaconError> {
        let mode = self.host_mode().ok_or(BeaconError::WrongState {
            expected: BeaconState::Hosting,
            actual: self.state(),
        })?;
        let bytes = packet.finish()?;
        let Some(transport) = self.transport.as_mut() else {
            return Ok(());
        };
        match mode {
            HostMode::Lan => transport.broadcast(&bytes)?,
            HostMode::Routed { .. } => transport.reply(&bytes)?,
        }
        tracing::debug!(bytes = bytes.len(), "sent search response");
        Ok(())
    }

    /// Drains every pending datagram, then does timeout accounting.
    ///
    /// The timer only runs down on a pass that read nothing, so a response
    /// that lands in the same tick as the deadline is still delivered.
    pub fn tick(&mut self, dt: Duration) -> Vec<BeaconEvent> {
        let mut events = Vec::new();
        let (Some(role), Some(transport)) = (self.role, self.transport.as_mut()) else {
            return events;
        };

        let mut buf = vec![0u8; self.config.max_packet_size];
        let mut read_any = false;
        loop {
            let n = match transport.receive(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!(error = %e, "beacon receive failed");
                    break;
                }
            };
            read_any = true;
            let from = transport.last_sender();
            if let Some(event) = classify(role, &self.identity, self.nonce, &buf[..n], from) {
                events.push(event);
            }
        }

        if matches!(role, Role::Search(_)) && !read_any && !self.timed_out {
            self.time_left = self.time_left.saturating_sub(dt);
            if self.time_left.is_zero() {
                self.timed_out = true;
                tracing::debug!(nonce = self.nonce, "search timed out");
                events.push(BeaconEvent::SearchTimedOut);
            }
        }
        events
    }
}

/// Turns one datagram into an event, or drops it.
fn classify(
    role: Role,
    identity: &GameIdentity,
    nonce: u64,
    packet: &[u8],
    from: Option<SocketAddrV4>,
) -> Option<BeaconEvent> {
    let result = match role {
        Role::Host(_) => {
            validate_query(packet, identity).map(|nonce| BeaconEvent::QueryReceived { nonce, from })
        }
        Role::Search(_) => validate_response(packet, identity, nonce).map(|payload| {
            BeaconEvent::ResponseReceived {
                payload: payload.to_vec(),
                from,
            }
        }),
    };
    result
        .inspect_err(|reason| {
            tracing::trace!(bytes = packet.len(), ?from, %reason, "dropped beacon packet");
        })
        .ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
