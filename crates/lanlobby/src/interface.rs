//! `LanSessionInterface`: named sessions plus LAN discovery, behind one API.
//!
//! This is where the layers meet:
//!
//! ```text
//!  caller ──create/start/end/…──► SessionRegistry ──needs advertising?──┐
//!     │                                                                 ▼
//!     └───────find/cancel──────► SessionSearch ◄──responses── LanBeacon ◄── tick()
//! ```
//!
//! # Locking
//!
//! Three mutexes, always taken in this order: search → registry → beacon.
//! No lock is held while events are delivered, so an event subscriber can
//! call back into the interface.
//!
//! # Advertising
//!
//! After every mutating registry operation the beacon is re-evaluated:
//! if some session needs advertising and the beacon is idle, it starts
//! hosting (LAN or routed, depending on that session); if it is already
//! hosting in the other mode, it is reopened in the right one; if nothing
//! needs advertising and the beacon is hosting, it stops. A running search is
//! never disturbed; hosting resumes once the search finishes.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use lanlobby_beacon::{BeaconError, BeaconEvent, BeaconState, HostMode, LanBeacon, SearchMode};
use lanlobby_protocol::{NboReader, SessionAdvert, SessionSettings, UniqueNetId};
use lanlobby_session::{
    Capabilities, MAX_LOCAL_PLAYERS, NamedSession, PlayerChanges, SessionError, SessionRegistry,
    SessionState,
};
use lanlobby_tick::Pollable;
use lanlobby_transport::TransportFactory;
use parking_lot::Mutex;
use rand::Rng;
use tracing::{debug, info, trace, warn};

use crate::{
    EventBus, JoinResult, LobbyConfig, LobbyError, LobbyEvent, SearchResult, SearchSettings,
    SearchState, SessionSearch,
};

#[derive(Debug, Default)]
struct SearchSlot {
    /// The in-flight search. `Some` only while `InProgress`.
    current: Option<SessionSearch>,
    /// The most recently finished search (done, failed, or cancelled).
    last: Option<SessionSearch>,
}

/// Named-session registry and LAN discovery for one process.
///
/// Share it behind an `Arc` and drive it with
/// [`spawn_poll_loop`](lanlobby_tick::spawn_poll_loop) (or call
/// [`tick`](Self::tick) yourself).
pub struct LanSessionInterface<F: TransportFactory> {
    config: LobbyConfig,
    capabilities: Capabilities,
    host_ip: Ipv4Addr,
    host_session_port: AtomicU16,
    search: Mutex<SearchSlot>,
    registry: Mutex<SessionRegistry>,
    beacon: Mutex<LanBeacon<F>>,
    events: EventBus,
}

impl<F: TransportFactory> std::fmt::Debug for LanSessionInterface<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanSessionInterface")
            .field("host_addr", &self.host_addr())
            .field("sessions", &self.num_sessions())
            .field("beacon", &self.beacon_state())
            .field("search", &self.search_state())
            .finish()
    }
}

/// Any loopback address is advertised as 127.0.0.1.
fn normalize_loopback(ip: Ipv4Addr) -> Ipv4Addr {
    if ip.is_loopback() { Ipv4Addr::LOCALHOST } else { ip }
}

impl<F: TransportFactory> LanSessionInterface<F> {
    pub fn new(factory: F, config: LobbyConfig, capabilities: Capabilities) -> Self {
        let host_ip = config
            .host_ip
            .unwrap_or_else(|| normalize_loopback(factory.local_ipv4()));
        let registry = SessionRegistry::new(config.registry_config(), capabilities.clone());
        let beacon = LanBeacon::new(factory, config.beacon.clone());
        info!(%host_ip, game_port = config.game_port, "lan session interface ready");

        Self {
            host_session_port: AtomicU16::new(config.routed_host_port()),
            config,
            capabilities,
            host_ip,
            search: Mutex::new(SearchSlot::default()),
            registry: Mutex::new(registry),
            beacon: Mutex::new(beacon),
            events: EventBus::new(),
        }
    }

    pub fn config(&self) -> &LobbyConfig {
        &self.config
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Where completion events are delivered.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// The address hosted sessions advertise.
    pub fn host_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.host_ip, self.config.game_port)
    }

    /// The port a routed host beacon listens on. Differs from
    /// [`LobbyConfig::routed_host_port`] after a fallback.
    pub fn host_session_port(&self) -> u16 {
        self.host_session_port.load(Ordering::Relaxed)
    }

    pub fn beacon_state(&self) -> BeaconState {
        self.beacon.lock().state()
    }

    // -----------------------------------------------------------------------
    // Advertising
    // -----------------------------------------------------------------------

    fn update_advertising(
        &self,
        registry: &SessionRegistry,
        beacon: &mut LanBeacon<F>,
        pending: &mut Vec<LobbyEvent>,
    ) -> Result<(), LobbyError> {
        let wanted = registry.advertising_session().map(|s| {
            let mode = if s.settings.is_lan_match {
                HostMode::Lan
            } else {
                HostMode::Routed {
                    listen_port: self.config.routed_host_port(),
                }
            };
            (s.name.clone(), mode)
        });

        match (wanted, beacon.state()) {
            (Some((name, mode)), BeaconState::NotUsingLanBeacon) => {
                self.start_hosting(beacon, mode, pending)?;
                debug!(session = %name, ?mode, "advertising started");
            }
            (Some((name, mode)), BeaconState::Hosting) if beacon.host_mode() != Some(mode) => {
                debug!(session = %name, from = ?beacon.host_mode(), to = ?mode, "switching beacon host mode");
                self.start_hosting(beacon, mode, pending)?;
            }
            (None, BeaconState::Hosting) => {
                beacon.stop();
                debug!("no session needs advertising, beacon stopped");
            }
            _ => {}
        }
        Ok(())
    }

    fn start_hosting(
        &self,
        beacon: &mut LanBeacon<F>,
        mode: HostMode,
        pending: &mut Vec<LobbyEvent>,
    ) -> Result<(), LobbyError> {
        let outcome = beacon.host(mode)?;
        if let HostMode::Routed { .. } = mode {
            self.host_session_port.store(outcome.port, Ordering::Relaxed);
        }
        if outcome.port_changed {
            info!(port = outcome.port, "beacon moved to fallback port");
            pending.push(LobbyEvent::PortChanged { port: outcome.port });
        }
        Ok(())
    }

    /// Like [`update_advertising`](Self::update_advertising), for callers
    /// that carry on in degraded mode when the beacon can't start.
    fn refresh_advertising(
        &self,
        registry: &SessionRegistry,
        beacon: &mut LanBeacon<F>,
        pending: &mut Vec<LobbyEvent>,
    ) {
        if let Err(e) = self.update_advertising(registry, beacon, pending) {
            warn!(error = %e, "could not start advertising");
        }
    }

    fn register_local_talkers(&self) {
        if self.config.is_dedicated {
            return;
        }
        if let Some(voice) = self.capabilities.voice() {
            for player in 0..MAX_LOCAL_PLAYERS {
                voice.register_local_talker(player);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------------

    /// Creates and (if needed) advertises a session hosted by local player
    /// `hosting_player_num`.
    ///
    /// On success the session is `Pending` with all slots open. If the
    /// beacon can't be started the session is rolled back.
    ///
    /// # Errors
    /// [`SessionError::AlreadyExists`] for a taken name, or the beacon's
    /// error if advertising failed.
    pub fn create_session(
        &self,
        hosting_player_num: usize,
        name: &str,
        settings: SessionSettings,
    ) -> Result<(), LobbyError> {
        let mut pending = Vec::new();
        let result = self.try_create(hosting_player_num, name, settings, &mut pending);
        if result.is_ok() {
            self.register_local_talkers();
        }
        pending.push(LobbyEvent::CreateSessionComplete {
            session: name.to_owned(),
            success: result.is_ok(),
        });
        self.events.emit_all(pending);
        result
    }

    fn try_create(
        &self,
        hosting_player_num: usize,
        name: &str,
        settings: SessionSettings,
        pending: &mut Vec<LobbyEvent>,
    ) -> Result<(), LobbyError> {
        let mut registry = self.registry.lock();
        if let Err(e) = registry.create(hosting_player_num, name, settings) {
            warn!(session = name, error = %e, "cannot create session");
            return Err(e.into());
        }
        registry.set_host_addr(name, self.host_addr())?;

        let mut beacon = self.beacon.lock();
        if let Err(e) = self.update_advertising(&registry, &mut beacon, pending) {
            warn!(session = name, error = %e, "advertising failed, rolling back session");
            let _ = registry.remove(name);
            return Err(e);
        }
        registry.mark_pending(name)?;
        Ok(())
    }

    /// Runs one registry operation, re-evaluates advertising, and emits the
    /// matching completion event.
    fn run_lifecycle<O>(
        &self,
        name: &str,
        op: O,
        event: fn(String, bool) -> LobbyEvent,
    ) -> Result<(), LobbyError>
    where
        O: FnOnce(&mut SessionRegistry) -> Result<(), SessionError>,
    {
        let mut pending = Vec::new();
        let result = self.apply(name, op, &mut pending);
        pending.push(event(name.to_owned(), result.is_ok()));
        self.events.emit_all(pending);
        result
    }

    fn apply<O>(&self, name: &str, op: O, pending: &mut Vec<LobbyEvent>) -> Result<(), LobbyError>
    where
        O: FnOnce(&mut SessionRegistry) -> Result<(), SessionError>,
    {
        let mut registry = self.registry.lock();
        if let Err(e) = op(&mut *registry) {
            warn!(session = name, error = %e, "session operation rejected");
            return Err(e.into());
        }
        let mut beacon = self.beacon.lock();
        self.refresh_advertising(&registry, &mut beacon, pending);
        Ok(())
    }

    /// `Pending`/`Ended` → `InProgress`.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] or [`SessionError::InvalidState`]; the
    /// session is unchanged in both cases.
    pub fn start_session(&self, name: &str) -> Result<(), LobbyError> {
        self.run_lifecycle(name, |r| r.start(name), |session, success| {
            LobbyEvent::StartSessionComplete { session, success }
        })
    }

    /// Replaces a session's settings.
    ///
    /// Always reports success, even for an unknown name (logged as a
    /// warning).
    pub fn update_session(&self, name: &str, settings: SessionSettings) -> Result<(), LobbyError> {
        let mut pending = Vec::new();
        if let Err(e) = self.apply(name, |r| r.update(name, settings), &mut pending) {
            warn!(session = name, error = %e, "update not applied, reporting success anyway");
        }
        pending.push(LobbyEvent::UpdateSessionComplete {
            session: name.to_owned(),
            success: true,
        });
        self.events.emit_all(pending);
        Ok(())
    }

    /// `InProgress` → `Ended`.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] or [`SessionError::InvalidState`].
    pub fn end_session(&self, name: &str) -> Result<(), LobbyError> {
        self.run_lifecycle(name, |r| r.end(name), |session, success| {
            LobbyEvent::EndSessionComplete { session, success }
        })
    }

    /// Removes a session in any state.
    ///
    /// # Errors
    /// [`SessionError::NotFound`].
    pub fn destroy_session(&self, name: &str) -> Result<(), LobbyError> {
        self.run_lifecycle(
            name,
            |r| r.remove(name).map(|_| ()),
            |session, success| LobbyEvent::DestroySessionComplete { session, success },
        )
    }

    /// Joins a session found by a search. The new local session is
    /// `Pending` and never advertises.
    ///
    /// A taken `name` is reported as [`JoinResult::AlreadyInSession`]
    /// rather than lumped in with [`JoinResult::UnknownError`].
    ///
    /// # Errors
    /// [`SessionError::AlreadyExists`] if `name` is taken, or
    /// [`LobbyError::NoHostAddress`] if the result has nowhere to connect.
    pub fn join_session(
        &self,
        player_num: usize,
        name: &str,
        result: &SearchResult,
    ) -> Result<(), LobbyError> {
        let outcome = self.try_join(player_num, name, &result.session);
        let join_result = match &outcome {
            Ok(()) => JoinResult::Success,
            Err(LobbyError::Session(SessionError::AlreadyExists(_))) => JoinResult::AlreadyInSession,
            Err(_) => JoinResult::UnknownError,
        };
        if outcome.is_ok() {
            self.register_local_talkers();
        }
        self.events.emit(&LobbyEvent::JoinSessionComplete {
            session: name.to_owned(),
            result: join_result,
        });
        outcome
    }

    fn try_join(&self, player_num: usize, name: &str, advert: &SessionAdvert) -> Result<(), LobbyError> {
        if advert.host_addr.is_none() {
            warn!(session = name, "search result has no host address");
            return Err(LobbyError::NoHostAddress(name.to_owned()));
        }
        let mut registry = self.registry.lock();
        if let Err(e) = registry.join(player_num, name, advert) {
            warn!(session = name, error = %e, "cannot join session");
            return Err(e.into());
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Players
    // -----------------------------------------------------------------------

    /// Adds players to a session, one slot each.
    ///
    /// Already-registered ids are skipped. Remote players are registered as
    /// remote talkers; a local player triggers a mute refresh.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if the session is missing.
    pub fn register_players(
        &self,
        name: &str,
        players: &[UniqueNetId],
        was_invited: bool,
    ) -> Result<PlayerChanges, LobbyError> {
        let mut pending = Vec::new();
        let result = self.change_players(name, &mut pending, |r| {
            r.register_players(name, players, was_invited)
        });

        if let (Ok(changes), Some(voice)) = (&result, self.capabilities.voice()) {
            for id in &changes.applied {
                if self.capabilities.is_local_player(id) {
                    voice.process_mute_change_notification();
                } else {
                    voice.register_remote_talker(id);
                }
            }
        }

        pending.push(LobbyEvent::RegisterPlayersComplete {
            session: name.to_owned(),
            players: players.to_vec(),
            success: result.is_ok(),
        });
        self.events.emit_all(pending);
        result
    }

    pub fn register_player(
        &self,
        name: &str,
        player: &UniqueNetId,
        was_invited: bool,
    ) -> Result<PlayerChanges, LobbyError> {
        self.register_players(name, std::slice::from_ref(player), was_invited)
    }

    /// Removes players from a session, freeing their slots.
    ///
    /// Ids that aren't registered are skipped. Remote players are
    /// unregistered as talkers.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if the session is missing.
    pub fn unregister_players(
        &self,
        name: &str,
        players: &[UniqueNetId],
    ) -> Result<PlayerChanges, LobbyError> {
        let mut pending = Vec::new();
        let result = self.change_players(name, &mut pending, |r| r.unregister_players(name, players));

        if let (Ok(changes), Some(voice)) = (&result, self.capabilities.voice()) {
            for id in changes.applied.iter().filter(|id| !self.capabilities.is_local_player(id)) {
                voice.unregister_remote_talker(id);
            }
        }

        pending.push(LobbyEvent::UnregisterPlayersComplete {
            session: name.to_owned(),
            players: players.to_vec(),
            success: result.is_ok(),
        });
        self.events.emit_all(pending);
        result
    }

    pub fn unregister_player(&self, name: &str, player: &UniqueNetId) -> Result<PlayerChanges, LobbyError> {
        self.unregister_players(name, std::slice::from_ref(player))
    }

    fn change_players<O>(
        &self,
        name: &str,
        pending: &mut Vec<LobbyEvent>,
        op: O,
    ) -> Result<PlayerChanges, LobbyError>
    where
        O: FnOnce(&mut SessionRegistry) -> Result<PlayerChanges, SessionError>,
    {
        let mut registry = self.registry.lock();
        let changes = op(&mut *registry).inspect_err(|e| {
            warn!(session = name, error = %e, "player change rejected");
        })?;
        // Open slots feed into join-in-progress advertising.
        let mut beacon = self.beacon.lock();
        self.refresh_advertising(&registry, &mut beacon, pending);
        Ok(changes)
    }

    // -----------------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------------

    /// Starts a session search. Results are collected until the beacon's
    /// query timeout passes without traffic; then
    /// [`LobbyEvent::FindSessionsComplete`] fires.
    ///
    /// Searching takes over the beacon: any hosting pauses until the search
    /// ends.
    ///
    /// # Errors
    /// [`LobbyError::SearchAlreadyPending`] (no event is emitted) if a
    /// search is running. Any other failure completes the search as failed
    /// right away and emits `FindSessionsComplete { success: false }`.
    pub fn find_sessions(&self, settings: SearchSettings) -> Result<(), LobbyError> {
        let mut pending = Vec::new();
        let result = {
            let mut slot = self.search.lock();
            if slot.current.is_some() {
                warn!("ignoring session search request while one is pending");
                return Err(LobbyError::SearchAlreadyPending);
            }
            self.start_search(&mut slot, settings, &mut pending)
        };
        if result.is_err() {
            pending.push(LobbyEvent::FindSessionsComplete { success: false });
        }
        self.events.emit_all(pending);
        result
    }

    fn start_search(
        &self,
        slot: &mut SearchSlot,
        settings: SearchSettings,
        pending: &mut Vec<LobbyEvent>,
    ) -> Result<(), LobbyError> {
        let nonce: u64 = rand::rng().random();
        let mut search = SessionSearch::begin(settings, nonce);

        let mode = if search.settings.is_lan_query {
            Ok(SearchMode::Lan)
        } else {
            search
                .settings
                .host_addr
                .map(|target| SearchMode::Routed {
                    listen_port: self.config.routed_client_port(),
                    target,
                })
                .ok_or(LobbyError::MissingSearchTarget)
        };
        let started = mode
            .and_then(|mode| self.beacon.lock().search(mode, nonce).map_err(LobbyError::from));

        match started {
            Ok(outcome) => {
                if outcome.port_changed {
                    pending.push(LobbyEvent::PortChanged { port: outcome.port });
                }
                info!(nonce, lan = search.settings.is_lan_query, port = outcome.port, "session search started");
                slot.current = Some(search);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "session search failed to start");
                search.state = SearchState::Failed;
                slot.last = Some(search);
                // A failed search may have torn down a hosting beacon.
                let registry = self.registry.lock();
                let mut beacon = self.beacon.lock();
                self.refresh_advertising(&registry, &mut beacon, pending);
                Err(e)
            }
        }
    }

    /// Abandons the running search. Responses still in flight are dropped.
    ///
    /// The search is recorded as `Failed`, yet the completion event always
    /// reports `success: true`, even when there was nothing to cancel.
    ///
    /// # Errors
    /// [`LobbyError::NoSearchInProgress`] if no search is running.
    pub fn cancel_find_sessions(&self) -> Result<(), LobbyError> {
        let mut pending = Vec::new();
        let result = {
            let mut slot = self.search.lock();
            match slot.current.take() {
                Some(mut search) => {
                    let registry = self.registry.lock();
                    let mut beacon = self.beacon.lock();
                    self.finalize_search(&registry, &mut beacon, &mut pending);
                    search.state = SearchState::Failed;
                    info!(results = search.results.len(), "session search cancelled");
                    slot.last = Some(search);
                    Ok(())
                }
                None => {
                    warn!("can't cancel a search that isn't in progress");
                    Err(LobbyError::NoSearchInProgress)
                }
            }
        };
        // Reported as a success either way; the search itself ends `Failed`.
        pending.push(LobbyEvent::CancelFindSessionsComplete { success: true });
        self.events.emit_all(pending);
        result
    }

    fn finalize_search(
        &self,
        registry: &SessionRegistry,
        beacon: &mut LanBeacon<F>,
        pending: &mut Vec<LobbyEvent>,
    ) {
        if beacon.state() == BeaconState::Searching {
            beacon.stop();
        }
        self.refresh_advertising(registry, beacon, pending);
    }

    /// State of the running search, else of the last finished one.
    pub fn search_state(&self) -> SearchState {
        let slot = self.search.lock();
        slot.current
            .as_ref()
            .or(slot.last.as_ref())
            .map_or(SearchState::NotStarted, |s| s.state)
    }

    /// Results so far of the running search, else of the last finished one.
    pub fn search_results(&self) -> Vec<SearchResult> {
        let slot = self.search.lock();
        slot.current
            .as_ref()
            .or(slot.last.as_ref())
            .map(|s| s.results.clone())
            .unwrap_or_default()
    }

    /// Snapshot of the running search.
    pub fn current_search(&self) -> Option<SessionSearch> {
        self.search.lock().current.clone()
    }

    /// Snapshot of the last finished search.
    pub fn last_search(&self) -> Option<SessionSearch> {
        self.search.lock().last.clone()
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Drains the beacon, answers queries, collects responses, and finishes
    /// a timed-out search.
    pub fn tick(&self, dt: Duration) {
        let mut pending = Vec::new();
        {
            let mut slot = self.search.lock();
            let mut registry = self.registry.lock();
            let mut beacon = self.beacon.lock();

            for event in beacon.tick(dt) {
                match event {
                    BeaconEvent::QueryReceived { nonce, from } => {
                        self.answer_query(&mut registry, &mut beacon, nonce, from);
                    }
                    BeaconEvent::ResponseReceived { payload, from } => {
                        record_response(&mut slot, &payload, from);
                    }
                    BeaconEvent::SearchTimedOut => {
                        self.complete_search(&mut slot, &registry, &mut beacon, &mut pending);
                    }
                }
            }
        }
        self.events.emit_all(pending);
    }

    fn answer_query(
        &self,
        registry: &mut SessionRegistry,
        beacon: &mut LanBeacon<F>,
        nonce: u64,
        from: Option<SocketAddrV4>,
    ) {
        let host_addr = self.host_addr();
        let responders: Vec<String> = registry.query_responders().map(|s| s.name.clone()).collect();

        for name in responders {
            if registry.set_host_addr(&name, host_addr).is_err() {
                continue;
            }
            let Some(session) = registry.get(&name) else {
                continue;
            };
            let mut packet = beacon.begin_response(nonce);
            packet.write(&session.to_advert());

            match beacon.send_response(packet) {
                Ok(()) => debug!(session = %name, nonce, ?from, "answered session query"),
                Err(BeaconError::Protocol(e)) => {
                    warn!(session = %name, error = %e, "session response too large, not sent");
                }
                Err(e) => warn!(session = %name, error = %e, "failed to send session response"),
            }
        }
    }

    fn complete_search(
        &self,
        slot: &mut SearchSlot,
        registry: &SessionRegistry,
        beacon: &mut LanBeacon<F>,
        pending: &mut Vec<LobbyEvent>,
    ) {
        self.finalize_search(registry, beacon, pending);
        if let Some(mut search) = slot.current.take() {
            if !search.results.is_empty() {
                search.sort_results();
            }
            search.state = SearchState::Done;
            info!(results = search.results.len(), "session search complete");
            slot.last = Some(search);
        }
        pending.push(LobbyEvent::FindSessionsComplete { success: true });
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn num_sessions(&self) -> usize {
        self.registry.lock().len()
    }

    /// Snapshot of a named session.
    pub fn named_session(&self, name: &str) -> Option<NamedSession> {
        self.registry.lock().get(name).cloned()
    }

    pub fn session_state(&self, name: &str) -> Option<SessionState> {
        self.registry.lock().get(name).map(NamedSession::state)
    }

    pub fn session_settings(&self, name: &str) -> Option<SessionSettings> {
        self.registry.lock().get(name).map(|s| s.settings.clone())
    }

    pub fn is_player_in_session(&self, name: &str, player: &UniqueNetId) -> bool {
        self.registry.lock().is_player_in_session(name, player)
    }

    pub fn is_session_joinable(&self, name: &str) -> bool {
        self.registry
            .lock()
            .get(name)
            .is_some_and(NamedSession::is_joinable)
    }

    /// `"ip:port"` to connect to for a named session.
    pub fn resolved_connect_string(&self, name: &str) -> Option<String> {
        let registry = self.registry.lock();
        let addr = registry.get(name)?.host_addr?;
        Some(addr.to_string())
    }

    /// `"ip:port"` to connect to for a search result.
    pub fn search_result_connect_string(&self, result: &SearchResult) -> Option<String> {
        result.connect_string()
    }

    /// Logs every named session at `info`.
    pub fn dump_session_state(&self) {
        let registry = self.registry.lock();
        info!(sessions = registry.len(), "named sessions");
        for session in registry.iter() {
            info!(host = registry.is_host(session), "{session}");
        }
    }
}

/// Adds one response to the running search.
fn record_response(slot: &mut SearchSlot, payload: &[u8], from: Option<SocketAddrV4>) {
    let Some(search) = slot.current.as_mut() else {
        trace!(?from, "response with no search running");
        return;
    };

    let mut reader = NboReader::new(payload);
    let mut session = match SessionAdvert::read(&mut reader) {
        Ok(session) => session,
        Err(e) => {
            debug!(?from, error = %e, "discarding unreadable session response");
            return;
        }
    };
    if reader.has_overflow() {
        debug!(?from, session_id = %session.session_id, "response settings overflowed, keeping result without settings");
    }

    // A routed host reports its own view of its address; the address we
    // actually reached it on is the one to connect to.
    if !search.settings.is_lan_query {
        if let (Some(target), Some(advertised)) = (search.settings.host_addr, session.host_addr) {
            session.host_addr = Some(SocketAddrV4::new(*target.ip(), advertised.port()));
        }
    }

    let ping_ms = search.elapsed_ms();
    debug!(session_id = %session.session_id, owner = %session.owning_user_id, ping_ms, "session found");
    search.results.push(SearchResult { session, ping_ms });
}

impl<F: TransportFactory> Pollable for LanSessionInterface<F> {
    fn poll_tick(&self, dt: Duration) {
        self.tick(dt);
    }
}
