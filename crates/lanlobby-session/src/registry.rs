//! The session registry: the table of named sessions.
//!
//! It's responsible for:
//! - Creating sessions (as host) and joining them (as client)
//! - Moving sessions through their lifecycle (start, end, destroy)
//! - Slot accounting when players register and unregister
//! - Deciding which sessions need to be advertised on the LAN
//!
//! # Concurrency note
//!
//! `SessionRegistry` is NOT thread-safe by itself. The lobby facade owns it
//! behind a single mutex and holds that lock for exactly one operation at a
//! time, never across event delivery.

use std::net::SocketAddrV4;

use lanlobby_protocol::{SessionAdvert, SessionSettings, UniqueNetId};
use rand::Rng;

use crate::{Capabilities, NamedSession, RegistryConfig, SessionError, SessionState};

/// Owner name used when no identity capability can name the host.
pub const FALLBACK_OWNER_NAME: &str = "LanUser";

/// What happened to each id passed to register/unregister.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerChanges {
    /// Ids that were added (or removed) and moved a slot counter.
    pub applied: Vec<UniqueNetId>,
    /// Ids that were already registered (or weren't registered).
    pub skipped: Vec<UniqueNetId>,
}

/// The named-session table.
///
/// ## Lifecycle
///
/// ```text
/// create() ──► [Creating] ──mark_pending()──► [Pending] ──start()──► [InProgress]
/// join()   ─────────────────────────────────► [Pending]                 │
///                                                 ▲                    end()
///                                                 │                     ▼
///                                   start() ◄── [Ended] ◄───────────────┘
///
/// remove() from any state
/// ```
#[derive(Debug)]
pub struct SessionRegistry {
    /// Insertion-ordered. The first session that needs advertising decides
    /// the beacon mode, so order matters.
    sessions: Vec<NamedSession>,
    config: RegistryConfig,
    capabilities: Capabilities,
}

impl SessionRegistry {
    pub fn new(config: RegistryConfig, capabilities: Capabilities) -> Self {
        Self {
            sessions: Vec::new(),
            config,
            capabilities,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.sessions.iter().position(|s| s.name == name)
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut NamedSession, SessionError> {
        self.sessions
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| SessionError::NotFound(name.to_owned()))
    }

    fn ensure_absent(&self, name: &str) -> Result<(), SessionError> {
        if self.position(name).is_some() {
            return Err(SessionError::AlreadyExists(name.to_owned()));
        }
        Ok(())
    }

    /// Adds a session this process will host, in state `Creating`.
    ///
    /// The owner comes from the identity capability for
    /// `hosting_player_num`; without one, the owner id is the player index
    /// and the name is [`FALLBACK_OWNER_NAME`]. All slots start open.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyExists`] if `name` is taken.
    pub fn create(
        &mut self,
        hosting_player_num: usize,
        name: &str,
        settings: SessionSettings,
    ) -> Result<&NamedSession, SessionError> {
        self.ensure_absent(name)?;

        let identity = self.capabilities.identity();
        let owner_id = identity.and_then(|i| i.unique_player_id(hosting_player_num));
        let (owning_user_id, owning_user_name) = match owner_id {
            Some(id) if !id.is_empty() => {
                let nickname = identity
                    .and_then(|i| i.player_nickname(hosting_player_num))
                    .unwrap_or_default();
                (id, nickname)
            }
            _ => (
                UniqueNetId::new(hosting_player_num.to_string()),
                FALLBACK_OWNER_NAME.to_owned(),
            ),
        };

        let mut settings = settings;
        settings.build_unique_id = self.config.build_unique_id;

        let session = NamedSession {
            name: name.to_owned(),
            session_id: generate_session_id(),
            host_addr: None,
            state: SessionState::Creating,
            num_open_public_connections: settings.num_public_connections,
            num_open_private_connections: settings.num_private_connections,
            settings,
            owning_user_id,
            owning_user_name,
            hosting_player_num,
            registered_players: Vec::new(),
        };
        tracing::info!(session = name, id = %session.session_id, owner = %session.owning_user_id, "session created");
        self.sessions.push(session);
        Ok(&self.sessions[self.sessions.len() - 1])
    }

    /// Adds a session described by a search result, in state `Pending`.
    ///
    /// Joined sessions never advertise: `should_advertise` is forced off so
    /// clients don't re-broadcast the host's session.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyExists`] if `name` is taken.
    pub fn join(
        &mut self,
        player_num: usize,
        name: &str,
        advert: &SessionAdvert,
    ) -> Result<&NamedSession, SessionError> {
        self.ensure_absent(name)?;

        let mut settings = advert.settings.clone();
        settings.should_advertise = false;
        let configured_public = settings.num_public_connections;
        let configured_private = settings.num_private_connections;

        let session = NamedSession {
            name: name.to_owned(),
            session_id: advert.session_id.clone(),
            host_addr: advert.host_addr,
            state: SessionState::Pending,
            num_open_public_connections: advert.num_open_public_connections.min(configured_public),
            num_open_private_connections: advert
                .num_open_private_connections
                .min(configured_private),
            settings,
            owning_user_id: advert.owning_user_id.clone(),
            owning_user_name: advert.owning_user_name.clone(),
            hosting_player_num: player_num,
            registered_players: Vec::new(),
        };
        tracing::info!(session = name, id = %session.session_id, host = ?session.host_addr, "session joined");
        self.sessions.push(session);
        Ok(&self.sessions[self.sessions.len() - 1])
    }

    /// Moves a freshly created session from `Creating` to `Pending`.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] or, if not `Creating`,
    /// [`SessionError::InvalidState`].
    pub fn mark_pending(&mut self, name: &str) -> Result<(), SessionError> {
        let session = self.get_mut(name)?;
        if session.state != SessionState::Creating {
            return Err(SessionError::InvalidState {
                name: name.to_owned(),
                state: session.state,
                operation: "finish creating",
            });
        }
        session.state = SessionState::Pending;
        Ok(())
    }

    /// `Pending`/`Ended` → `InProgress`.
    ///
    /// # Errors
    /// [`SessionError::NotFound`], or [`SessionError::InvalidState`] from any
    /// other state (the session is left untouched).
    pub fn start(&mut self, name: &str) -> Result<(), SessionError> {
        let session = self.get_mut(name)?;
        match session.state {
            SessionState::Pending | SessionState::Ended => {
                session.state = SessionState::InProgress;
                tracing::info!(session = name, "session started");
                Ok(())
            }
            state => Err(SessionError::InvalidState {
                name: name.to_owned(),
                state,
                operation: "start",
            }),
        }
    }

    /// `InProgress` → `Ended`.
    ///
    /// # Errors
    /// [`SessionError::NotFound`], or [`SessionError::InvalidState`] if the
    /// session isn't in progress (the session is left untouched).
    pub fn end(&mut self, name: &str) -> Result<(), SessionError> {
        let session = self.get_mut(name)?;
        if session.state != SessionState::InProgress {
            return Err(SessionError::InvalidState {
                name: name.to_owned(),
                state: session.state,
                operation: "end",
            });
        }
        session.state = SessionState::Ended;
        tracing::info!(session = name, "session ended");
        Ok(())
    }

    /// Replaces the settings wholesale. Allowed in any state.
    ///
    /// Open-slot counters are clamped to the new capacity so the slot
    /// invariant survives a shrink.
    ///
    /// # Errors
    /// [`SessionError::NotFound`].
    pub fn update(&mut self, name: &str, settings: SessionSettings) -> Result<(), SessionError> {
        let session = self.get_mut(name)?;
        session.num_open_public_connections = session
            .num_open_public_connections
            .min(settings.num_public_connections);
        session.num_open_private_connections = session
            .num_open_private_connections
            .min(settings.num_private_connections);
        session.settings = settings;
        tracing::debug!(session = name, "session settings updated");
        Ok(())
    }

    /// Removes a session regardless of state.
    ///
    /// # Errors
    /// [`SessionError::NotFound`].
    pub fn remove(&mut self, name: &str) -> Result<NamedSession, SessionError> {
        let idx = self
            .position(name)
            .ok_or_else(|| SessionError::NotFound(name.to_owned()))?;
        let session = self.sessions.remove(idx);
        tracing::info!(session = name, "session removed");
        Ok(session)
    }

    /// Records the address clients should connect to.
    ///
    /// # Errors
    /// [`SessionError::NotFound`].
    pub fn set_host_addr(&mut self, name: &str, addr: SocketAddrV4) -> Result<(), SessionError> {
        self.get_mut(name)?.host_addr = Some(addr);
        Ok(())
    }

    /// Adds players, taking one open slot each (public first, then private).
    ///
    /// Ids already present are skipped, not errors. When no slot is left the
    /// player is still recorded; the counters just stay at zero.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if the session is missing.
    pub fn register_players(
        &mut self,
        name: &str,
        players: &[UniqueNetId],
        was_invited: bool,
    ) -> Result<PlayerChanges, SessionError> {
        let session = self.get_mut(name)?;
        let mut changes = PlayerChanges::default();

        for id in players {
            if session.registered_players.contains(id) {
                tracing::debug!(session = name, player = %id, "player already registered");
                changes.skipped.push(id.clone());
                continue;
            }
            session.registered_players.push(id.clone());
            if session.num_open_public_connections > 0 {
                session.num_open_public_connections -= 1;
            } else if session.num_open_private_connections > 0 {
                session.num_open_private_connections -= 1;
            }
            tracing::info!(session = name, player = %id, was_invited, "player registered");
            changes.applied.push(id.clone());
        }
        Ok(changes)
    }

    /// Removes players, giving back one slot each (public first, capped at
    /// the configured capacity, then private).
    ///
    /// Ids that aren't registered are skipped, not errors.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if the session is missing.
    pub fn unregister_players(
        &mut self,
        name: &str,
        players: &[UniqueNetId],
    ) -> Result<PlayerChanges, SessionError> {
        let session = self.get_mut(name)?;
        let mut changes = PlayerChanges::default();

        for id in players {
            let Some(idx) = session.registered_players.iter().position(|p| p == id) else {
                tracing::warn!(session = name, player = %id, "player is not part of session");
                changes.skipped.push(id.clone());
                continue;
            };
            session.registered_players.swap_remove(idx);
            if session.num_open_public_connections < session.settings.num_public_connections {
                session.num_open_public_connections += 1;
            } else if session.num_open_private_connections
                < session.settings.num_private_connections
            {
                session.num_open_private_connections += 1;
            }
            tracing::info!(session = name, player = %id, "player unregistered");
            changes.applied.push(id.clone());
        }
        Ok(changes)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn get(&self, name: &str) -> Option<&NamedSession> {
        self.sessions.iter().find(|s| s.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedSession> {
        self.sessions.iter()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn is_player_in_session(&self, name: &str, id: &UniqueNetId) -> bool {
        self.get(name).is_some_and(|s| s.has_player(id))
    }

    /// Dedicated servers host everything. Otherwise we host a session if
    /// our identity for its hosting player is its owner.
    pub fn is_host(&self, session: &NamedSession) -> bool {
        if self.config.is_dedicated {
            return true;
        }
        self.capabilities
            .identity()
            .and_then(|i| i.unique_player_id(session.hosting_player_num))
            .is_some_and(|id| id == session.owning_user_id)
    }

    /// Whether this session must keep a beacon alive.
    ///
    /// Requires advertising to be requested and this process to be the host.
    /// Then either a LAN match that is still joinable (not in progress, or
    /// join-in-progress with an open public slot), or a presence-joinable
    /// session.
    pub fn needs_advertising(&self, session: &NamedSession) -> bool {
        let s = &session.settings;
        let lan_joinable = s.is_lan_match
            && (session.state != SessionState::InProgress
                || (s.allow_join_in_progress && session.num_open_public_connections > 0));
        let presence_joinable = s.allow_join_via_presence || s.allow_join_via_presence_friends_only;

        s.should_advertise && self.is_host(session) && (lan_joinable || presence_joinable)
    }

    /// The first session (in creation order) that needs advertising.
    pub fn advertising_session(&self) -> Option<&NamedSession> {
        self.sessions.iter().find(|s| self.needs_advertising(s))
    }

    /// Sessions that should answer a discovery query right now.
    pub fn query_responders(&self) -> impl Iterator<Item = &NamedSession> {
        self.sessions
            .iter()
            .filter(|s| self.needs_advertising(s) && s.answers_queries())
    }
}

/// Generates a random 32-character hex session id (128 bits).
fn generate_session_id() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `SessionRegistry`, named
    //! `test_{function}_{scenario}_{expected}`.

    use std::net::Ipv4Addr;
    use std::sync::Arc;

    use super::*;
    use crate::StaticIdentity;

    // -- Helpers ----------------------------------------------------------

    fn host_identity() -> Capabilities {
        Capabilities::none().with_identity(Arc::new(StaticIdentity::single("host-0", "Host")))
    }

    fn registry() -> SessionRegistry {
        SessionRegistry::new(RegistryConfig::default(), host_identity())
    }

    fn lan_settings(public: u32, private: u32) -> SessionSettings {
        SessionSettings {
            num_public_connections: public,
            num_private_connections: private,
            should_advertise: true,
            is_lan_match: true,
            ..Default::default()
        }
    }

    fn pid(n: u32) -> UniqueNetId {
        UniqueNetId::new(format!("player-{n}"))
    }

    fn pending(reg: &mut SessionRegistry, name: &str, settings: SessionSettings) {
        reg.create(0, name, settings).unwrap();
        reg.mark_pending(name).unwrap();
    }

    fn assert_slots_within_capacity(s: &NamedSession) {
        assert!(s.num_open_public_connections() <= s.settings.num_public_connections);
        assert!(s.num_open_private_connections() <= s.settings.num_private_connections);
    }

    // =====================================================================
    // create() / join()
    // =====================================================================

    #[test]
    fn test_create_new_session_is_creating_with_full_slots() {
        let mut reg = registry();
        let s = reg.create(0, "Match1", lan_settings(4, 2)).unwrap();

        assert_eq!(s.state(), SessionState::Creating);
        assert_eq!(s.num_open_public_connections(), 4);
        assert_eq!(s.num_open_private_connections(), 2);
        assert_eq!(s.owning_user_id, UniqueNetId::new("host-0"));
        assert_eq!(s.owning_user_name, "Host");
        assert_eq!(s.session_id.len(), 32);
    }

    #[test]
    fn test_create_duplicate_name_returns_already_exists() {
        let mut reg = registry();
        reg.create(0, "Match1", lan_settings(4, 0)).unwrap();
        assert_eq!(
            reg.create(0, "Match1", lan_settings(2, 0)).unwrap_err(),
            SessionError::AlreadyExists("Match1".into())
        );
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_create_without_identity_synthesizes_owner() {
        let mut reg = SessionRegistry::new(RegistryConfig::default(), Capabilities::none());
        let s = reg.create(2, "Match1", lan_settings(4, 0)).unwrap();
        assert_eq!(s.owning_user_id, UniqueNetId::new("2"));
        assert_eq!(s.owning_user_name, FALLBACK_OWNER_NAME);
    }

    #[test]
    fn test_create_sessions_get_distinct_ids() {
        let mut reg = registry();
        let a = reg.create(0, "A", lan_settings(1, 0)).unwrap().session_id.clone();
        let b = reg.create(0, "B", lan_settings(1, 0)).unwrap().session_id.clone();
        assert_ne!(a, b);
    }

    #[test]
    fn test_create_stamps_build_id() {
        let mut reg = SessionRegistry::new(
            RegistryConfig {
                build_unique_id: 77,
                ..Default::default()
            },
            host_identity(),
        );
        let s = reg.create(0, "Match1", lan_settings(1, 0)).unwrap();
        assert_eq!(s.settings.build_unique_id, 77);
    }

    #[test]
    fn test_join_copies_advert_and_disables_advertising() {
        let mut reg = registry();
        let advert = SessionAdvert {
            owning_user_id: UniqueNetId::new("remote-host"),
            owning_user_name: "Remote".into(),
            num_open_private_connections: 0,
            num_open_public_connections: 3,
            host_addr: Some(SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), 7777)),
            session_id: "abc".into(),
            settings: lan_settings(4, 0),
        };
        let s = reg.join(0, "Game", &advert).unwrap();
        assert_eq!(s.state(), SessionState::Pending);
        assert_eq!(s.session_id, "abc");
        assert!(!s.settings.should_advertise);
        assert_eq!(s.num_open_public_connections(), 3);
        assert!(!reg.needs_advertising(reg.get("Game").unwrap()));
    }

    // =====================================================================
    // start() / end()
    // =====================================================================

    #[test]
    fn test_start_from_pending_and_ended_succeeds() {
        let mut reg = registry();
        pending(&mut reg, "Match1", lan_settings(4, 0));

        reg.start("Match1").unwrap();
        assert_eq!(reg.get("Match1").unwrap().state(), SessionState::InProgress);

        reg.end("Match1").unwrap();
        reg.start("Match1").unwrap();
        assert_eq!(reg.get("Match1").unwrap().state(), SessionState::InProgress);
    }

    #[test]
    fn test_start_from_creating_returns_invalid_state_unchanged() {
        let mut reg = registry();
        reg.create(0, "Match1", lan_settings(4, 0)).unwrap();

        let err = reg.start("Match1").unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidState { state: SessionState::Creating, operation: "start", .. }
        ));
        assert_eq!(reg.get("Match1").unwrap().state(), SessionState::Creating);
    }

    #[test]
    fn test_start_in_progress_returns_invalid_state() {
        let mut reg = registry();
        pending(&mut reg, "Match1", lan_settings(4, 0));
        reg.start("Match1").unwrap();
        assert!(matches!(reg.start("Match1"), Err(SessionError::InvalidState { .. })));
        assert_eq!(reg.get("Match1").unwrap().state(), SessionState::InProgress);
    }

    #[test]
    fn test_start_unknown_session_returns_not_found() {
        let mut reg = registry();
        assert_eq!(reg.start("nope"), Err(SessionError::NotFound("nope".into())));
    }

    #[test]
    fn test_end_pending_session_returns_invalid_state_unchanged() {
        let mut reg = registry();
        pending(&mut reg, "Match1", lan_settings(4, 0));
        assert!(matches!(reg.end("Match1"), Err(SessionError::InvalidState { .. })));
        assert_eq!(reg.get("Match1").unwrap().state(), SessionState::Pending);
    }

    // =====================================================================
    // update() / remove()
    // =====================================================================

    #[test]
    fn test_update_replaces_settings_in_any_state() {
        let mut reg = registry();
        pending(&mut reg, "Match1", lan_settings(4, 0));
        reg.start("Match1").unwrap();

        let mut new_settings = lan_settings(4, 0);
        new_settings.allow_join_in_progress = true;
        reg.update("Match1", new_settings.clone()).unwrap();
        assert_eq!(reg.get("Match1").unwrap().settings, new_settings);
    }

    #[test]
    fn test_update_shrinking_capacity_clamps_open_slots() {
        let mut reg = registry();
        pending(&mut reg, "Match1", lan_settings(8, 2));
        reg.update("Match1", lan_settings(3, 0)).unwrap();

        let s = reg.get("Match1").unwrap();
        assert_eq!(s.num_open_public_connections(), 3);
        assert_eq!(s.num_open_private_connections(), 0);
    }

    #[test]
    fn test_remove_twice_second_returns_not_found() {
        let mut reg = registry();
        pending(&mut reg, "Match1", lan_settings(4, 0));
        pending(&mut reg, "Other", lan_settings(4, 0));

        reg.remove("Match1").unwrap();
        assert_eq!(reg.remove("Match1").unwrap_err(), SessionError::NotFound("Match1".into()));
        assert_eq!(reg.len(), 1);
        assert!(reg.get("Other").is_some());
    }

    // =====================================================================
    // register_players() / unregister_players()
    // =====================================================================

    #[test]
    fn test_register_players_takes_public_then_private() {
        let mut reg = registry();
        pending(&mut reg, "Match1", lan_settings(2, 1));

        let changes = reg.register_players("Match1", &[pid(1), pid(2), pid(3)], false).unwrap();
        assert_eq!(changes.applied.len(), 3);

        let s = reg.get("Match1").unwrap();
        assert_eq!(s.num_open_public_connections(), 0);
        assert_eq!(s.num_open_private_connections(), 0);
    }

    #[test]
    fn test_register_players_duplicate_is_skipped_not_counted() {
        let mut reg = registry();
        pending(&mut reg, "Match1", lan_settings(4, 0));
        reg.register_players("Match1", &[pid(1)], false).unwrap();

        let changes = reg.register_players("Match1", &[pid(1), pid(2)], false).unwrap();
        assert_eq!(changes.applied, vec![pid(2)]);
        assert_eq!(changes.skipped, vec![pid(1)]);
        assert_eq!(reg.get("Match1").unwrap().num_open_public_connections(), 2);
    }

    #[test]
    fn test_register_players_when_full_keeps_counters_at_zero() {
        let mut reg = registry();
        pending(&mut reg, "Match1", lan_settings(1, 0));
        reg.register_players("Match1", &[pid(1), pid(2)], false).unwrap();

        let s = reg.get("Match1").unwrap();
        assert_eq!(s.num_open_public_connections(), 0);
        assert_eq!(s.registered_players().len(), 2);
    }

    #[test]
    fn test_register_players_missing_session_returns_not_found() {
        let mut reg = registry();
        assert!(matches!(
            reg.register_players("nope", &[pid(1)], false),
            Err(SessionError::NotFound(_))
        ));
    }

    #[test]
    fn test_register_then_unregister_restores_counts() {
        let mut reg = registry();
        pending(&mut reg, "Match1", lan_settings(3, 2));
        let players: Vec<_> = (1..=5).map(pid).collect();

        reg.register_players("Match1", &players, false).unwrap();
        assert_slots_within_capacity(reg.get("Match1").unwrap());
        reg.unregister_players("Match1", &players).unwrap();

        let s = reg.get("Match1").unwrap();
        assert_eq!(s.num_open_public_connections(), 3);
        assert_eq!(s.num_open_private_connections(), 2);
        assert!(s.registered_players().is_empty());
    }

    #[test]
    fn test_unregister_absent_player_is_skipped() {
        let mut reg = registry();
        pending(&mut reg, "Match1", lan_settings(4, 0));
        let changes = reg.unregister_players("Match1", &[pid(9)]).unwrap();
        assert_eq!(changes.skipped, vec![pid(9)]);
        assert_eq!(reg.get("Match1").unwrap().num_open_public_connections(), 4);
    }

    #[test]
    fn test_unregister_never_exceeds_capacity() {
        let mut reg = registry();
        pending(&mut reg, "Match1", lan_settings(1, 0));
        // Over-registered: two players, one slot.
        reg.register_players("Match1", &[pid(1), pid(2)], false).unwrap();
        reg.unregister_players("Match1", &[pid(1), pid(2)]).unwrap();

        let s = reg.get("Match1").unwrap();
        assert_eq!(s.num_open_public_connections(), 1);
        assert_slots_within_capacity(s);
    }

    // =====================================================================
    // is_host() / needs_advertising()
    // =====================================================================

    #[test]
    fn test_is_host_dedicated_always_true() {
        let mut reg = SessionRegistry::new(
            RegistryConfig {
                is_dedicated: true,
                ..Default::default()
            },
            Capabilities::none(),
        );
        reg.create(0, "Match1", lan_settings(4, 0)).unwrap();
        assert!(reg.is_host(reg.get("Match1").unwrap()));
    }

    #[test]
    fn test_is_host_without_identity_false() {
        let mut reg = SessionRegistry::new(RegistryConfig::default(), Capabilities::none());
        reg.create(0, "Match1", lan_settings(4, 0)).unwrap();
        assert!(!reg.is_host(reg.get("Match1").unwrap()));
    }

    #[test]
    fn test_needs_advertising_lan_pending_true() {
        let mut reg = registry();
        pending(&mut reg, "Match1", lan_settings(4, 0));
        assert!(reg.needs_advertising(reg.get("Match1").unwrap()));
    }

    #[test]
    fn test_needs_advertising_in_progress_without_jip_false() {
        let mut reg = registry();
        pending(&mut reg, "Match1", lan_settings(4, 0));
        reg.start("Match1").unwrap();
        assert!(!reg.needs_advertising(reg.get("Match1").unwrap()));
    }

    #[test]
    fn test_needs_advertising_in_progress_with_jip_needs_open_slot() {
        let mut reg = registry();
        let mut settings = lan_settings(1, 0);
        settings.allow_join_in_progress = true;
        pending(&mut reg, "Match1", settings);
        reg.start("Match1").unwrap();
        assert!(reg.needs_advertising(reg.get("Match1").unwrap()));

        reg.register_players("Match1", &[pid(1)], false).unwrap();
        assert!(!reg.needs_advertising(reg.get("Match1").unwrap()));
    }

    #[test]
    fn test_needs_advertising_presence_joinable_non_lan_true() {
        let mut reg = registry();
        let settings = SessionSettings {
            num_public_connections: 4,
            should_advertise: true,
            allow_join_via_presence: true,
            ..Default::default()
        };
        pending(&mut reg, "Match1", settings);
        reg.start("Match1").unwrap();
        assert!(reg.needs_advertising(reg.get("Match1").unwrap()));
    }

    #[test]
    fn test_needs_advertising_not_requested_false() {
        let mut reg = registry();
        let mut settings = lan_settings(4, 0);
        settings.should_advertise = false;
        pending(&mut reg, "Match1", settings);
        assert!(!reg.needs_advertising(reg.get("Match1").unwrap()));
        assert!(reg.advertising_session().is_none());
    }

    #[test]
    fn test_is_session_joinable_lan_counts_as_advertised() {
        let mut reg = registry();
        let mut settings = lan_settings(1, 0);
        settings.should_advertise = false;
        pending(&mut reg, "Match1", settings);
        assert!(reg.get("Match1").unwrap().is_joinable());

        reg.register_players("Match1", &[pid(1)], false).unwrap();
        assert!(!reg.get("Match1").unwrap().is_joinable());
    }
}
