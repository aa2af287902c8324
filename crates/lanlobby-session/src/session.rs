//! Session types: the records the registry keeps.
//!
//! A [`NamedSession`] is the local record of one game session, keyed by a
//! caller-chosen name ("GameSession", "PartySession", ...). It tracks:
//! - WHICH session it is (name, opaque session id, host address)
//! - WHERE it is in its lifecycle ([`SessionState`])
//! - HOW MANY slots are left (open public/private counters)
//! - WHO is in it (owner, registered players)

use std::fmt;
use std::net::SocketAddrV4;

use lanlobby_protocol::{SessionAdvert, SessionSettings, UniqueNetId};

// ---------------------------------------------------------------------------
// RegistryConfig
// ---------------------------------------------------------------------------

/// Configuration for the session registry.
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    /// Running as a dedicated server: this process hosts every session it
    /// creates, regardless of identity.
    pub is_dedicated: bool,

    /// Stamped into every created session so incompatible builds can tell
    /// each other apart.
    pub build_unique_id: i32,
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Where a session is in its lifecycle.
///
/// ```text
///   Creating ──► Pending ──start──► InProgress ──end──► Ended
///                                       ▲                 │
///                                       └──────start──────┘
/// ```
///
/// `Starting` and `Destroying` exist for parity with asynchronous backends.
/// This registry resolves everything synchronously, so it never leaves a
/// session in either, but start/end treat them as conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Creating,
    Pending,
    Starting,
    InProgress,
    Ended,
    Destroying,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Creating => "Creating",
            Self::Pending => "Pending",
            Self::Starting => "Starting",
            Self::InProgress => "InProgress",
            Self::Ended => "Ended",
            Self::Destroying => "Destroying",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// NamedSession
// ---------------------------------------------------------------------------

/// One session in the registry.
///
/// Identity and settings fields are public. State, slot counters, and the
/// player list are only changed through [`SessionRegistry`](crate::SessionRegistry)
/// so their invariants hold:
/// `0 <= open <= configured` for both public and private slots.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedSession {
    /// Logical name; the registry key.
    pub name: String,

    /// Opaque id, unique per created session, copied on join.
    pub session_id: String,

    /// Where clients connect. Resolved lazily when the session is first
    /// advertised or joined.
    pub host_addr: Option<SocketAddrV4>,

    pub settings: SessionSettings,

    pub owning_user_id: UniqueNetId,
    pub owning_user_name: String,

    /// Local player index that created or joined this session.
    pub hosting_player_num: usize,

    pub(crate) state: SessionState,
    pub(crate) num_open_public_connections: u32,
    pub(crate) num_open_private_connections: u32,
    pub(crate) registered_players: Vec<UniqueNetId>,
}

impl NamedSession {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn num_open_public_connections(&self) -> u32 {
        self.num_open_public_connections
    }

    pub fn num_open_private_connections(&self) -> u32 {
        self.num_open_private_connections
    }

    pub fn registered_players(&self) -> &[UniqueNetId] {
        &self.registered_players
    }

    pub fn has_player(&self, id: &UniqueNetId) -> bool {
        self.registered_players.contains(id)
    }

    /// Whether a player could join right now: advertised (LAN matches count
    /// as advertised), not locked by an in-progress match, and with a free
    /// public slot.
    pub fn is_joinable(&self) -> bool {
        let advertised = self.settings.should_advertise || self.settings.is_lan_match;
        advertised && self.accepts_join_in_current_state() && self.num_open_public_connections > 0
    }

    /// Whether a discovery query should get an answer for this session.
    /// Looks at configured public capacity, not open slots.
    pub fn answers_queries(&self) -> bool {
        self.accepts_join_in_current_state() && self.settings.num_public_connections > 0
    }

    fn accepts_join_in_current_state(&self) -> bool {
        self.state != SessionState::InProgress || self.settings.allow_join_in_progress
    }

    /// The payload a host sends to searchers.
    pub fn to_advert(&self) -> SessionAdvert {
        SessionAdvert {
            owning_user_id: self.owning_user_id.clone(),
            owning_user_name: self.owning_user_name.clone(),
            num_open_private_connections: self.num_open_private_connections,
            num_open_public_connections: self.num_open_public_connections,
            host_addr: self.host_addr,
            session_id: self.session_id.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl fmt::Display for NamedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' id={} state={} owner={} ({}) open={}/{} public {}/{} private players={}",
            self.name,
            self.session_id,
            self.state,
            self.owning_user_id,
            self.owning_user_name,
            self.num_open_public_connections,
            self.settings.num_public_connections,
            self.num_open_private_connections,
            self.settings.num_private_connections,
            self.registered_players.len(),
        )?;
        if let Some(addr) = self.host_addr {
            write!(f, " host={addr}")?;
        }
        Ok(())
    }
}
