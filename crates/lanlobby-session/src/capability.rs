//! Narrow hooks into the subsystems this crate doesn't own.
//!
//! The registry only ever needs two things from the outside world:
//!
//! - **Identity**: "who is local player N?" ([`IdentityProvider`])
//! - **Voice**: "start/stop routing voice for this talker" ([`VoiceRegistry`])
//!
//! Both are optional. [`Capabilities`] is the table holding whichever ones
//! the embedding application provides; code asks it for a capability and
//! handles absence explicitly instead of getting a null object.

use std::fmt;
use std::sync::Arc;

use lanlobby_protocol::UniqueNetId;

/// Local split-screen players per machine.
pub const MAX_LOCAL_PLAYERS: usize = 4;

/// Looks up local players.
///
/// # Example
///
/// ```rust
/// use lanlobby_session::IdentityProvider;
/// use lanlobby_protocol::UniqueNetId;
///
/// struct MachineIdentity;
///
/// impl IdentityProvider for MachineIdentity {
///     fn unique_player_id(&self, local_player: usize) -> Option<UniqueNetId> {
///         Some(UniqueNetId::new(format!("my-pc-{local_player}")))
///     }
///
///     fn player_nickname(&self, local_player: usize) -> Option<String> {
///         Some(format!("Player {local_player}"))
///     }
/// }
/// ```
pub trait IdentityProvider: Send + Sync + 'static {
    /// Id of the local player at `local_player`, or `None` if nobody is
    /// signed in there.
    fn unique_player_id(&self, local_player: usize) -> Option<UniqueNetId>;

    /// Display name of the local player at `local_player`.
    fn player_nickname(&self, local_player: usize) -> Option<String>;
}

/// Voice chat bookkeeping.
pub trait VoiceRegistry: Send + Sync + 'static {
    fn register_local_talker(&self, local_player: usize);
    fn register_remote_talker(&self, player: &UniqueNetId);
    fn unregister_remote_talker(&self, player: &UniqueNetId);
    /// Re-applies mute lists, e.g. after a local player's state arrives late.
    fn process_mute_change_notification(&self);
}

/// Capability tags, for "is this available?" checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Identity,
    Voice,
}

/// The set of optional collaborators available to the registry.
#[derive(Clone, Default)]
pub struct Capabilities {
    identity: Option<Arc<dyn IdentityProvider>>,
    voice: Option<Arc<dyn VoiceRegistry>>,
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("identity", &self.identity.is_some())
            .field("voice", &self.voice.is_some())
            .finish()
    }
}

impl Capabilities {
    /// No collaborators at all.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_voice(mut self, voice: Arc<dyn VoiceRegistry>) -> Self {
        self.voice = Some(voice);
        self
    }

    pub fn identity(&self) -> Option<&Arc<dyn IdentityProvider>> {
        self.identity.as_ref()
    }

    pub fn voice(&self) -> Option<&Arc<dyn VoiceRegistry>> {
        self.voice.as_ref()
    }

    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::Identity => self.identity.is_some(),
            Capability::Voice => self.voice.is_some(),
        }
    }

    /// True if `id` belongs to one of this machine's local players.
    pub fn is_local_player(&self, id: &UniqueNetId) -> bool {
        self.identity.as_ref().is_some_and(|identity| {
            (0..MAX_LOCAL_PLAYERS)
                .any(|n| identity.unique_player_id(n).as_ref() == Some(id))
        })
    }
}

// ---------------------------------------------------------------------------
// StaticIdentity
// ---------------------------------------------------------------------------

/// An [`IdentityProvider`] backed by a fixed list of local players.
///
/// Handy for tools, demos, and tests where there is no real sign-in flow.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    players: Vec<(UniqueNetId, String)>,
}

impl StaticIdentity {
    /// One local player at index 0.
    pub fn single(id: impl Into<String>, nickname: impl Into<String>) -> Self {
        Self {
            players: vec![(UniqueNetId::new(id), nickname.into())],
        }
    }

    /// Adds the next local player.
    pub fn with_player(mut self, id: impl Into<String>, nickname: impl Into<String>) -> Self {
        self.players.push((UniqueNetId::new(id), nickname.into()));
        self
    }
}

impl IdentityProvider for StaticIdentity {
    fn unique_player_id(&self, local_player: usize) -> Option<UniqueNetId> {
        self.players.get(local_player).map(|(id, _)| id.clone())
    }

    fn player_nickname(&self, local_player: usize) -> Option<String> {
        self.players.get(local_player).map(|(_, name)| name.clone())
    }
}
