//! Named-session bookkeeping for LAN lobbies.
//!
//! This crate tracks the sessions this process hosts or has joined:
//!
//! 1. **Registry**: named sessions and their lifecycle ([`SessionRegistry`])
//! 2. **Slot accounting**: open public/private slots as players come and go
//! 3. **Advertising policy**: which sessions must keep a LAN beacon alive
//!    ([`SessionRegistry::needs_advertising`])
//! 4. **Capabilities**: optional identity and voice hooks supplied by the
//!    embedding application ([`Capabilities`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Lobby facade (above)  ← drives the beacon from registry decisions
//!     ↕
//! Session Layer (this crate)  ← who hosts what, how many slots are left
//!     ↕
//! Protocol Layer (below)  ← SessionSettings, SessionAdvert, UniqueNetId
//! ```
//!
//! Nothing here does I/O. The registry is a plain struct; callers that share
//! it across threads wrap it in a mutex.

mod capability;
mod error;
mod registry;
mod session;

pub use capability::{
    Capabilities, Capability, IdentityProvider, MAX_LOCAL_PLAYERS, StaticIdentity, VoiceRegistry,
};
pub use error::SessionError;
pub use registry::{FALLBACK_OWNER_NAME, PlayerChanges, SessionRegistry};
pub use session::{NamedSession, RegistryConfig, SessionState};
