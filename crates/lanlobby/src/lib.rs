//! # lanlobby
//!
//! LAN session discovery and named-session lifecycle for multiplayer games.
//!
//! Hosts advertise joinable sessions over UDP broadcast; clients search,
//! collect responses until a quiet timeout, and join. A session registry
//! tracks connection slots, registered players, and each session's
//! lifecycle (`Pending → InProgress → Ended`).
//!
//! ## Stack
//!
//! ```text
//! lanlobby (this crate)    LanSessionInterface, SessionSearch, EventBus
//!     ├── lanlobby-session     SessionRegistry, capabilities
//!     ├── lanlobby-beacon      LanBeacon hosting/searching state machine
//!     │     ├── lanlobby-protocol  header + session advert wire format
//!     │     └── lanlobby-transport UDP sockets, in-memory test subnet
//!     └── lanlobby-tick        fixed-rate poll loop
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use lanlobby::prelude::*;
//!
//! # async fn run() -> Result<(), LobbyError> {
//! let lobby = Arc::new(LanSessionInterface::new(
//!     UdpFactory::new(),
//!     LobbyConfig::default(),
//!     Capabilities::none(),
//! ));
//! let poller = spawn_poll_loop(Arc::clone(&lobby), PollConfig::default());
//!
//! let (_id, mut events) = lobby.events().subscribe_channel();
//! lobby.find_sessions(SearchSettings::lan())?;
//! while let Some(event) = events.recv().await {
//!     if let LobbyEvent::FindSessionsComplete { .. } = event {
//!         break;
//!     }
//! }
//! for result in lobby.search_results() {
//!     println!("{} ({} ms)", result.session.owning_user_name, result.ping_ms);
//! }
//! poller.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod event;
mod interface;
mod search;

pub use config::LobbyConfig;
pub use error::LobbyError;
pub use event::{EventBus, JoinResult, LobbyEvent, SubscriptionId};
pub use interface::LanSessionInterface;
pub use search::{ResultComparator, SearchResult, SearchSettings, SearchState, SessionSearch};

pub use lanlobby_beacon::{BeaconConfig, BeaconState};
pub use lanlobby_protocol::{
    Advertisement, SessionAdvert, SessionSetting, SessionSettings, SettingValue, UniqueNetId,
};
pub use lanlobby_session::{
    Capabilities, Capability, IdentityProvider, NamedSession, PlayerChanges, SessionError,
    SessionState, StaticIdentity, VoiceRegistry,
};
pub use lanlobby_tick::{PollConfig, PollHandle, spawn_poll_loop};

/// Everything a typical application needs.
pub mod prelude {
    pub use crate::{
        Capabilities, JoinResult, LanSessionInterface, LobbyConfig, LobbyError, LobbyEvent,
        PollConfig, SearchResult, SearchSettings, SessionSettings, StaticIdentity, UniqueNetId,
        spawn_poll_loop,
    };
    pub use lanlobby_transport::{MemoryFactory, MemoryNetwork, UdpFactory};
}
