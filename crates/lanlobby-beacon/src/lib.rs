//! LAN discovery beacon.
//!
//! A [`LanBeacon`] owns at most one socket and is either hosting (answering
//! queries), searching (waiting for responses to its own query), or idle.
//! It is driven by [`LanBeacon::tick`], which never blocks: it drains every
//! pending datagram, validates it, and hands back [`BeaconEvent`]s for the
//! caller to act on.
//!
//! # How it fits in the stack
//!
//! ```text
//! Lobby (above)      ← decides when to host/search, builds session adverts
//!     ↕
//! Beacon (this crate) ← socket lifecycle, header validation, search timeout
//!     ↕
//! Transport / Protocol (below)
//! ```

mod beacon;
mod config;
mod error;

pub use beacon::{BeaconEvent, BeaconState, BindOutcome, HostMode, LanBeacon, SearchMode};
pub use config::BeaconConfig;
pub use error::BeaconError;
