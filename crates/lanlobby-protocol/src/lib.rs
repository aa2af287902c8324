//! Wire protocol for LAN session discovery.
//!
//! This crate defines the bytes that travel between a searching client and
//! the hosts that answer it:
//!
//! - **Codec** ([`NboWriter`], [`NboReader`], [`WireEncode`], [`WireDecode`]):
//!   fixed-order, network-byte-order field encoding with a sticky overflow flag.
//! - **Packets** ([`build_query`], [`begin_response`], [`validate_query`],
//!   [`validate_response`]): the 16-byte beacon header and its checks.
//! - **Types** ([`SessionSettings`], [`SessionAdvert`], [`UniqueNetId`], ...):
//!   what a host says about its session.
//! - **Errors** ([`ProtocolError`], [`PacketRejection`]).
//!
//! # Architecture
//!
//! The protocol layer knows nothing about sockets or session lifecycles.
//!
//! ```text
//! Transport (datagrams) → Protocol (header + advert) → Beacon / Registry
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod error;
mod packet;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::{MAX_PACKET_SIZE, NboReader, NboWriter, WireDecode, WireEncode};
pub use error::{PacketRejection, ProtocolError};
pub use packet::{
    BeaconHeader, GameIdentity, HEADER_SIZE, MessageType, PACKET_VERSION, begin_response,
    build_query, platform, validate_query, validate_response,
};
pub use types::{
    Advertisement, SessionAdvert, SessionSetting, SessionSettings, SettingValue, UniqueNetId,
};
