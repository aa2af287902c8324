//! Beacon packet framing.
//!
//! Every beacon packet starts with the same 16-byte header:
//!
//! ```text
//! offset 0:  version   u8     = PACKET_VERSION
//! offset 1:  platform  u8     (bitmask)
//! offset 2:  game id   i32
//! offset 6:  marker    u8,u8  = 'S','Q' (query) or 'S','R' (response)
//! offset 8:  nonce     u64
//! offset 16: payload...       (responses only)
//! ```
//!
//! Queries are exactly the header. Responses are the header followed by a
//! [`SessionAdvert`](crate::SessionAdvert).
//!
//! Validation is deliberately strict and deliberately quiet: every check
//! short-circuits to a [`PacketRejection`], and callers drop the packet.

use serde::{Deserialize, Serialize};

use crate::codec::{NboReader, NboWriter, WireDecode, WireEncode};
use crate::PacketRejection;

/// Protocol revision. Peers on a different revision ignore each other.
pub const PACKET_VERSION: u8 = 10;

/// Size of the fixed header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Platform marker bits.
pub mod platform {
    pub const LITTLE_ENDIAN: u8 = 0x01;
    pub const BIG_ENDIAN: u8 = 0x02;
    /// Accept packets from any platform.
    pub const ANY: u8 = 0xFF;

    /// Marker for the platform this binary was built for.
    pub const fn native() -> u8 {
        if cfg!(target_endian = "little") {
            LITTLE_ENDIAN
        } else {
            BIG_ENDIAN
        }
    }
}

/// The two message kinds a beacon understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Client → hosts: "who's out there?"
    Query,
    /// Host → client: "me, and here's my session".
    Response,
}

impl MessageType {
    pub const fn marker(self) -> [u8; 2] {
        match self {
            Self::Query => [b'S', b'Q'],
            Self::Response => [b'S', b'R'],
        }
    }
}

/// Values that identify "our" packets on a shared subnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameIdentity {
    /// Distinguishes titles sharing the announce port.
    pub game_unique_id: i32,
    /// Written into outgoing packets.
    pub platform_marker: u8,
    /// ANDed with incoming platform bytes; zero means "not for us".
    pub platform_mask: u8,
}

impl Default for GameIdentity {
    fn default() -> Self {
        Self {
            game_unique_id: 9999,
            platform_marker: platform::native(),
            platform_mask: platform::ANY,
        }
    }
}

/// A decoded beacon header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeaconHeader {
    pub version: u8,
    pub platform: u8,
    pub game_unique_id: i32,
    pub marker: [u8; 2],
    pub nonce: u64,
}

impl BeaconHeader {
    pub fn new(identity: &GameIdentity, message: MessageType, nonce: u64) -> Self {
        Self {
            version: PACKET_VERSION,
            platform: identity.platform_marker,
            game_unique_id: identity.game_unique_id,
            marker: message.marker(),
            nonce,
        }
    }
}

impl WireEncode for BeaconHeader {
    fn encode(&self, w: &mut NboWriter) {
        w.write_u8(self.version)
            .write_u8(self.platform)
            .write_i32(self.game_unique_id)
            .write_raw(&self.marker)
            .write_u64(self.nonce);
    }
}

impl WireDecode for BeaconHeader {
    fn decode(r: &mut NboReader<'_>) -> Self {
        Self {
            version: r.read_u8(),
            platform: r.read_u8(),
            game_unique_id: r.read_i32(),
            marker: [r.read_u8(), r.read_u8()],
            nonce: r.read_u64(),
        }
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Builds a complete query packet (header only).
pub fn build_query(identity: &GameIdentity, nonce: u64) -> Vec<u8> {
    let mut w = NboWriter::with_limit(HEADER_SIZE);
    w.write(&BeaconHeader::new(identity, MessageType::Query, nonce));
    w.as_bytes().to_vec()
}

/// Starts a response packet. The caller appends the advert and calls
/// [`NboWriter::finish`], which fails if the advert didn't fit in `limit`.
pub fn begin_response(identity: &GameIdentity, nonce: u64, limit: usize) -> NboWriter {
    let mut w = NboWriter::with_limit(limit);
    w.write(&BeaconHeader::new(identity, MessageType::Response, nonce));
    w
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn check_header(
    header: &BeaconHeader,
    identity: &GameIdentity,
    expected: MessageType,
) -> Result<(), PacketRejection> {
    if header.version != PACKET_VERSION {
        return Err(PacketRejection::VersionMismatch {
            got: header.version,
            expected: PACKET_VERSION,
        });
    }
    if header.platform & identity.platform_mask == 0 {
        return Err(PacketRejection::PlatformMismatch {
            platform: header.platform,
            mask: identity.platform_mask,
        });
    }
    if header.game_unique_id != identity.game_unique_id {
        return Err(PacketRejection::GameIdMismatch {
            got: header.game_unique_id,
            expected: identity.game_unique_id,
        });
    }
    if header.marker != expected.marker() {
        return Err(PacketRejection::WrongMessageType(header.marker));
    }
    Ok(())
}

/// Validates a query packet and returns the client's nonce.
///
/// # Errors
/// Returns the first failed check. A query must be exactly
/// [`HEADER_SIZE`] bytes.
pub fn validate_query(packet: &[u8], identity: &GameIdentity) -> Result<u64, PacketRejection> {
    if packet.len() != HEADER_SIZE {
        return Err(PacketRejection::BadLength {
            len: packet.len(),
            min: HEADER_SIZE,
        });
    }
    let header = NboReader::new(packet).read::<BeaconHeader>();
    check_header(&header, identity, MessageType::Query)?;
    Ok(header.nonce)
}

/// Validates a response packet against our outstanding nonce and returns
/// the payload that follows the header.
///
/// # Errors
/// Returns the first failed check. A response must be longer than
/// [`HEADER_SIZE`].
pub fn validate_response<'a>(
    packet: &'a [u8],
    identity: &GameIdentity,
    expected_nonce: u64,
) -> Result<&'a [u8], PacketRejection> {
    if packet.len() <= HEADER_SIZE {
        return Err(PacketRejection::BadLength {
            len: packet.len(),
            min: HEADER_SIZE + 1,
        });
    }
    let mut r = NboReader::new(packet);
    let header = r.read::<BeaconHeader>();
    check_header(&header, identity, MessageType::Response)?;
    if header.nonce != expected_nonce {
        return Err(PacketRejection::NonceMismatch {
            got: header.nonce,
            expected: expected_nonce,
        });
    }
    Ok(r.remaining())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
