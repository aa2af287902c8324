//! Error types for the protocol layer.

/// Why an incoming beacon packet was dropped.
///
/// Validation short-circuits: the first failing check is the one reported.
/// None of these are fatal to the beacon; the caller logs and moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PacketRejection {
    /// Shorter than the header (or, for responses, header plus payload).
    #[error("packet too short: {len} bytes, need at least {min}")]
    BadLength { len: usize, min: usize },

    /// Sender speaks a different protocol revision.
    #[error("protocol version mismatch: got {got}, expected {expected}")]
    VersionMismatch { got: u8, expected: u8 },

    /// Platform byte does not intersect our platform mask.
    #[error("platform {platform:#04x} not accepted by mask {mask:#04x}")]
    PlatformMismatch { platform: u8, mask: u8 },

    /// Packet belongs to another game sharing the port.
    #[error("game id mismatch: got {got}, expected {expected}")]
    GameIdMismatch { got: i32, expected: i32 },

    /// Marker bytes were not the ones this handler accepts.
    #[error("unexpected message marker {0:?}")]
    WrongMessageType([u8; 2]),

    /// A response to somebody else's query.
    #[error("nonce mismatch: got {got:#018x}, expected {expected:#018x}")]
    NonceMismatch { got: u64, expected: u64 },
}

/// Errors that can occur while encoding or decoding beacon payloads.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A write would have exceeded the packet size limit. The writer keeps
    /// everything written before the overflow, but the packet must not be sent.
    #[error("packet exceeds {limit} byte limit")]
    Overflow { limit: usize },

    /// A read ran past the end of the buffer, or hit a malformed length.
    #[error("payload truncated or malformed")]
    Truncated,

    /// The header failed validation.
    #[error(transparent)]
    Rejected(#[from] PacketRejection),
}
