//! Error types for the beacon.

use lanlobby_protocol::ProtocolError;
use lanlobby_transport::TransportError;

use crate::BeaconState;

/// Errors surfaced at the beacon's operation boundary.
///
/// Per-packet problems (foreign games, stale nonces, short reads) never get
/// here; they are dropped inside [`LanBeacon::tick`](crate::LanBeacon::tick).
#[derive(Debug, thiserror::Error)]
pub enum BeaconError {
    /// Opening or using the socket failed. The beacon is now inactive.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A packet could not be built (usually: too large).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The operation needs a different beacon state.
    #[error("beacon is {actual:?}, expected {expected:?}")]
    WrongState {
        expected: BeaconState,
        actual: BeaconState,
    },
}
