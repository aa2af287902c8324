//! Unified error type for the lobby facade.

use lanlobby_beacon::BeaconError;
use lanlobby_protocol::ProtocolError;
use lanlobby_session::SessionError;
use lanlobby_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each layer variant auto-generates `From`
/// impls, so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// A socket-level error (bind, send, receive).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A wire-level error (overflowed or truncated packet).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The beacon refused or failed an operation.
    #[error(transparent)]
    Beacon(#[from] BeaconError),

    /// A registry error (unknown name, duplicate name, state conflict).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A config file couldn't be parsed.
    #[error("invalid lobby config: {0}")]
    Config(#[from] serde_json::Error),

    /// `find_sessions` was called while another search is running.
    #[error("a session search is already in progress")]
    SearchAlreadyPending,

    /// `cancel_find_sessions` was called with nothing to cancel.
    #[error("no session search in progress")]
    NoSearchInProgress,

    /// A routed search needs an explicit host to query.
    #[error("routed search has no target host address")]
    MissingSearchTarget,

    /// A search result carried no address to connect to.
    #[error("search result for session '{0}' has no host address")]
    NoHostAddress(String),
}
