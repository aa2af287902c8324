use std::io;

/// Errors that can occur in the transport layer.
///
/// None of these are fatal to the process. The beacon logs them and drops
/// back to "not advertising / not searching".
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No port could be bound: the requested one and every fallback failed.
    #[error("bind failed on port {port}: {source}")]
    BindFailed {
        port: u16,
        #[source]
        source: io::Error,
    },

    /// Sending a datagram failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] io::Error),

    /// The socket accepted fewer bytes than the packet holds.
    #[error("partial send: {sent} of {expected} bytes")]
    PartialSend { sent: usize, expected: usize },

    /// Receiving failed for a reason other than "nothing pending".
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] io::Error),

    /// `reply` was called before any datagram arrived.
    #[error("no sender to reply to")]
    NoPeer,
}
