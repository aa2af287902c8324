//! Error types for the session registry.

use crate::SessionState;

/// Errors that can occur during session bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// A session with this name is already in the table.
    /// Create and join never replace an existing entry.
    #[error("session '{0}' already exists")]
    AlreadyExists(String),

    /// No session with this name.
    #[error("session '{0}' not found")]
    NotFound(String),

    /// The operation isn't allowed from the session's current state,
    /// e.g. starting a session that is already in progress.
    #[error("can't {operation} session '{name}' in state {state}")]
    InvalidState {
        name: String,
        state: SessionState,
        operation: &'static str,
    },
}
