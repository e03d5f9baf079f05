//! Error types for the signaling relay.

use crate::SessionId;
use thiserror::Error;

/// Errors surfaced by registry operations.
///
/// All registry errors are synchronous result values; transports translate
/// them (status codes on the polling API, silent drops on the socket API).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    /// The session identifier is not registered.
    #[error("unknown session: {session_id}")]
    SessionNotFound {
        /// The identifier that failed the lookup.
        session_id: SessionId,
    },

    /// A required request field was absent.
    #[error("missing required field: {field}")]
    MissingField {
        /// Name of the missing field as it appears on the wire.
        field: &'static str,
    },
}

/// Result type alias for registry operations.
pub type SignalResult<T> = std::result::Result<T, SignalError>;
