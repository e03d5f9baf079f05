//! Error types for the relay's HTTP surface.
//!
//! Registry errors never cross the transport boundary unhandled: every
//! variant maps to one status code, and the push transport has no error
//! channel at all (failures there are logged and dropped).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use signal_types::SignalError;

/// Errors surfaced by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The registry rejected the request.
    #[error(transparent)]
    Signal(#[from] SignalError),

    /// The `session-id` header was absent. Indistinguishable from an
    /// unknown session as far as the caller can tell.
    #[error("missing session-id header")]
    MissingSessionId,
}

impl ApiError {
    /// The status code this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Signal(SignalError::SessionNotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Signal(SignalError::MissingField { .. }) => StatusCode::BAD_REQUEST,
            ApiError::MissingSessionId => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.status().into_response()
    }
}
