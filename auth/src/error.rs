//! Handshake authentication errors.

use http::StatusCode;
use thiserror::Error;

/// Rejection of a device handshake. No connection resources exist yet when
/// one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Missing credential header")]
    MissingCredential,

    #[error("Credential is not a bearer token")]
    MalformedCredential,

    #[error("Credential prefix rejected")]
    PrefixMismatch,
}

impl AuthError {
    /// HTTP status returned before the WebSocket upgrade.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingCredential | AuthError::MalformedCredential => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::PrefixMismatch => StatusCode::FORBIDDEN,
        }
    }
}
