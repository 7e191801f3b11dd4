//! Errors surfaced to callers of the request pipeline.

use taskdeck_domain::{ApiResponse, DomainError, ErrorPayload, StatusCode};
use thiserror::Error;

use crate::auth::RefreshError;
use crate::ports::{StorageError, TransportError};

/// Failure of a call made through the request gateway.
///
/// An expired access token never shows up here when the refresh succeeds:
/// it is absorbed by the refresh-and-retry path.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The refresh exchange failed; the session has been ended.
    #[error("session expired: {0}")]
    SessionExpired(#[source] RefreshError),

    /// The backend answered with a non-2xx status.
    #[error("request failed with status {status}: {message}")]
    RequestFailed {
        /// HTTP status.
        status: StatusCode,
        /// Server message, or the reason phrase.
        message: String,
    },

    /// No response was received.
    #[error("network error: {0}")]
    Network(#[from] TransportError),

    /// The request target does not form a valid URL.
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] DomainError),

    /// A 2xx body could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The credential store failed.
    #[error("credential storage error: {0}")]
    Storage(#[from] StorageError),
}

impl GatewayError {
    /// Builds a `RequestFailed` from a non-2xx response.
    #[must_use]
    pub fn from_response(response: &ApiResponse) -> Self {
        Self::RequestFailed {
            status: response.status,
            message: response
                .server_message()
                .unwrap_or_else(|| response.status.reason_phrase().to_string()),
        }
    }

    /// Machine-readable code of this error.
    #[must_use]
    pub fn code(&self) -> String {
        match self {
            Self::SessionExpired(_) => "SESSION_EXPIRED".to_string(),
            Self::RequestFailed { status, .. } => status.as_u16().to_string(),
            Self::Network(_) => "NETWORK_ERROR".to_string(),
            Self::InvalidRequest(_) => "INVALID_REQUEST".to_string(),
            Self::InvalidResponse(_) => "INVALID_RESPONSE".to_string(),
            Self::Storage(_) => "STORAGE_ERROR".to_string(),
        }
    }

    /// Returns true if this error ended the session.
    #[must_use]
    pub const fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired(_))
    }

    /// The normalized `{code, message}` form of this error.
    #[must_use]
    pub fn payload(&self) -> ErrorPayload {
        let message = match self {
            Self::RequestFailed { message, .. } => message.clone(),
            other => other.to_string(),
        };
        ErrorPayload::new(self.code(), message)
    }
}

impl From<&GatewayError> for ErrorPayload {
    fn from(error: &GatewayError) -> Self {
        error.payload()
    }
}

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
