//! HTTP transport port

use async_trait::async_trait;
use taskdeck_domain::{ApiRequest, ApiResponse};
use thiserror::Error;
use url::Url;

/// Transport-level failures: no response was received at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request did not complete within the transport timeout.
    #[error("request timed out after {timeout_ms} ms")]
    Timeout {
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// The connection could not be established.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The URL was rejected by the transport.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Any other transport failure.
    #[error("{0}")]
    Other(String),
}

/// Port for sending a single request to the backend.
///
/// Implementations perform exactly one network exchange per call and never
/// retry; retry policy belongs to the request gateway.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends `request` to the already-resolved `url`.
    ///
    /// # Errors
    ///
    /// Returns an error only when no response was received. Non-2xx
    /// responses are returned as `Ok`.
    async fn send(&self, url: &Url, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}
