//! Request gateway
//!
//! Every call to the backend goes through [`RequestGateway::execute`]. The
//! gateway attaches the stored access token, and when the backend rejects
//! that token with a 401 it asks the [`TokenRefresher`] for a new one and
//! re-issues the call exactly once.
//!
//! Login and refresh routes bypass all of this: they never carry the access
//! token and a 401 from them is handed back as-is, so the refresh exchange
//! can never recurse into the gateway. Targets on any other origin than the
//! backend's are sent without credentials and never trigger a refresh.
//!
//! A 401 for a token that has already been replaced in the store (another
//! call refreshed it meanwhile) is retried with the stored token directly.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use taskdeck_domain::request::AUTHORIZATION;
use taskdeck_domain::{ApiRequest, ApiResponse};
use tracing::{Instrument, debug, info_span, warn};
use url::Url;
use uuid::Uuid;

use crate::auth::{ApiEndpoints, SessionState, TokenRefresher, TokenStore};
use crate::error::{GatewayError, GatewayResult};
use crate::ports::HttpTransport;

/// Wraps every outbound call with bearer attachment and refresh-and-retry.
pub struct RequestGateway {
    transport: Arc<dyn HttpTransport>,
    tokens: TokenStore,
    refresher: Arc<dyn TokenRefresher>,
    session: SessionState,
    endpoints: ApiEndpoints,
}

impl RequestGateway {
    /// Creates a gateway.
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        tokens: TokenStore,
        refresher: Arc<dyn TokenRefresher>,
        session: SessionState,
        endpoints: ApiEndpoints,
    ) -> Self {
        Self {
            transport,
            tokens,
            refresher,
            session,
            endpoints,
        }
    }

    /// The backend addressing used by this gateway.
    #[must_use]
    pub const fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }

    /// The session this gateway ends when a refresh fails.
    #[must_use]
    pub const fn session(&self) -> &SessionState {
        &self.session
    }

    /// Sends `request`, refreshing the access token and retrying once if the
    /// backend rejects it.
    ///
    /// Any response other than a 401 to an authenticated attempt is returned
    /// unchanged, including 4xx and 5xx. The retried response is returned as
    /// is, even when it is another 401.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::SessionExpired`] if the refresh failed; the session
    ///   has been logged out by the time this returns.
    /// - [`GatewayError::Network`] if the transport got no response.
    /// - [`GatewayError::InvalidRequest`] if the target is not a valid URL.
    /// - [`GatewayError::Storage`] if the access token cannot be read.
    pub async fn execute(&self, request: ApiRequest) -> GatewayResult<ApiResponse> {
        let span = info_span!(
            "gateway",
            request_id = %Uuid::now_v7(),
            method = %request.method,
            target = %request.target,
        );
        self.execute_inner(request).instrument(span).await
    }

    async fn execute_inner(&self, mut request: ApiRequest) -> GatewayResult<ApiResponse> {
        let url = self.endpoints.resolve(&request)?;

        if !self.endpoints.is_backend(&url) {
            debug!(
                origin = %url.origin().ascii_serialization(),
                "foreign origin, sending without credentials"
            );
            request.headers.remove(AUTHORIZATION);
            return self.send(&url, &request).await;
        }

        if self.endpoints.is_auth_endpoint(&url) {
            request.headers.remove(AUTHORIZATION);
            return self.send(&url, &request).await;
        }

        let Some(sent) = self.tokens.access_token().await? else {
            debug!("no access token stored, sending unauthenticated");
            return self.send(&url, &request).await;
        };
        request.headers.set(AUTHORIZATION, sent.bearer_header());

        let response = self.send(&url, &request).await?;
        if !response.status.is_unauthorized() {
            return Ok(response);
        }

        let token = match self.tokens.access_token().await? {
            Some(current) if current != sent => {
                debug!(token = %current.preview(), "access token already rotated, retrying");
                current
            }
            _ => {
                debug!("access token rejected, refreshing");
                match self.refresher.refresh().await {
                    Ok(token) => token,
                    Err(e) => {
                        warn!(error = %e, "refresh failed, ending session");
                        self.session.logout().await;
                        return Err(GatewayError::SessionExpired(e));
                    }
                }
            }
        };

        request.headers.set(AUTHORIZATION, token.bearer_header());
        let retried = self.send(&url, &request).await?;
        if retried.status.is_unauthorized() {
            warn!("retried request rejected again");
        } else {
            debug!(status = %retried.status, "retried request");
        }
        Ok(retried)
    }

    async fn send(&self, url: &Url, request: &ApiRequest) -> GatewayResult<ApiResponse> {
        let response = self.transport.send(url, request).await?;
        debug!(status = %response.status, elapsed_ms = response.duration.as_millis(), "response");
        Ok(response)
    }

    /// Sends `request` and decodes a 2xx JSON body into `T`.
    ///
    /// An empty body decodes as JSON `null`, so `()` and `Option<_>` work
    /// for bodiless responses.
    ///
    /// # Errors
    ///
    /// Everything [`execute`](Self::execute) returns, plus
    /// [`GatewayError::RequestFailed`] for a non-2xx status and
    /// [`GatewayError::InvalidResponse`] for a body that does not decode.
    pub async fn json<T: DeserializeOwned>(&self, request: ApiRequest) -> GatewayResult<T> {
        let response = self.execute(request).await?;
        if !response.status.is_success() {
            return Err(GatewayError::from_response(&response));
        }

        let body: &[u8] = if response.body.is_empty() {
            b"null"
        } else {
            &response.body
        };
        serde_json::from_slice(body).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }
}

impl std::fmt::Debug for RequestGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGateway")
            .field("base_url", &self.endpoints.base_url().as_str())
            .finish_non_exhaustive()
    }
}
