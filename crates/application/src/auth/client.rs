//! Password sign-in and sign-out on top of the gateway.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use taskdeck_domain::{AccessToken, RefreshToken, UserIdentity};
use tracing::info;

use crate::error::GatewayResult;
use crate::gateway::RequestGateway;

#[derive(Serialize)]
struct LoginRequestBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponseBody {
    token: String,
    #[serde(default, alias = "refreshToken")]
    refresh_token: Option<String>,
    user: UserIdentity,
}

/// Signs users in and out.
#[derive(Clone, Debug)]
pub struct AuthClient {
    gateway: Arc<RequestGateway>,
}

impl AuthClient {
    /// Creates a client over `gateway`.
    #[must_use]
    pub const fn new(gateway: Arc<RequestGateway>) -> Self {
        Self { gateway }
    }

    /// Exchanges email and password for credentials and starts a session.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RequestFailed`](crate::GatewayError::RequestFailed)
    /// with the server message when the backend rejects the credentials, and
    /// the usual gateway errors otherwise.
    pub async fn sign_in(&self, email: &str, password: &str) -> GatewayResult<UserIdentity> {
        let request = self
            .gateway
            .endpoints()
            .login_request()
            .with_json(&LoginRequestBody { email, password })?;

        let body: LoginResponseBody = self.gateway.json(request).await?;
        info!(user = %body.user.email, "login accepted");

        self.gateway
            .session()
            .login(
                AccessToken::new(body.token),
                body.user.clone(),
                body.refresh_token.filter(|t| !t.is_empty()).map(RefreshToken::new),
            )
            .await?;
        Ok(body.user)
    }

    /// Ends the session.
    pub async fn sign_out(&self) {
        self.gateway.session().logout().await;
    }
}
