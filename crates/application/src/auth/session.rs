//! Process-wide session state.
//!
//! [`SessionState`] owns the authenticated flag and the signed-in identity
//! and publishes every change on a `watch` channel, so a front end can
//! react to a forced logout the moment the failing call settles.

use std::sync::Arc;

use taskdeck_domain::{AccessToken, CredentialKind, RefreshToken, SessionSnapshot, UserIdentity};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::endpoints::TokenPolicy;
use super::token_store::TokenStore;
use crate::ports::StorageError;

/// Cloneable handle to the session. All clones share one state.
#[derive(Clone)]
pub struct SessionState {
    tokens: TokenStore,
    policy: TokenPolicy,
    state: Arc<watch::Sender<SessionSnapshot>>,
}

impl SessionState {
    /// Creates a logged-out session over `tokens`.
    #[must_use]
    pub fn new(tokens: TokenStore, policy: TokenPolicy) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::logged_out());
        Self {
            tokens,
            policy,
            state: Arc::new(state),
        }
    }

    /// Records a successful sign-in.
    ///
    /// The refresh token is optional for backends that do not issue one; a
    /// previously stored refresh token is dropped in that case so it cannot
    /// outlive the session it belonged to.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials cannot be persisted. The session
    /// stays logged-out in that case.
    pub async fn login(
        &self,
        access_token: AccessToken,
        identity: UserIdentity,
        refresh_token: Option<RefreshToken>,
    ) -> Result<(), StorageError> {
        self.tokens
            .set(
                CredentialKind::Access,
                access_token.as_str(),
                self.policy.access_ttl_days,
            )
            .await?;
        match &refresh_token {
            Some(token) => {
                self.tokens
                    .set(
                        CredentialKind::Refresh,
                        token.as_str(),
                        self.policy.refresh_ttl_days,
                    )
                    .await?;
            }
            None => self.tokens.clear(CredentialKind::Refresh).await?,
        }
        self.tokens.set_identity(&identity).await?;

        info!(user = %identity.email, refreshable = refresh_token.is_some(), "signed in");
        self.state
            .send_replace(SessionSnapshot::authenticated(identity));
        Ok(())
    }

    /// Ends the session. Safe to call any number of times.
    ///
    /// The published state always becomes logged-out; storage failures while
    /// clearing are logged.
    pub async fn logout(&self) {
        if let Err(e) = self.tokens.clear_tokens().await {
            warn!(error = %e, "failed to clear stored credentials");
        }
        if let Err(e) = self.tokens.clear_identity().await {
            warn!(error = %e, "failed to clear cached identity");
        }

        let previous = self.state.send_replace(SessionSnapshot::logged_out());
        if previous.is_authenticated {
            info!("signed out");
        } else {
            debug!("logout on an already logged-out session");
        }
    }

    /// Restores the session at startup without touching the network.
    ///
    /// The restore is optimistic: the first protected call still goes
    /// through the gateway and may refresh or force a logout.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read.
    pub async fn check_auth_status(&self) -> Result<SessionSnapshot, StorageError> {
        let access = self.tokens.access_token().await?;
        let refresh = self.tokens.refresh_token().await?;
        let identity = self.tokens.identity().await?;

        let snapshot = match (access, refresh, identity) {
            (Some(_), Some(_), Some(identity)) => SessionSnapshot::authenticated(identity),
            _ => SessionSnapshot::logged_out(),
        };

        debug!(authenticated = snapshot.is_authenticated, "restored session");
        self.state.send_replace(snapshot.clone());
        Ok(snapshot)
    }

    /// True while the session is authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn identity(&self) -> Option<UserIdentity> {
        self.state.borrow().user.clone()
    }

    /// The current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// The credential lifetimes used by this session.
    #[must_use]
    pub const fn policy(&self) -> TokenPolicy {
        self.policy
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}
