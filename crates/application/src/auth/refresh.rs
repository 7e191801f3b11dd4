//! Single-flight access-token refresh.
//!
//! [`RefreshCoordinator`] owns one slot for the refresh currently in flight.
//! The first caller that finds the slot empty starts the exchange on a
//! detached task and parks a shared handle to its outcome in the slot; every
//! caller, first or late, awaits that same handle. The task empties the slot
//! when the exchange settles, so the next rejection starts a fresh exchange.
//!
//! ```text
//! Idle --refresh()--> Refreshing --settled--> Idle
//!                       ^    |
//!                       +----+ refresh() joins the pending outcome
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use taskdeck_domain::{AccessToken, CredentialKind, RefreshToken};
use thiserror::Error;
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::endpoints::{ApiEndpoints, TokenPolicy};
use super::session::SessionState;
use super::token_store::TokenStore;
use crate::ports::{HttpTransport, StorageError};

/// Why a refresh failed. Every waiter of one exchange receives the same value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// No refresh token is stored; no request was sent.
    #[error("no refresh token is stored")]
    MissingRefreshToken,

    /// The refresh request got no response.
    #[error("refresh request failed: {0}")]
    Network(String),

    /// The backend answered with a non-2xx status.
    #[error("refresh rejected with status {status}: {message}")]
    Rejected {
        /// HTTP status.
        status: u16,
        /// Server message, or the reason phrase.
        message: String,
    },

    /// The backend answered 2xx with a body that has no usable token.
    #[error("malformed refresh response: {0}")]
    InvalidResponse(String),

    /// Reading or writing credentials failed.
    #[error("credential storage failed: {0}")]
    Storage(String),

    /// The exchange task ended without producing an outcome.
    #[error("refresh task ended unexpectedly")]
    Aborted,
}

impl From<StorageError> for RefreshError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e.to_string())
    }
}

/// Something that can mint a new access token.
///
/// The request gateway depends on this trait rather than on the coordinator
/// so tests can substitute a scripted refresher.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Returns a fresh access token, or the reason none could be obtained.
    async fn refresh(&self) -> Result<AccessToken, RefreshError>;
}

type RefreshOutcome = Result<AccessToken, RefreshError>;
type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

struct InFlight {
    generation: u64,
    outcome: SharedRefresh,
}

#[derive(Default)]
struct Slot {
    generation: u64,
    current: Option<InFlight>,
}

#[derive(Serialize)]
struct RefreshRequestBody<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponseBody {
    token: String,
    #[serde(default, alias = "refreshToken")]
    refresh_token: Option<String>,
}

/// The refresh exchange and everything it touches.
struct Exchange {
    transport: Arc<dyn HttpTransport>,
    tokens: TokenStore,
    session: SessionState,
    endpoints: ApiEndpoints,
    policy: TokenPolicy,
}

impl Exchange {
    /// Runs one exchange; on failure the session is torn down before the
    /// outcome is published.
    async fn run(&self) -> RefreshOutcome {
        let outcome = self.exchange().await;
        match &outcome {
            Ok(token) => info!(token = %token.preview(), "access token refreshed"),
            Err(e) => {
                warn!(error = %e, "refresh failed, ending session");
                self.session.logout().await;
            }
        }
        outcome
    }

    async fn exchange(&self) -> RefreshOutcome {
        let refresh_token = self
            .tokens
            .refresh_token()
            .await?
            .ok_or(RefreshError::MissingRefreshToken)?;

        let request = self
            .endpoints
            .refresh_request()
            .with_json(&RefreshRequestBody {
                refresh_token: refresh_token.as_str(),
            })
            .map_err(|e| RefreshError::InvalidResponse(e.to_string()))?;
        let url = self
            .endpoints
            .resolve(&request)
            .map_err(|e| RefreshError::Network(e.to_string()))?;

        debug!(%url, "sending refresh request");
        let response = self
            .transport
            .send(&url, &request)
            .await
            .map_err(|e| RefreshError::Network(e.to_string()))?;

        if !response.status.is_success() {
            return Err(RefreshError::Rejected {
                status: response.status.as_u16(),
                message: response
                    .server_message()
                    .unwrap_or_else(|| response.status.reason_phrase().to_string()),
            });
        }

        let body: RefreshResponseBody = response
            .decode()
            .map_err(|e| RefreshError::InvalidResponse(e.to_string()))?;
        if body.token.is_empty() {
            return Err(RefreshError::InvalidResponse("empty token".to_string()));
        }

        self.tokens
            .set(CredentialKind::Access, &body.token, self.policy.access_ttl_days)
            .await?;
        if let Some(rotated) = body.refresh_token.filter(|t| !t.is_empty()) {
            debug!(token = %RefreshToken::new(rotated.as_str()).preview(), "refresh token rotated");
            self.tokens
                .set(CredentialKind::Refresh, &rotated, self.policy.refresh_ttl_days)
                .await?;
        }

        Ok(AccessToken::new(body.token))
    }
}

/// Performs the refresh-token exchange, at most one at a time.
pub struct RefreshCoordinator {
    exchange: Arc<Exchange>,
    slot: Arc<Mutex<Slot>>,
}

impl RefreshCoordinator {
    /// Creates a coordinator.
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        tokens: TokenStore,
        session: SessionState,
        endpoints: ApiEndpoints,
    ) -> Self {
        let policy = session.policy();
        Self {
            exchange: Arc::new(Exchange {
                transport,
                tokens,
                session,
                endpoints,
                policy,
            }),
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    /// True while an exchange is pending.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.slot.lock().current.is_some()
    }

    /// Returns the pending outcome, starting an exchange if none is pending.
    fn join_or_start(&self) -> SharedRefresh {
        let mut slot = self.slot.lock();
        if let Some(in_flight) = &slot.current {
            debug!(generation = in_flight.generation, "joining in-flight refresh");
            return in_flight.outcome.clone();
        }

        slot.generation += 1;
        let generation = slot.generation;
        let exchange = Arc::clone(&self.exchange);
        let settled_slot = Arc::clone(&self.slot);

        // The task cannot clear the slot before the handle is parked in it:
        // it needs the lock held here.
        let task = tokio::spawn(
            async move {
                let outcome = exchange.run().await;
                let mut slot = settled_slot.lock();
                if slot
                    .current
                    .as_ref()
                    .is_some_and(|f| f.generation == generation)
                {
                    slot.current = None;
                }
                outcome
            }
            .instrument(info_span!("refresh", generation)),
        );

        let outcome = async move {
            task.await.unwrap_or_else(|e| {
                error!(error = %e, "refresh task failed");
                Err(RefreshError::Aborted)
            })
        }
        .boxed()
        .shared();

        debug!(generation, "starting refresh");
        slot.current = Some(InFlight {
            generation,
            outcome: outcome.clone(),
        });
        outcome
    }
}

#[async_trait]
impl TokenRefresher for RefreshCoordinator {
    async fn refresh(&self) -> Result<AccessToken, RefreshError> {
        let outcome = self.join_or_start();
        outcome.await
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refreshing", &self.is_refreshing())
            .finish_non_exhaustive()
    }
}
