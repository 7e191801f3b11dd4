//! Wiring of the authenticated request pipeline.

use std::sync::Arc;

use crate::auth::{ApiEndpoints, AuthClient, RefreshCoordinator, SessionState, TokenPolicy, TokenStore};
use crate::gateway::RequestGateway;
use crate::ports::{Clock, CredentialRepository, HttpTransport};

/// The assembled pipeline: one token store, one session, one refresh
/// coordinator and the gateway in front of them.
#[derive(Clone, Debug)]
pub struct AuthPipeline {
    /// Credential storage.
    pub tokens: TokenStore,
    /// Session state shared with the front end.
    pub session: SessionState,
    /// Gateway every call goes through.
    pub gateway: Arc<RequestGateway>,
    /// Sign-in and sign-out.
    pub auth: AuthClient,
}

impl AuthPipeline {
    /// Wires the pipeline over the given adapters.
    ///
    /// Credentials are flagged secure when the backend is served over TLS.
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        repository: Arc<dyn CredentialRepository>,
        clock: Arc<dyn Clock>,
        endpoints: ApiEndpoints,
        policy: TokenPolicy,
    ) -> Self {
        let tokens = TokenStore::new(repository, clock).with_secure(endpoints.is_secure());
        let session = SessionState::new(tokens.clone(), policy);
        let coordinator = RefreshCoordinator::new(
            Arc::clone(&transport),
            tokens.clone(),
            session.clone(),
            endpoints.clone(),
        );
        let gateway = Arc::new(RequestGateway::new(
            transport,
            tokens.clone(),
            Arc::new(coordinator),
            session.clone(),
            endpoints,
        ));
        let auth = AuthClient::new(Arc::clone(&gateway));

        Self {
            tokens,
            session,
            gateway,
            auth,
        }
    }
}
