//! Fakes shared by the unit tests of this crate.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::json;
use taskdeck_domain::request::AUTHORIZATION;
use taskdeck_domain::{
    ApiRequest, ApiResponse, Credential, CredentialKind, Headers, UserIdentity,
};
use tokio::sync::watch;
use url::Url;

use crate::auth::{ApiEndpoints, SessionState, TokenPolicy, TokenStore};
use crate::ports::{Clock, CredentialRepository, HttpTransport, StorageError, TransportError};

pub const BASE_URL: &str = "https://api.example.com";

pub fn endpoints() -> ApiEndpoints {
    ApiEndpoints::new(Url::parse(BASE_URL).unwrap())
}

/// In-memory credential storage.
#[derive(Default)]
pub struct MemoryRepository {
    credentials: Mutex<HashMap<CredentialKind, Credential>>,
    identity: Mutex<Option<UserIdentity>>,
}

#[async_trait]
impl CredentialRepository for MemoryRepository {
    async fn load(&self, kind: CredentialKind) -> Result<Option<Credential>, StorageError> {
        Ok(self.credentials.lock().get(&kind).cloned())
    }

    async fn save(&self, credential: &Credential) -> Result<(), StorageError> {
        self.credentials
            .lock()
            .insert(credential.kind, credential.clone());
        Ok(())
    }

    async fn remove(&self, kind: CredentialKind) -> Result<(), StorageError> {
        self.credentials.lock().remove(&kind);
        Ok(())
    }

    async fn load_identity(&self) -> Result<Option<UserIdentity>, StorageError> {
        Ok(self.identity.lock().clone())
    }

    async fn save_identity(&self, identity: &UserIdentity) -> Result<(), StorageError> {
        *self.identity.lock() = Some(identity.clone());
        Ok(())
    }

    async fn remove_identity(&self) -> Result<(), StorageError> {
        *self.identity.lock() = None;
        Ok(())
    }
}

/// A clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc::now()),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// How the fake backend answers `POST /auth/refresh`.
#[derive(Debug, Clone)]
pub enum RefreshReply {
    /// Mint this token; optionally rotate the refresh token.
    Issue {
        token: String,
        refresh_token: Option<String>,
    },
    /// Answer with a non-2xx status and `{message}`.
    Reject { status: u16, message: String },
    /// Fail at the transport level.
    Unreachable,
}

/// One request as the fake backend saw it.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Option<serde_json::Value>,
}

/// Scripted backend.
///
/// Protected routes answer 200 for the currently valid access token and
/// 401 otherwise. `/boom` answers 500, `/empty` answers 204 and `/offline`
/// fails at the transport level. `/auth/login` always answers 401.
pub struct FakeBackend {
    valid_token: Mutex<String>,
    refresh_reply: Mutex<RefreshReply>,
    calls: Mutex<Vec<RecordedCall>>,
    rejections: watch::Sender<usize>,
    hold_refresh_until: Mutex<Option<usize>>,
    gates: Mutex<HashMap<String, watch::Receiver<bool>>>,
}

impl FakeBackend {
    pub fn new(valid_token: &str) -> Self {
        Self {
            valid_token: Mutex::new(valid_token.to_string()),
            refresh_reply: Mutex::new(RefreshReply::Issue {
                token: "T2".to_string(),
                refresh_token: None,
            }),
            calls: Mutex::new(Vec::new()),
            rejections: watch::channel(0).0,
            hold_refresh_until: Mutex::new(None),
            gates: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_refresh_reply(&self, reply: RefreshReply) {
        *self.refresh_reply.lock() = reply;
    }

    /// Makes the refresh route wait until `count` protected calls were rejected.
    pub fn hold_refresh_until_rejections(&self, count: usize) {
        *self.hold_refresh_until.lock() = Some(count);
    }

    /// Holds every answer on `path` until the returned sender sends `true`.
    ///
    /// The request is recorded when it arrives; it is judged against the
    /// valid token only once released.
    pub fn gate(&self, path: &str) -> watch::Sender<bool> {
        let (open, gate) = watch::channel(false);
        self.gates.lock().insert(path.to_string(), gate);
        open
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|c| c.path == path).collect()
    }

    fn record(&self, url: &Url, request: &ApiRequest) {
        self.calls.lock().push(RecordedCall {
            path: url.path().to_string(),
            authorization: request.headers.get(AUTHORIZATION).map(String::from),
            body: request
                .body
                .as_deref()
                .and_then(|b| serde_json::from_slice(b).ok()),
        });
    }

    async fn refresh(&self) -> Result<ApiResponse, TransportError> {
        let hold = *self.hold_refresh_until.lock();
        if let Some(count) = hold {
            let mut rejections = self.rejections.subscribe();
            let _ = rejections.wait_for(|seen| *seen >= count).await;
        }
        tokio::task::yield_now().await;

        let reply = self.refresh_reply.lock().clone();
        match reply {
            RefreshReply::Issue {
                token,
                refresh_token,
            } => {
                self.valid_token.lock().clone_from(&token);
                Ok(ApiResponse::json(
                    200,
                    &json!({ "token": token, "refresh_token": refresh_token }),
                ))
            }
            RefreshReply::Reject { status, message } => {
                Ok(ApiResponse::json(status, &json!({ "message": message })))
            }
            RefreshReply::Unreachable => {
                Err(TransportError::ConnectionFailed("connection refused".to_string()))
            }
        }
    }
}

#[async_trait]
impl HttpTransport for FakeBackend {
    async fn send(&self, url: &Url, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.record(url, request);
        tokio::task::yield_now().await;
        let gate = self.gates.lock().get(url.path()).cloned();
        if let Some(mut gate) = gate {
            let _ = gate.wait_for(|open| *open).await;
        }

        match url.path() {
            "/auth/refresh" => self.refresh().await,
            "/auth/login" => Ok(ApiResponse::json(
                401,
                &json!({ "message": "invalid credentials" }),
            )),
            "/boom" => Ok(ApiResponse::json(
                500,
                &json!({ "message": "database unavailable" }),
            )),
            "/offline" => Err(TransportError::Timeout { timeout_ms: 30_000 }),
            "/empty" => Ok(ApiResponse::new(204, Headers::new(), Vec::new(), Duration::ZERO)),
            path => {
                let expected = format!("Bearer {}", self.valid_token.lock());
                if request.headers.get(AUTHORIZATION) == Some(expected.as_str()) {
                    Ok(ApiResponse::json(200, &json!({ "path": path })))
                } else {
                    self.rejections.send_modify(|seen| *seen += 1);
                    Ok(ApiResponse::new(
                        401,
                        Headers::new(),
                        br#"{"message":"jwt expired"}"#.to_vec(),
                        Duration::ZERO,
                    ))
                }
            }
        }
    }
}

/// Token store, session and repository wired over in-memory fakes.
pub struct Fixture {
    pub repository: Arc<MemoryRepository>,
    pub clock: Arc<ManualClock>,
    pub tokens: TokenStore,
    pub session: SessionState,
}

impl Fixture {
    pub fn new() -> Self {
        let repository = Arc::new(MemoryRepository::default());
        let clock = Arc::new(ManualClock::new());
        let tokens = TokenStore::new(repository.clone(), clock.clone()).with_secure(true);
        let session = SessionState::new(tokens.clone(), TokenPolicy::default());
        Self {
            repository,
            clock,
            tokens,
            session,
        }
    }

    /// Stores an access token and, optionally, a refresh token and identity.
    pub async fn seed(&self, access: &str, refresh: Option<&str>) {
        let policy = TokenPolicy::default();
        self.tokens
            .set(CredentialKind::Access, access, policy.access_ttl_days)
            .await
            .unwrap();
        if let Some(refresh) = refresh {
            self.tokens
                .set(CredentialKind::Refresh, refresh, policy.refresh_ttl_days)
                .await
                .unwrap();
        }
    }
}
