//! Persisted credentials.
//!
//! A [`Credential`] is one named token with its own expiry, in the spirit
//! of a browser cookie: it is scoped to the backend origin and carries a
//! secure flag when that origin is served over TLS.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::token::token_preview;
use crate::error::DomainError;

/// The two credentials the client keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// Short-lived bearer credential.
    Access,
    /// Long-lived credential used only to mint a new access token.
    Refresh,
}

impl CredentialKind {
    /// Both kinds, access first.
    pub const ALL: [Self; 2] = [Self::Access, Self::Refresh];

    /// Stable storage name of the credential.
    #[must_use]
    pub const fn storage_name(self) -> &'static str {
        match self {
            Self::Access => "token",
            Self::Refresh => "refresh_token",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.storage_name())
    }
}

impl FromStr for CredentialKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "token" | "access" => Ok(Self::Access),
            "refresh_token" | "refresh" => Ok(Self::Refresh),
            _ => Err(DomainError::UnknownCredentialKind(s.to_string())),
        }
    }
}

/// A stored credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Which credential this is.
    pub kind: CredentialKind,
    /// The opaque token value.
    pub value: String,
    /// When the credential stops being readable.
    pub expires_at: DateTime<Utc>,
    /// Only sent over TLS.
    #[serde(default)]
    pub secure: bool,
    /// When the credential was stored.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Credential {
    /// Creates a credential that expires `ttl_days` after `now`.
    #[must_use]
    pub fn new(
        kind: CredentialKind,
        value: impl Into<String>,
        ttl_days: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            value: value.into(),
            expires_at: now + Duration::days(i64::from(ttl_days)),
            secure: false,
            created_at: now,
        }
    }

    /// Set the secure flag.
    #[must_use]
    pub const fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Check if the credential has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("kind", &self.kind)
            .field("value", &token_preview(&self.value))
            .field("expires_at", &self.expires_at)
            .field("secure", &self.secure)
            .finish_non_exhaustive()
    }
}
