//! Persistent credential storage with expiry tracking.
//!
//! The store reads and writes the access token, the refresh token and the
//! cached identity through a [`CredentialRepository`]. Expiry is checked on
//! read: an expired credential reads as absent and is dropped from storage.

use std::sync::Arc;

use taskdeck_domain::{AccessToken, Credential, CredentialKind, RefreshToken, UserIdentity};
use tracing::debug;

use crate::ports::{Clock, CredentialRepository, StorageError};

/// Cloneable handle to the credential store.
#[derive(Clone)]
pub struct TokenStore {
    repository: Arc<dyn CredentialRepository>,
    clock: Arc<dyn Clock>,
    /// Mark credentials as TLS-only.
    secure: bool,
}

impl TokenStore {
    /// Create a new token store.
    #[must_use]
    pub fn new(repository: Arc<dyn CredentialRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            clock,
            secure: false,
        }
    }

    /// Flag stored credentials as secure-transport only.
    #[must_use]
    pub const fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Get a credential value, or None if missing or expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn get(&self, kind: CredentialKind) -> Result<Option<String>, StorageError> {
        let Some(credential) = self.repository.load(kind).await? else {
            return Ok(None);
        };

        if credential.is_expired_at(self.clock.now()) {
            debug!(credential = %kind, "stored credential expired, dropping it");
            self.repository.remove(kind).await?;
            return Ok(None);
        }

        Ok(Some(credential.value))
    }

    /// Store a credential that stays readable for `ttl_days`.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn set(
        &self,
        kind: CredentialKind,
        value: &str,
        ttl_days: u32,
    ) -> Result<(), StorageError> {
        let credential =
            Credential::new(kind, value, ttl_days, self.clock.now()).with_secure(self.secure);
        self.repository.save(&credential).await
    }

    /// Remove a credential. Removing an absent credential succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn clear(&self, kind: CredentialKind) -> Result<(), StorageError> {
        self.repository.remove(kind).await
    }

    /// Remove both credentials.
    ///
    /// # Errors
    ///
    /// Returns the first repository failure; both removals are attempted.
    pub async fn clear_tokens(&self) -> Result<(), StorageError> {
        let access = self.clear(CredentialKind::Access).await;
        let refresh = self.clear(CredentialKind::Refresh).await;
        access.and(refresh)
    }

    /// The current access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn access_token(&self) -> Result<Option<AccessToken>, StorageError> {
        Ok(self.get(CredentialKind::Access).await?.map(AccessToken::new))
    }

    /// The current refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn refresh_token(&self) -> Result<Option<RefreshToken>, StorageError> {
        Ok(self.get(CredentialKind::Refresh).await?.map(RefreshToken::new))
    }

    /// The cached identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn identity(&self) -> Result<Option<UserIdentity>, StorageError> {
        self.repository.load_identity().await
    }

    /// Cache the identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn set_identity(&self, identity: &UserIdentity) -> Result<(), StorageError> {
        self.repository.save_identity(identity).await
    }

    /// Drop the cached identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn clear_identity(&self) -> Result<(), StorageError> {
        self.repository.remove_identity().await
    }

    /// Get credential status for display.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn status(&self, kind: CredentialKind) -> Result<CredentialStatus, StorageError> {
        let status = self
            .repository
            .load(kind)
            .await?
            .map_or(CredentialStatus::Missing, |credential| {
                let remaining = (credential.expires_at - self.clock.now()).num_seconds();
                if remaining <= 0 {
                    CredentialStatus::Expired
                } else {
                    CredentialStatus::Valid {
                        seconds_remaining: remaining,
                    }
                }
            });
        Ok(status)
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("secure", &self.secure)
            .finish_non_exhaustive()
    }
}

/// Status of a stored credential for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStatus {
    /// Nothing stored.
    Missing,
    /// Stored and readable.
    Valid {
        /// Seconds until the stored copy expires.
        seconds_remaining: i64,
    },
    /// Stored but past its expiry.
    Expired,
}

impl CredentialStatus {
    /// Returns true if the credential can be read.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// Get a user-friendly display message.
    #[must_use]
    pub fn display_message(&self) -> String {
        match self {
            Self::Missing => "not stored".to_string(),
            Self::Expired => "expired".to_string(),
            Self::Valid { seconds_remaining } => {
                let secs = *seconds_remaining;
                if secs > 86_400 {
                    format!("valid for {} days", secs / 86_400)
                } else if secs > 3600 {
                    format!("valid for {} hours", secs / 3600)
                } else if secs > 60 {
                    format!("valid for {} minutes", secs / 60)
                } else {
                    format!("valid for {secs} seconds")
                }
            }
        }
    }
}
