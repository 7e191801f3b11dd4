//! Credential repository port
//!
//! Defines the interface for persisting the two credentials and the cached
//! identity across restarts.

use async_trait::async_trait;
use taskdeck_domain::{Credential, CredentialKind, UserIdentity};

/// Errors that can occur during credential persistence.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The storage location cannot be determined or used.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Repository trait for credential persistence.
///
/// Removal of an absent entry is not an error.
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Loads a credential, expired or not.
    async fn load(&self, kind: CredentialKind) -> Result<Option<Credential>, StorageError>;

    /// Saves a credential, replacing any credential of the same kind.
    async fn save(&self, credential: &Credential) -> Result<(), StorageError>;

    /// Removes a credential.
    async fn remove(&self, kind: CredentialKind) -> Result<(), StorageError>;

    /// Loads the cached identity.
    async fn load_identity(&self) -> Result<Option<UserIdentity>, StorageError>;

    /// Saves the cached identity.
    async fn save_identity(&self, identity: &UserIdentity) -> Result<(), StorageError>;

    /// Removes the cached identity.
    async fn remove_identity(&self) -> Result<(), StorageError>;
}
