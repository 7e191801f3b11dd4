//! File-based credential repository implementation.
//!
//! Both credentials and the cached identity live in a single
//! `credentials.json` document inside the storage directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use taskdeck_application::ports::{CredentialRepository, FileSystem, FileSystemError, StorageError};
use taskdeck_domain::{Credential, CredentialKind, UserIdentity};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::serialization::{from_json_bytes, to_json_stable_bytes};

/// File name of the credential document.
pub const CREDENTIALS_FILE: &str = "credentials.json";

const SCHEMA_VERSION: u32 = 1;

/// Suffix of the staging file a new document is written to before it
/// replaces the current one.
const STAGING_SUFFIX: &str = ".tmp";

/// Converts `FileSystemError` to `StorageError`.
fn to_storage_error(e: FileSystemError) -> StorageError {
    match e {
        FileSystemError::Io(io_err) => StorageError::Io(io_err),
        FileSystemError::NotFound(path) => StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            path.display().to_string(),
        )),
        FileSystemError::PermissionDenied(path) => {
            StorageError::Unavailable(format!("permission denied: {}", path.display()))
        }
    }
}

/// On-disk layout:
/// ```json
/// {
///   "credentials": {
///     "refresh_token": { "kind": "refresh", "value": "...", ... },
///     "token": { "kind": "access", "value": "...", ... }
///   },
///   "identity": { "id": "42", "email": "ada@example.com" },
///   "schema_version": 1
/// }
/// ```
#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialDocument {
    #[serde(default)]
    schema_version: u32,
    #[serde(default)]
    credentials: BTreeMap<String, Credential>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    identity: Option<UserIdentity>,
}

impl CredentialDocument {
    fn is_empty(&self) -> bool {
        self.credentials.is_empty() && self.identity.is_none()
    }
}

/// File-based credential repository.
///
/// Writes go through a read-modify-write cycle serialized by an internal
/// lock, so concurrent saves from one process never lose an entry. A new
/// document is staged next to the current one and renamed over it, so a
/// crash mid-write leaves the previous document intact. A document that
/// can no longer be decoded is discarded by the next write.
#[derive(Debug)]
pub struct FileCredentialRepository<F> {
    fs: F,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl<F: FileSystem> FileCredentialRepository<F> {
    /// Creates a repository storing its document in `dir`.
    pub fn new(fs: F, dir: &Path) -> Self {
        Self {
            fs,
            path: dir.join(CREDENTIALS_FILE),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the path of the credential document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<CredentialDocument, StorageError> {
        if !self.fs.exists(&self.path).await {
            return Ok(CredentialDocument::default());
        }

        let content = self
            .fs
            .read_file(&self.path)
            .await
            .map_err(to_storage_error)?;

        from_json_bytes(&content).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn write_document(&self, mut document: CredentialDocument) -> Result<(), StorageError> {
        if document.is_empty() {
            if self.fs.exists(&self.path).await {
                self.fs
                    .remove_file(&self.path)
                    .await
                    .map_err(to_storage_error)?;
                debug!(path = %self.path.display(), "credential document removed");
            }
            return Ok(());
        }

        document.schema_version = SCHEMA_VERSION;
        let content = to_json_stable_bytes(&document)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let staging = self.staging_path();
        self.fs
            .write_file(&staging, &content)
            .await
            .map_err(to_storage_error)?;
        self.fs
            .rename(&staging, &self.path)
            .await
            .map_err(to_storage_error)?;

        debug!(path = %self.path.display(), "credential document written");
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(STAGING_SUFFIX);
        PathBuf::from(name)
    }

    async fn update<R>(
        &self,
        apply: impl FnOnce(&mut CredentialDocument) -> R + Send,
    ) -> Result<R, StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut document = match self.read_document().await {
            Ok(document) => document,
            Err(StorageError::Serialization(reason)) => {
                warn!(
                    path = %self.path.display(),
                    %reason,
                    "discarding undecodable credential document"
                );
                CredentialDocument::default()
            }
            Err(e) => return Err(e),
        };
        let result = apply(&mut document);
        self.write_document(document).await?;
        Ok(result)
    }
}

#[async_trait]
impl<F: FileSystem> CredentialRepository for FileCredentialRepository<F> {
    async fn load(&self, kind: CredentialKind) -> Result<Option<Credential>, StorageError> {
        let mut document = self.read_document().await?;
        Ok(document.credentials.remove(kind.storage_name()))
    }

    async fn save(&self, credential: &Credential) -> Result<(), StorageError> {
        let credential = credential.clone();
        self.update(move |doc| {
            doc.credentials
                .insert(credential.kind.storage_name().to_string(), credential);
        })
        .await
    }

    async fn remove(&self, kind: CredentialKind) -> Result<(), StorageError> {
        if !self.fs.exists(&self.path).await {
            return Ok(());
        }
        self.update(|doc| {
            doc.credentials.remove(kind.storage_name());
        })
        .await
    }

    async fn load_identity(&self) -> Result<Option<UserIdentity>, StorageError> {
        Ok(self.read_document().await?.identity)
    }

    async fn save_identity(&self, identity: &UserIdentity) -> Result<(), StorageError> {
        let identity = identity.clone();
        self.update(move |doc| doc.identity = Some(identity)).await
    }

    async fn remove_identity(&self) -> Result<(), StorageError> {
        if !self.fs.exists(&self.path).await {
            return Ok(());
        }
        self.update(|doc| doc.identity = None).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::TokioFileSystem;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn repository(temp: &TempDir) -> FileCredentialRepository<TokioFileSystem> {
        FileCredentialRepository::new(TokioFileSystem::new(), temp.path())
    }

    fn credential(kind: CredentialKind, value: &str) -> Credential {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        Credential::new(kind, value, 1, now).with_secure(true)
    }

    #[tokio::test]
    async fn test_empty_directory_loads_nothing() {
        let temp = TempDir::new().unwrap();
        let repo = repository(&temp);

        assert_eq!(repo.load(CredentialKind::Access).await.unwrap(), None);
        assert_eq!(repo.load_identity().await.unwrap(), None);
        assert!(!repo.path().exists());
    }

    #[tokio::test]
    async fn test_save_and_load_both_kinds() {
        let temp = TempDir::new().unwrap();
        let repo = repository(&temp);
        let access = credential(CredentialKind::Access, "access-value");
        let refresh = credential(CredentialKind::Refresh, "refresh-value");

        repo.save(&access).await.unwrap();
        repo.save(&refresh).await.unwrap();

        assert_eq!(repo.load(CredentialKind::Access).await.unwrap(), Some(access));
        assert_eq!(repo.load(CredentialKind::Refresh).await.unwrap(), Some(refresh));
    }

    #[tokio::test]
    async fn test_document_survives_a_new_repository_instance() {
        let temp = TempDir::new().unwrap();
        let identity = UserIdentity::new("42", "ada@example.com").with_name("Ada");
        {
            let repo = repository(&temp);
            repo.save(&credential(CredentialKind::Access, "persisted"))
                .await
                .unwrap();
            repo.save_identity(&identity).await.unwrap();
        }

        let reopened = repository(&temp);
        let access = reopened.load(CredentialKind::Access).await.unwrap().unwrap();
        assert_eq!(access.value, "persisted");
        assert_eq!(reopened.load_identity().await.unwrap(), Some(identity));
    }

    #[tokio::test]
    async fn test_document_is_keyed_by_storage_name() {
        let temp = TempDir::new().unwrap();
        let repo = repository(&temp);
        repo.save(&credential(CredentialKind::Refresh, "r1"))
            .await
            .unwrap();

        let raw = std::fs::read_to_string(repo.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(value["schema_version"], 1);
        assert_eq!(value["credentials"]["refresh_token"]["value"], "r1");
        assert!(raw.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let repo = repository(&temp);

        repo.remove(CredentialKind::Access).await.unwrap();
        repo.remove_identity().await.unwrap();

        repo.save(&credential(CredentialKind::Access, "a")).await.unwrap();
        repo.save(&credential(CredentialKind::Refresh, "r")).await.unwrap();
        repo.remove(CredentialKind::Access).await.unwrap();
        repo.remove(CredentialKind::Access).await.unwrap();

        assert_eq!(repo.load(CredentialKind::Access).await.unwrap(), None);
        assert!(repo.load(CredentialKind::Refresh).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_saves_keep_every_entry() {
        let temp = TempDir::new().unwrap();
        let repo = repository(&temp);
        let access = credential(CredentialKind::Access, "a");
        let refresh = credential(CredentialKind::Refresh, "r");
        let identity = UserIdentity::new("7", "grace@example.com");

        let (a, r, i) = tokio::join!(
            repo.save(&access),
            repo.save(&refresh),
            repo.save_identity(&identity)
        );
        a.unwrap();
        r.unwrap();
        i.unwrap();

        assert!(repo.load(CredentialKind::Access).await.unwrap().is_some());
        assert!(repo.load(CredentialKind::Refresh).await.unwrap().is_some());
        assert!(repo.load_identity().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_corrupt_document_is_a_serialization_error() {
        let temp = TempDir::new().unwrap();
        let repo = repository(&temp);
        std::fs::write(repo.path(), b"{ not json").unwrap();

        let error = repo.load(CredentialKind::Access).await.unwrap_err();

        assert!(matches!(error, StorageError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_removal_discards_corrupt_document() {
        let temp = TempDir::new().unwrap();
        let repo = repository(&temp);
        std::fs::write(repo.path(), b"{\"credentials\": {\"tok").unwrap();

        repo.remove(CredentialKind::Access).await.unwrap();
        repo.remove(CredentialKind::Refresh).await.unwrap();
        repo.remove_identity().await.unwrap();

        assert!(!repo.path().exists());
        assert_eq!(repo.load(CredentialKind::Refresh).await.unwrap(), None);
        assert_eq!(repo.load_identity().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_replaces_corrupt_document() {
        let temp = TempDir::new().unwrap();
        let repo = repository(&temp);
        std::fs::write(repo.path(), b"{ not json").unwrap();

        repo.save(&credential(CredentialKind::Access, "fresh"))
            .await
            .unwrap();

        let access = repo.load(CredentialKind::Access).await.unwrap().unwrap();
        assert_eq!(access.value, "fresh");
    }

    #[tokio::test]
    async fn test_write_leaves_no_staging_file() {
        let temp = TempDir::new().unwrap();
        let repo = repository(&temp);

        repo.save(&credential(CredentialKind::Access, "a")).await.unwrap();
        repo.save(&credential(CredentialKind::Refresh, "r")).await.unwrap();

        let names: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec![CREDENTIALS_FILE.to_string()]);
    }

    #[tokio::test]
    async fn test_clearing_everything_removes_the_document() {
        let temp = TempDir::new().unwrap();
        let repo = repository(&temp);
        repo.save(&credential(CredentialKind::Access, "a")).await.unwrap();
        repo.save_identity(&UserIdentity::new("1", "ana@example.com"))
            .await
            .unwrap();

        repo.remove(CredentialKind::Access).await.unwrap();
        assert!(repo.path().exists());
        repo.remove_identity().await.unwrap();

        assert!(!repo.path().exists());
    }
}
