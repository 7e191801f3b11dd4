//! Persistence implementations.

mod credential_repository;
mod file_system;

pub use credential_repository::{CREDENTIALS_FILE, FileCredentialRepository};
pub use file_system::TokioFileSystem;
