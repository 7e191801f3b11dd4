//! Authentication domain types

mod credential;
mod identity;
mod token;

pub use credential::{Credential, CredentialKind};
pub use identity::{SessionSnapshot, UserIdentity};
pub use token::{AccessToken, RefreshToken, token_preview};
