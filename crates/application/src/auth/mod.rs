//! Authentication module for the Taskdeck client.
//!
//! This module provides:
//! - Persistent credential storage with expiry tracking
//! - Single-flight access-token refresh
//! - Session state with change notifications
//! - Password sign-in

mod client;
mod endpoints;
mod refresh;
mod session;
mod token_store;

pub use client::AuthClient;
pub use endpoints::{ApiEndpoints, DEFAULT_LOGIN_PATH, DEFAULT_REFRESH_PATH, TokenPolicy};
pub use refresh::{RefreshCoordinator, RefreshError, TokenRefresher};
pub use session::SessionState;
pub use token_store::{CredentialStatus, TokenStore};
