//! Taskdeck Application - Authenticated request pipeline
//!
//! This crate defines the application layer with:
//! - Port traits (interfaces for external dependencies)
//! - The request gateway with refresh-and-retry
//! - Credential storage, single-flight refresh and session state
//! - Application-level error handling

pub mod auth;
pub mod error;
pub mod gateway;
pub mod pipeline;
pub mod ports;

#[cfg(test)]
mod test_support;

pub use auth::{
    ApiEndpoints, AuthClient, CredentialStatus, RefreshCoordinator, RefreshError, SessionState,
    TokenPolicy, TokenRefresher, TokenStore,
};
pub use error::{GatewayError, GatewayResult};
pub use gateway::RequestGateway;
pub use pipeline::AuthPipeline;
pub use ports::{
    Clock, CredentialRepository, FileSystem, FileSystemError, HttpTransport, StorageError,
    TransportError,
};
