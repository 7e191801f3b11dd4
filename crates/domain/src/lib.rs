//! Taskdeck Domain - Core types
//!
//! This crate defines the types shared by the authenticated request
//! pipeline: credentials, identities, requests and responses.
//! All types here are pure Rust with no I/O dependencies.

pub mod api_error;
pub mod auth;
pub mod error;
pub mod request;
pub mod response;

pub use api_error::ErrorPayload;
pub use auth::{
    AccessToken, Credential, CredentialKind, RefreshToken, SessionSnapshot, UserIdentity,
    token_preview,
};
pub use error::{DomainError, DomainResult};
pub use request::{ApiRequest, Headers, HttpMethod};
pub use response::{ApiResponse, StatusCode};
