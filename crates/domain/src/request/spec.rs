//! Request specification for calls against the backend.

use serde::Serialize;
use url::Url;

use super::header::{CONTENT_TYPE, Headers};
use super::method::HttpMethod;
use crate::error::{DomainError, DomainResult};

const JSON_CONTENT_TYPE: &str = "application/json";

/// A request addressed to the backend.
///
/// The body is an owned buffer, so a request can be submitted again
/// verbatim after a credential refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Either a path relative to the API base URL (`/task`) or an absolute URL.
    pub target: String,
    /// Request headers.
    pub headers: Headers,
    /// Request body, if any.
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    /// Creates a request with no headers and no body.
    #[must_use]
    pub fn new(method: HttpMethod, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            headers: Headers::new(),
            body: None,
        }
    }

    /// Creates a GET request.
    #[must_use]
    pub fn get(target: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, target)
    }

    /// Creates a POST request.
    #[must_use]
    pub fn post(target: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, target)
    }

    /// Creates a PUT request.
    #[must_use]
    pub fn put(target: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, target)
    }

    /// Creates a DELETE request.
    #[must_use]
    pub fn delete(target: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, target)
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Sets a raw body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `value` as the JSON body and sets the content type.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized.
    pub fn with_json<T: Serialize + ?Sized>(mut self, value: &T) -> DomainResult<Self> {
        let body =
            serde_json::to_vec(value).map_err(|e| DomainError::InvalidBody(e.to_string()))?;
        self.headers.set(CONTENT_TYPE, JSON_CONTENT_TYPE);
        self.body = Some(body);
        Ok(self)
    }

    /// Resolves the target against the API base URL.
    ///
    /// Relative targets are appended to the base URL path, so a base of
    /// `https://host/api` and a target of `/task` give `https://host/api/task`.
    ///
    /// # Errors
    ///
    /// Returns an error if the result is not a valid URL.
    pub fn resolve(&self, base: &Url) -> DomainResult<Url> {
        let target = self.target.trim();
        if target.starts_with("http://") || target.starts_with("https://") {
            return Url::parse(target).map_err(|e| DomainError::InvalidUrl(format!("{e}: {target}")));
        }

        let base = base.as_str().trim_end_matches('/');
        let joined = if target.starts_with('/') {
            format!("{base}{target}")
        } else {
            format!("{base}/{target}")
        };
        Url::parse(&joined).map_err(|e| DomainError::InvalidUrl(format!("{e}: {joined}")))
    }
}
