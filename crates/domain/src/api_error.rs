//! Normalized error shape handed to callers of the request pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A failure reduced to a machine-readable code and a human message.
///
/// HTTP failures use the decimal status as the code (`"404"`); pipeline
/// failures use an upper-case tag such as `SESSION_EXPIRED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Machine-readable code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl ErrorPayload {
    /// Creates a payload.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}
