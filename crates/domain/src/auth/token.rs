//! Bearer token newtypes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Returns a preview of a token (first 8 chars + `...`) for logs.
#[must_use]
pub fn token_preview(token: &str) -> String {
    if token.len() > 12 {
        let cut = token
            .char_indices()
            .nth(8)
            .map_or(token.len(), |(index, _)| index);
        format!("{}...", &token[..cut])
    } else {
        "***".to_string()
    }
}

macro_rules! opaque_token {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw token value.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the raw token value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the token, returning the raw value.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }

            /// Returns a log-safe preview.
            #[must_use]
            pub fn preview(&self) -> String {
                token_preview(&self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.preview())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

opaque_token!(
    /// Short-lived bearer credential sent on every authenticated call.
    AccessToken
);

opaque_token!(
    /// Long-lived credential used only to mint a new [`AccessToken`].
    RefreshToken
);

impl AccessToken {
    /// Returns the `Authorization` header value.
    #[must_use]
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.0)
    }
}
