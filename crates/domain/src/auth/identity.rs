//! Signed-in user identity and the session view derived from it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The user returned by the backend at sign-in.
///
/// Fields the client does not model are kept in `extra` so the cached
/// identity round-trips whatever the backend sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Backend identifier.
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    /// Login email.
    pub email: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Role name, e.g. `admin` or `member`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Any other fields.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl UserIdentity {
    /// Creates an identity with only the required fields.
    #[must_use]
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: None,
            role: None,
            extra: BTreeMap::new(),
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

// Backends disagree on numeric vs string ids.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// What the front end sees of the current session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// True while both credentials are held and the last refresh succeeded.
    pub is_authenticated: bool,
    /// The signed-in user.
    pub user: Option<UserIdentity>,
}

impl SessionSnapshot {
    /// The logged-out session.
    #[must_use]
    pub const fn logged_out() -> Self {
        Self {
            is_authenticated: false,
            user: None,
        }
    }

    /// An authenticated session for `user`.
    #[must_use]
    pub const fn authenticated(user: UserIdentity) -> Self {
        Self {
            is_authenticated: true,
            user: Some(user),
        }
    }
}
