//! Application configuration.
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! `taskdeck.toml` in the platform config directory, then `TASKDECK_*`
//! environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use taskdeck_application::{ApiEndpoints, TokenPolicy};
use taskdeck_application::auth::{DEFAULT_LOGIN_PATH, DEFAULT_REFRESH_PATH};
use url::Url;

/// Application directory name under the platform config/data directories.
pub const APP_DIR: &str = "taskdeck";

/// Configuration file name.
pub const CONFIG_FILE: &str = "taskdeck.toml";

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "TASKDECK";

const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";

/// Errors raised while loading or interpreting configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A source could not be read or deserialized.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// The API base URL is not a valid http(s) URL.
    #[error("invalid api_base_url '{url}': {reason}")]
    InvalidBaseUrl {
        /// The configured value.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// No storage directory configured and none could be derived.
    #[error("no storage directory available; set {ENV_PREFIX}_STORAGE_DIR")]
    NoStorageDir,
}

/// Runtime configuration of the client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// Base URL every relative request target is resolved against.
    pub api_base_url: String,
    /// Path of the password sign-in endpoint.
    pub login_path: String,
    /// Path of the token refresh endpoint.
    pub refresh_path: String,
    /// Lifetime of a stored access credential.
    pub access_token_ttl_days: u32,
    /// Lifetime of a stored refresh credential.
    pub refresh_token_ttl_days: u32,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
    /// Overrides the directory holding `credentials.json`.
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Loads configuration from the default file location and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a present source is malformed.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(default_config_file().as_deref())
    }

    /// Loads configuration from `file` (if it exists) and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a present source is malformed.
    pub fn load_from(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::build(file, Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    fn build(file: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let defaults = TokenPolicy::default();
        let mut builder = Config::builder()
            .set_default("api_base_url", DEFAULT_API_BASE_URL)?
            .set_default("login_path", DEFAULT_LOGIN_PATH)?
            .set_default("refresh_path", DEFAULT_REFRESH_PATH)?
            .set_default("access_token_ttl_days", i64::from(defaults.access_ttl_days))?
            .set_default("refresh_token_ttl_days", i64::from(defaults.refresh_ttl_days))?
            .set_default("request_timeout_secs", 30_i64)?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(false));
        }

        Ok(builder.add_source(env).build()?.try_deserialize()?)
    }

    /// Endpoints derived from the base URL and route paths.
    ///
    /// # Errors
    ///
    /// Returns an error if `api_base_url` is not an http(s) URL.
    pub fn endpoints(&self) -> Result<ApiEndpoints, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            url: self.api_base_url.clone(),
            reason,
        };
        let base = Url::parse(&self.api_base_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", base.scheme())));
        }

        Ok(ApiEndpoints::new(base)
            .with_login_path(self.login_path.clone())
            .with_refresh_path(self.refresh_path.clone()))
    }

    /// Credential lifetimes.
    #[must_use]
    pub const fn policy(&self) -> TokenPolicy {
        TokenPolicy {
            access_ttl_days: self.access_token_ttl_days,
            refresh_ttl_days: self.refresh_token_ttl_days,
        }
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Directory holding the credential document.
    ///
    /// # Errors
    ///
    /// Returns an error if no override is set and the platform has no data
    /// directory.
    pub fn storage_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = &self.storage_dir {
            return Ok(dir.clone());
        }
        dirs::data_local_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(ConfigError::NoStorageDir)
    }

    /// Directory holding the credentials of the configured backend origin.
    ///
    /// Each origin gets its own subdirectory of [`storage_dir`](Self::storage_dir),
    /// so credentials issued by one backend are never sent to another.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or the storage directory is invalid.
    pub fn credential_dir(&self) -> Result<PathBuf, ConfigError> {
        let endpoints = self.endpoints()?;
        let base = endpoints.base_url();
        let origin = format!(
            "{}_{}_{}",
            base.scheme(),
            base.host_str().unwrap_or("localhost"),
            base.port_or_known_default().unwrap_or_default()
        );
        Ok(self.storage_dir()?.join(origin))
    }
}

/// Returns `<config dir>/taskdeck/taskdeck.toml` when the platform has one.
#[must_use]
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}
