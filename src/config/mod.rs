use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::credentials::{ConsumerKeys, Credentials, PasswordLogin, TokenCredentials};

/// Default Instapaper API origin.
pub const DEFAULT_BASE_URL: &str = "https://www.instapaper.com/api/1/";

/// Token validity window when none is configured (one hour).
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 3600;
/// Longest accepted token validity window (30 days).
pub const MAX_TOKEN_TTL_SECONDS: i64 = 30 * 24 * 3600;

/// Complete bridge configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Raw credential fields as they appear in the file or environment.
///
/// Every field is optional here; [`CredentialsConfig::resolve`] decides whether
/// the combination is usable.
#[derive(Clone, Default, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub consumer_key: Option<String>,
    #[serde(default)]
    pub consumer_secret: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub access_token_secret: Option<String>,
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &self.consumer_secret.as_ref().map(|_| "<redacted>"))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field(
                "access_token_secret",
                &self.access_token_secret.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// API client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL every endpoint path is joined onto
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout applied by the HTTP transport (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// How long an access token is trusted before it is re-acquired (seconds)
    #[serde(default = "default_token_ttl")]
    pub token_ttl_seconds: i64,
    /// Maximum in-flight requests for batch operations
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_token_ttl() -> i64 {
    DEFAULT_TOKEN_TTL_SECONDS
}

fn default_batch_concurrency() -> usize {
    8
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_seconds: default_request_timeout(),
            token_ttl_seconds: default_token_ttl(),
            batch_concurrency: default_batch_concurrency(),
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Token validity window; must be between one second and
    /// [`MAX_TOKEN_TTL_SECONDS`].
    pub fn token_ttl(&self) -> Result<chrono::Duration, ConfigError> {
        let seconds = self.token_ttl_seconds;
        let out_of_range = || ConfigError::Invalid {
            setting: "token_ttl_seconds",
            reason: format!("must be between 1 and {}, got {}", MAX_TOKEN_TTL_SECONDS, seconds),
        };

        if !(1..=MAX_TOKEN_TTL_SECONDS).contains(&seconds) {
            return Err(out_of_range());
        }
        chrono::TimeDelta::try_seconds(seconds).ok_or_else(out_of_range)
    }
}

/// Credential validation errors, reported once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),
    #[error(
        "either username/password or access_token/access_token_secret must be configured"
    )]
    NoAuthenticationPath,
    #[error("invalid setting {setting}: {reason}")]
    Invalid {
        setting: &'static str,
        reason: String,
    },
}

impl CredentialsConfig {
    /// Validate the raw fields and build immutable [`Credentials`].
    ///
    /// Blank strings count as absent. A half-configured pair (only a username,
    /// or only an access token) does not satisfy either path.
    pub fn resolve(&self) -> Result<Credentials, ConfigError> {
        let consumer_key = present(&self.consumer_key).ok_or(ConfigError::Missing("consumer_key"))?;
        let consumer_secret =
            present(&self.consumer_secret).ok_or(ConfigError::Missing("consumer_secret"))?;

        let login = match (present(&self.username), present(&self.password)) {
            (Some(username), Some(password)) => Some(PasswordLogin::new(username, password)),
            _ => None,
        };

        let access_token = match (present(&self.access_token), present(&self.access_token_secret)) {
            (Some(token), Some(secret)) => Some(TokenCredentials::new(token, secret)),
            _ => None,
        };

        if login.is_none() && access_token.is_none() {
            return Err(ConfigError::NoAuthenticationPath);
        }

        Ok(Credentials {
            consumer: ConsumerKeys::new(consumer_key, consumer_secret),
            login,
            access_token,
        })
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl BridgeConfig {
    /// Overlay `INSTAPAPER_*` environment variables onto this configuration.
    pub fn apply_env(self) -> Self {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    fn apply_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        let creds = &mut self.credentials;
        for (name, slot) in [
            ("INSTAPAPER_CONSUMER_KEY", &mut creds.consumer_key),
            ("INSTAPAPER_CONSUMER_SECRET", &mut creds.consumer_secret),
            ("INSTAPAPER_USERNAME", &mut creds.username),
            ("INSTAPAPER_PASSWORD", &mut creds.password),
            ("INSTAPAPER_ACCESS_TOKEN", &mut creds.access_token),
            ("INSTAPAPER_ACCESS_TOKEN_SECRET", &mut creds.access_token_secret),
        ] {
            if let Some(v) = var(name) {
                *slot = Some(v);
            }
        }

        if let Some(v) = var("INSTAPAPER_BASE_URL") {
            self.api.base_url = v;
        }
        if let Some(v) = var("INSTAPAPER_REQUEST_TIMEOUT_SECONDS") {
            if let Ok(n) = v.parse::<u64>() {
                self.api.request_timeout_seconds = n;
            }
        }
        if let Some(v) = var("INSTAPAPER_TOKEN_TTL_SECONDS") {
            if let Ok(n) = v.parse::<i64>() {
                self.api.token_ttl_seconds = n;
            }
        }
        if let Some(v) = var("INSTAPAPER_BATCH_CONCURRENCY") {
            if let Ok(n) = v.parse::<usize>() {
                self.api.batch_concurrency = n;
            }
        }

        self
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<BridgeConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path))?;
    let config: BridgeConfig =
        toml::from_str(&contents).with_context(|| format!("Failed to parse config file {}", path))?;
    Ok(config)
}
