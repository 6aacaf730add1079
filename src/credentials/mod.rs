//! Credentials for accessing the Instapaper API.
//!
//! Loaded once at startup from [`crate::config`] and shared read-only by every
//! component. Two authentication paths are supported:
//!
//! - **xAuth**: username and password are exchanged for an access token on
//!   first use (see [`crate::auth`]).
//! - **Pre-provisioned token**: an access token and secret the operator already
//!   holds are used directly, skipping the exchange round trip.
//!
//! Consumer key and secret identify the application and are always required.
//!
//! # Security
//! - `Debug` output never contains secrets or passwords
//! - Nothing here is ever persisted to disk

use std::fmt;

/// OAuth consumer (application) key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct ConsumerKeys {
    pub key: String,
    pub secret: String,
}

impl ConsumerKeys {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for ConsumerKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerKeys")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// OAuth access token and its secret.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenCredentials {
    pub token: String,
    pub secret: String,
}

impl TokenCredentials {
    pub fn new(token: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for TokenCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCredentials")
            .field("token", &"<redacted>")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Username and password used for the xAuth exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordLogin {
    pub username: String,
    pub password: String,
}

impl PasswordLogin {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for PasswordLogin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordLogin")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Validated credentials.
///
/// At least one of `login` or `access_token` is always present; construction
/// goes through [`crate::config::CredentialsConfig::resolve`] which enforces it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub consumer: ConsumerKeys,
    pub login: Option<PasswordLogin>,
    pub access_token: Option<TokenCredentials>,
}

impl Credentials {
    /// Credentials that authenticate with username and password.
    pub fn with_login(consumer: ConsumerKeys, login: PasswordLogin) -> Self {
        Self {
            consumer,
            login: Some(login),
            access_token: None,
        }
    }

    /// Credentials that use an access token the operator already holds.
    pub fn with_access_token(consumer: ConsumerKeys, access_token: TokenCredentials) -> Self {
        Self {
            consumer,
            login: None,
            access_token: Some(access_token),
        }
    }
}
