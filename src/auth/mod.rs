//! Access token lifecycle.
//!
//! ```text
//!   NoToken ──token()──▶ Authenticating ──ok──▶ Authenticated
//!      ▲                      │                     │
//!      └──────── error ───────┘        invalidate() on 401
//!      └────────────────────────────────────────────┘
//! ```
//!
//! The fast path (a cached, unexpired token) only takes a short read lock on
//! the cache. Acquiring or clearing a token happens inside a single async
//! mutex, so at most one xAuth exchange is in flight and concurrent callers
//! wait for its result instead of starting their own. The mutex guard is
//! released on every exit path, including when the calling future is dropped
//! mid-exchange.

mod exchange;
mod token;

pub use exchange::ACCESS_TOKEN_PATH;
pub use token::{SessionToken, TokenSource};

use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::ConfigError;
use crate::credentials::{Credentials, TokenCredentials};
use crate::error::InstapaperError;
use crate::oauth::{Clock, OAuthSigner};
use crate::transport::Transport;

#[cfg(test)]
mod tests;

/// State only touched while holding the refresh mutex.
#[derive(Debug, Default)]
struct RefreshState {
    /// The configured token was rejected and a password login can replace it
    configured_rejected: bool,
}

/// Guarantees a valid access token before every signed call.
pub struct Authenticator {
    credentials: Arc<Credentials>,
    token_url: String,
    token_ttl: chrono::Duration,
    transport: Arc<dyn Transport>,
    signer: OAuthSigner,
    clock: Arc<dyn Clock>,
    cache: RwLock<Option<SessionToken>>,
    refresh: Mutex<RefreshState>,
}

impl Authenticator {
    pub fn new(
        credentials: Arc<Credentials>,
        token_url: impl Into<String>,
        token_ttl: chrono::Duration,
        transport: Arc<dyn Transport>,
        signer: OAuthSigner,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            credentials,
            token_url: token_url.into(),
            token_ttl,
            transport,
            signer,
            clock,
            cache: RwLock::new(None),
            refresh: Mutex::new(RefreshState::default()),
        }
    }

    /// Return a valid access token, acquiring one if necessary.
    pub async fn token(&self) -> Result<TokenCredentials, InstapaperError> {
        if let Some(token) = self.valid_cached() {
            return Ok(token);
        }

        let state = self.refresh.lock().await;

        // Another caller may have refreshed while we waited for the lock
        if let Some(token) = self.valid_cached() {
            debug!("Access token refreshed by a concurrent caller");
            return Ok(token);
        }

        let (credentials, source) = match (
            &self.credentials.access_token,
            &self.credentials.login,
            state.configured_rejected,
        ) {
            (Some(configured), None, _) | (Some(configured), Some(_), false) => {
                debug!("Using pre-configured access token");
                (configured.clone(), TokenSource::Configured)
            }
            (_, Some(login), _) => {
                let exchanged = exchange::exchange_password(
                    self.transport.as_ref(),
                    &self.signer,
                    &self.credentials.consumer,
                    &self.token_url,
                    login,
                )
                .await?;
                (exchanged, TokenSource::Exchanged)
            }
            (None, None, _) => {
                return Err(InstapaperError::Authentication {
                    status: None,
                    message: "no username/password or access token configured".to_string(),
                });
            }
        };

        let expires_at = self
            .clock
            .now()
            .checked_add_signed(self.token_ttl)
            .ok_or_else(|| ConfigError::Invalid {
                setting: "token_ttl",
                reason: "token expiry is out of range".to_string(),
            })?;
        info!(source = ?source, expires_at = %expires_at, "Access token acquired");

        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = Some(SessionToken {
            credentials: credentials.clone(),
            source,
            expires_at: Some(expires_at),
        });

        Ok(credentials)
    }

    /// Drop the cached token after the server rejected `rejected`.
    ///
    /// A token that was already replaced by a concurrent caller is left alone,
    /// so a late 401 cannot wipe a fresh token.
    pub async fn invalidate(&self, rejected: &TokenCredentials) {
        let mut state = self.refresh.lock().await;
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);

        let current = cache
            .as_ref()
            .map(|t| (&t.credentials == rejected, t.source));

        match current {
            Some((true, source)) => {
                if source == TokenSource::Configured && self.credentials.login.is_some() {
                    debug!("Pre-configured access token rejected, falling back to xAuth");
                    state.configured_rejected = true;
                }
                *cache = None;
                debug!("Access token cache cleared");
            }
            Some((false, _)) => debug!("Rejected token already replaced, keeping current token"),
            None => {}
        }
    }

    /// Forget the cached token unconditionally.
    pub async fn clear(&self) {
        let _state = self.refresh.lock().await;
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = None;
        debug!("Access token cache cleared");
    }

    /// Snapshot of the cached token, valid or not.
    pub fn cached(&self) -> Option<SessionToken> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn valid_cached(&self) -> Option<TokenCredentials> {
        let now = self.clock.now();
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|t| t.is_valid_at(now))
            .map(|t| t.credentials.clone())
    }
}
