//! Authenticated request executor.
//!
//! Every public operation goes through [`InstapaperClient::send`]:
//!
//! ```text
//!   First ──send──▶ 2xx ──────────────────────────▶ Done
//!     │
//!     └── 401 ──▶ invalidate token ──▶ Retry ──send──▶ Done | Api error
//! ```
//!
//! `Retry` has no outgoing 401 edge, so a logical call reaches the network at
//! most twice.

use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::auth::{Authenticator, ACCESS_TOKEN_PATH};
use crate::config::{BridgeConfig, ConfigError};
use crate::credentials::Credentials;
use crate::error::{ErrorCode, InstapaperError};
use crate::model::{decode_items, Item, User};
use crate::oauth::{Clock, NonceSource, OAuthSigner, RandomNonce, SystemClock};
use crate::transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};


const UNAUTHORIZED: u16 = 401;

/// Position in the single-retry sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Attempt {
    First,
    Retry,
}

impl Attempt {
    fn number(self) -> u8 {
        match self {
            Attempt::First => 1,
            Attempt::Retry => 2,
        }
    }
}

/// Signed, authenticated access to the Instapaper API.
///
/// Cheap to share behind an `Arc`; all state lives in the [`Authenticator`].
pub struct InstapaperClient {
    base_url: String,
    credentials: Arc<Credentials>,
    transport: Arc<dyn Transport>,
    signer: OAuthSigner,
    authenticator: Authenticator,
    batch_concurrency: usize,
}

/// Builder for [`InstapaperClient`].
pub struct InstapaperClientBuilder {
    credentials: Credentials,
    base_url: String,
    request_timeout: std::time::Duration,
    token_ttl: chrono::Duration,
    batch_concurrency: usize,
    transport: Option<Arc<dyn Transport>>,
    clock: Arc<dyn Clock>,
    nonces: Arc<dyn NonceSource>,
}

impl InstapaperClientBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn request_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn token_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    pub fn batch_concurrency(mut self, limit: usize) -> Self {
        self.batch_concurrency = limit;
        self
    }

    /// Replace the reqwest transport (tests, custom HTTP stacks).
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn nonce_source(mut self, nonces: Arc<dyn NonceSource>) -> Self {
        self.nonces = nonces;
        self
    }

    pub fn build(self) -> Result<InstapaperClient, InstapaperError> {
        if self.token_ttl <= chrono::Duration::zero() {
            return Err(ConfigError::Invalid {
                setting: "token_ttl",
                reason: "must be positive".to_string(),
            }
            .into());
        }

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(self.request_timeout)?),
        };

        let base_url = if self.base_url.ends_with('/') {
            self.base_url
        } else {
            format!("{}/", self.base_url)
        };

        let credentials = Arc::new(self.credentials);
        let signer = OAuthSigner::new(self.clock.clone(), self.nonces);
        let authenticator = Authenticator::new(
            credentials.clone(),
            format!("{}{}", base_url, ACCESS_TOKEN_PATH),
            self.token_ttl,
            transport.clone(),
            signer.clone(),
            self.clock,
        );

        Ok(InstapaperClient {
            base_url,
            credentials,
            transport,
            signer,
            authenticator,
            batch_concurrency: self.batch_concurrency.max(1),
        })
    }
}

impl InstapaperClient {
    pub fn builder(credentials: Credentials) -> InstapaperClientBuilder {
        let defaults = crate::config::ApiConfig::default();
        InstapaperClientBuilder {
            credentials,
            base_url: defaults.base_url.clone(),
            request_timeout: defaults.request_timeout(),
            token_ttl: chrono::Duration::seconds(crate::config::DEFAULT_TOKEN_TTL_SECONDS),
            batch_concurrency: defaults.batch_concurrency,
            transport: None,
            clock: Arc::new(SystemClock),
            nonces: Arc::new(RandomNonce),
        }
    }

    /// Validate credentials and build a client with the reqwest transport.
    pub fn from_config(config: &BridgeConfig) -> Result<Self, InstapaperError> {
        let credentials = config.credentials.resolve()?;
        Self::builder(credentials)
            .base_url(config.api.base_url.clone())
            .request_timeout(config.api.request_timeout())
            .token_ttl(config.api.token_ttl()?)
            .batch_concurrency(config.api.batch_concurrency)
            .build()
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn batch_concurrency(&self) -> usize {
        self.batch_concurrency
    }

    fn endpoint_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Execute one logical call, re-authenticating once on 401.
    ///
    /// `params` travel as the form body for POST and as the query string for
    /// GET; either way they are part of the signature. Returns the raw 2xx
    /// response. Non-success statuses become [`InstapaperError::Api`] built
    /// from the final attempt.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
    ) -> Result<HttpResponse, InstapaperError> {
        let url = self.endpoint_url(path);
        let mut attempt = Attempt::First;

        loop {
            let token = self.authenticator.token().await?;
            let authorization = self.signer.authorization_header(
                method,
                &url,
                &self.credentials.consumer,
                Some(&token),
                params,
            );

            let response = self
                .transport
                .send(HttpRequest {
                    method,
                    url: url.clone(),
                    authorization,
                    params: params.to_vec(),
                })
                .await?;

            debug!(
                path,
                %method,
                status = response.status,
                attempt = attempt.number(),
                "API response"
            );

            if response.is_success() {
                return Ok(response);
            }

            if response.status == UNAUTHORIZED {
                self.authenticator.invalidate(&token).await;
                if attempt == Attempt::First {
                    warn!(path, "Request rejected as unauthorized, re-authenticating");
                    attempt = Attempt::Retry;
                    continue;
                }
            }

            return Err(api_error(&response));
        }
    }

    /// [`send`](Self::send) and decode the JSON item array.
    ///
    /// An `error` item inside a success response is surfaced as
    /// [`InstapaperError::Api`].
    pub async fn send_items(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
    ) -> Result<Vec<Item>, InstapaperError> {
        let response = self.send(method, path, params).await?;

        if response.body.trim().is_empty() {
            return Err(InstapaperError::decode(path, "empty response body"));
        }

        let items =
            decode_items(&response.body).map_err(|e| InstapaperError::decode(path, e.to_string()))?;

        if let Some(Item::Error(err)) = items.iter().find(|item| matches!(item, Item::Error(_))) {
            return Err(InstapaperError::Api {
                status: response.status,
                code: err.error_code,
                message: err.message.clone(),
            });
        }

        Ok(items)
    }

    /// [`send`](Self::send) for endpoints that answer with plain text or HTML.
    pub async fn send_text(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
    ) -> Result<String, InstapaperError> {
        let response = self.send(method, path, params).await?;
        if response.body.trim().is_empty() {
            return Err(InstapaperError::decode(path, "empty response body"));
        }
        Ok(response.body)
    }

    /// The account the current token belongs to.
    pub async fn verify_credentials(&self) -> Result<User, InstapaperError> {
        let path = "account/verify_credentials";
        self.send_items(Method::Post, path, &[])
            .await?
            .into_iter()
            .find_map(|item| match item {
                Item::User(user) => Some(user),
                _ => None,
            })
            .ok_or_else(|| InstapaperError::decode(path, "response contained no user"))
    }
}

/// Build an API error from a failed response, preferring the structured
/// `error` item and falling back to the raw body.
fn api_error(response: &HttpResponse) -> InstapaperError {
    let structured = decode_items(&response.body).ok().and_then(|items| {
        items.into_iter().find_map(|item| match item {
            Item::Error(err) => Some(err),
            _ => None,
        })
    });

    match structured {
        Some(err) => InstapaperError::Api {
            status: response.status,
            code: err.error_code,
            message: err.message,
        },
        None => {
            let body = response.body.trim();
            InstapaperError::Api {
                status: response.status,
                code: ErrorCode::Unknown,
                message: if body.is_empty() {
                    format!("HTTP {}", response.status)
                } else {
                    body.to_string()
                },
            }
        }
    }
}

/// Run `operation` until it completes or `cancel` fires.
///
/// Dropping the operation aborts its in-flight request and releases any lock
/// it holds. Cancellation is reported as [`InstapaperError::Cancelled`]
/// converted into the operation's error type.
pub async fn with_cancellation<T, E, F>(cancel: &CancellationToken, operation: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<InstapaperError>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(InstapaperError::Cancelled.into()),
        result = operation => result,
    }
}
