//! HTTP transport seam.
//!
//! The client never talks to `reqwest` directly: requests are described by
//! [`HttpRequest`] and handed to a [`Transport`]. Production code uses
//! [`ReqwestTransport`]; tests can substitute their own implementation to
//! control timing.

use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// HTTP methods used by the upstream API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully signed request, ready to send.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute URL without query string
    pub url: String,
    /// Value of the `Authorization` header
    pub authorization: String,
    /// Form parameters (request body for POST, query string for GET)
    pub params: Vec<(String, String)>,
}

/// Raw response: status code and body text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport failures: the request did not produce an HTTP response.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Sends signed requests to the upstream API.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
pub struct ReqwestTransport {
    http_client: Client,
}

impl ReqwestTransport {
    /// Build a transport with a bounded per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let http_client = Client::builder()
            .user_agent(concat!("instapaper-bridge/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let builder = match request.method {
            Method::Get => self.http_client.get(&request.url).query(&request.params),
            Method::Post => self.http_client.post(&request.url).form(&request.params),
        };

        let response = builder
            .header(reqwest::header::AUTHORIZATION, &request.authorization)
            .send()
            .await
            .map_err(|e| classify(&request.url, e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| classify(&request.url, e))?;

        Ok(HttpResponse { status, body })
    }
}

fn classify(url: &str, error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else {
        TransportError::Request {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
