//! Error taxonomy for the Instapaper client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::transport::TransportError;

/// Errors returned by every public client operation.
#[derive(Debug, Error)]
pub enum InstapaperError {
    /// Required credentials are missing or malformed.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The xAuth token exchange failed. Nothing was cached.
    #[error("authentication failed: {message}")]
    Authentication {
        /// HTTP status of the token endpoint, `None` when the request never completed
        status: Option<u16>,
        message: String,
    },

    /// Upstream returned a structured error or a non-success status.
    #[error("Instapaper API error ({status}): {message}")]
    Api {
        status: u16,
        code: ErrorCode,
        message: String,
    },

    /// A success response had an empty or undecodable body.
    #[error("failed to decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    /// The caller supplied arguments the operation cannot send.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The caller cancelled the operation before it completed.
    #[error("operation cancelled")]
    Cancelled,
}

impl InstapaperError {
    pub(crate) fn decode(endpoint: &str, message: impl Into<String>) -> Self {
        InstapaperError::Decode {
            endpoint: endpoint.to_string(),
            message: message.into(),
        }
    }

    /// Upstream error code, when the error came from the API.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            InstapaperError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// HTTP status of the failing response, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            InstapaperError::Api { status, .. } => Some(*status),
            InstapaperError::Authentication { status, .. } => *status,
            _ => None,
        }
    }
}

/// Instapaper API error codes carried in `{"type": "error", "error_code": ...}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum ErrorCode {
    /// No structured error payload was available.
    Unknown,
    RateLimitExceeded,
    PremiumRequired,
    ApplicationSuspended,
    InvalidOAuthRequest,
    InvalidConsumerKey,
    InvalidAccessToken,
    InvalidBookmarkUrl,
    DuplicateBookmark,
    InvalidBookmarkId,
    BookmarkNotFound,
    FolderNotFound,
    InvalidFolder,
    BookmarkAlreadyStarred,
    BookmarkAlreadyArchived,
    InvalidFolderTitle,
    FolderAlreadyExists,
    ServiceError,
    TextGenerationFailed,
    Other(i64),
}

impl From<i64> for ErrorCode {
    fn from(code: i64) -> Self {
        match code {
            0 => ErrorCode::Unknown,
            1040 => ErrorCode::RateLimitExceeded,
            1041 => ErrorCode::PremiumRequired,
            1042 => ErrorCode::ApplicationSuspended,
            1100 => ErrorCode::InvalidOAuthRequest,
            1101 => ErrorCode::InvalidConsumerKey,
            1102 => ErrorCode::InvalidAccessToken,
            1220 => ErrorCode::InvalidBookmarkUrl,
            1221 => ErrorCode::DuplicateBookmark,
            1240 => ErrorCode::InvalidBookmarkId,
            1241 => ErrorCode::BookmarkNotFound,
            1242 => ErrorCode::FolderNotFound,
            1243 => ErrorCode::InvalidFolder,
            1245 => ErrorCode::BookmarkAlreadyStarred,
            1246 => ErrorCode::BookmarkAlreadyArchived,
            1250 => ErrorCode::InvalidFolderTitle,
            1251 => ErrorCode::FolderAlreadyExists,
            1500 => ErrorCode::ServiceError,
            1550 => ErrorCode::TextGenerationFailed,
            other => ErrorCode::Other(other),
        }
    }
}

impl From<ErrorCode> for i64 {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::Unknown => 0,
            ErrorCode::RateLimitExceeded => 1040,
            ErrorCode::PremiumRequired => 1041,
            ErrorCode::ApplicationSuspended => 1042,
            ErrorCode::InvalidOAuthRequest => 1100,
            ErrorCode::InvalidConsumerKey => 1101,
            ErrorCode::InvalidAccessToken => 1102,
            ErrorCode::InvalidBookmarkUrl => 1220,
            ErrorCode::DuplicateBookmark => 1221,
            ErrorCode::InvalidBookmarkId => 1240,
            ErrorCode::BookmarkNotFound => 1241,
            ErrorCode::FolderNotFound => 1242,
            ErrorCode::InvalidFolder => 1243,
            ErrorCode::BookmarkAlreadyStarred => 1245,
            ErrorCode::BookmarkAlreadyArchived => 1246,
            ErrorCode::InvalidFolderTitle => 1250,
            ErrorCode::FolderAlreadyExists => 1251,
            ErrorCode::ServiceError => 1500,
            ErrorCode::TextGenerationFailed => 1550,
            ErrorCode::Other(code) => code,
        }
    }
}
