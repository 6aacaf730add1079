//! Signed, authenticated access to the Instapaper API.
//!
//! [`InstapaperClient`] signs every call with OAuth 1.0a (HMAC-SHA1), keeps a
//! single shared access token alive, re-authenticates once when a call is
//! rejected with 401, and assembles paginated bookmark listings.

// Configuration and credentials
pub mod config;
pub mod credentials;

// OAuth 1.0a signing and token lifecycle
pub mod auth;
pub mod oauth;

// HTTP seam and request executor
pub mod client;
pub mod transport;

// API surface
pub mod bookmarks;
pub mod folders;
pub mod model;

pub mod error;

pub use bookmarks::{ListBookmarks, ManageOutcome, NewBookmark};
pub use client::{with_cancellation, InstapaperClient, InstapaperClientBuilder};
pub use config::{load_config, BridgeConfig};
pub use error::{ErrorCode, InstapaperError};
pub use model::{Bookmark, BookmarkAction, Folder, User};
