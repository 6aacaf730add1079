use chrono::{DateTime, Utc};

use crate::credentials::TokenCredentials;

/// Where a cached token came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenSource {
    /// Pre-provisioned in configuration
    Configured,
    /// Obtained through the xAuth exchange
    Exchanged,
}

/// Access token currently used to sign requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionToken {
    pub credentials: TokenCredentials,
    pub source: TokenSource,
    /// `None` means the token is trusted until the server rejects it
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.credentials.token.is_empty() && self.expires_at.map_or(true, |at| at > now)
    }
}
