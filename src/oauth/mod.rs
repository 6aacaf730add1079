//! OAuth 1.0a request signing (HMAC-SHA1).
//!
//! Implements the signature part of RFC 5849:
//! 1. Collect `oauth_*` protocol parameters plus every request parameter
//! 2. Percent-encode (RFC 3986) and sort them into the normalized string
//! 3. Build `METHOD&base-uri&normalized` and sign it with
//!    `consumer_secret&token_secret`
//! 4. Emit only the `oauth_*` parameters (and the signature) in the header
//!
//! Time and nonces come from injectable sources so fixtures are reproducible.

mod clock;
mod signature;

pub use clock::{Clock, FixedNonce, ManualClock, NonceSource, RandomNonce, SystemClock};
pub use signature::{percent_encode, OAuthSigner};
