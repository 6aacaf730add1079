use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::clock::{Clock, NonceSource, RandomNonce, SystemClock};
use crate::credentials::{ConsumerKeys, TokenCredentials};
use crate::transport::Method;

type HmacSha1 = Hmac<Sha1>;

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";

/// Builds OAuth 1.0a `Authorization` headers signed with HMAC-SHA1.
///
/// Every call draws a fresh nonce and timestamp, so no two headers are alike
/// unless both sources are pinned (fixtures only).
#[derive(Clone)]
pub struct OAuthSigner {
    clock: Arc<dyn Clock>,
    nonces: Arc<dyn NonceSource>,
}

impl Default for OAuthSigner {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), Arc::new(RandomNonce))
    }
}

impl OAuthSigner {
    pub fn new(clock: Arc<dyn Clock>, nonces: Arc<dyn NonceSource>) -> Self {
        Self { clock, nonces }
    }

    /// Produce the `Authorization` header value for one request.
    ///
    /// `params` are the form or query parameters that will be sent; they take
    /// part in the signature but are not copied into the header. Pass `None`
    /// for `token` to sign a 2-legged request (the xAuth exchange itself). A
    /// token with an empty key is treated the same as `None`.
    pub fn authorization_header(
        &self,
        method: Method,
        uri: &str,
        consumer: &ConsumerKeys,
        token: Option<&TokenCredentials>,
        params: &[(String, String)],
    ) -> String {
        let token = token.filter(|t| !t.token.is_empty());

        let mut oauth = BTreeMap::new();
        oauth.insert("oauth_consumer_key", consumer.key.clone());
        oauth.insert("oauth_nonce", self.nonces.nonce());
        oauth.insert("oauth_signature_method", SIGNATURE_METHOD.to_string());
        oauth.insert("oauth_timestamp", self.clock.now().timestamp().to_string());
        oauth.insert("oauth_version", OAUTH_VERSION.to_string());
        if let Some(token) = token {
            oauth.insert("oauth_token", token.token.clone());
        }

        let base = signature_base_string(method, uri, &oauth, params);
        let signature = sign(&base, &consumer.secret, token.map(|t| t.secret.as_str()));
        oauth.insert("oauth_signature", signature);

        let fields: Vec<String> = oauth
            .iter()
            .map(|(key, value)| format!("{}=\"{}\"", key, percent_encode(value)))
            .collect();
        format!("OAuth {}", fields.join(", "))
    }
}

/// `METHOD&encoded-base-uri&encoded-normalized-parameters`
pub(crate) fn signature_base_string(
    method: Method,
    uri: &str,
    oauth: &BTreeMap<&str, String>,
    params: &[(String, String)],
) -> String {
    let mut pairs: Vec<(String, String)> = oauth
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .chain(
            params
                .iter()
                .map(|(k, v)| (percent_encode(k), percent_encode(v))),
        )
        .collect();
    pairs.sort();

    let normalized = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.as_str(),
        percent_encode(base_uri(uri)),
        percent_encode(&normalized)
    )
}

/// Base64(HMAC-SHA1(`consumer_secret&token_secret`, base string))
pub(crate) fn sign(base: &str, consumer_secret: &str, token_secret: Option<&str>) -> String {
    let key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret.unwrap_or_default())
    );
    let mut mac = HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC accepts any key length");
    mac.update(base.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// RFC 3986 percent-encoding: everything except `A-Z a-z 0-9 - . _ ~`.
///
/// Stricter than form encoding, `!'()*` included.
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// URI without query string or fragment.
fn base_uri(uri: &str) -> &str {
    uri.split(['?', '#']).next().unwrap_or(uri)
}
