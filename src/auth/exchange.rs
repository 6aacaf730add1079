//! xAuth token exchange.
//!
//! Trades username and password for an access token in a single 2-legged
//! signed POST. The response is form-encoded text, not JSON:
//! `oauth_token=...&oauth_token_secret=...`.

use serde::Deserialize;

use crate::credentials::{ConsumerKeys, PasswordLogin, TokenCredentials};
use crate::error::InstapaperError;
use crate::oauth::OAuthSigner;
use crate::transport::{HttpRequest, Method, Transport};

/// Token endpoint path relative to the API base URL.
pub const ACCESS_TOKEN_PATH: &str = "oauth/access_token";

/// Form-encoded token response
#[derive(Deserialize, Debug)]
struct TokenResponse {
    oauth_token: String,
    oauth_token_secret: String,
}

/// Exchange username and password for access token credentials.
///
/// Any failure, transport included, is reported as
/// [`InstapaperError::Authentication`].
pub(crate) async fn exchange_password(
    transport: &dyn Transport,
    signer: &OAuthSigner,
    consumer: &ConsumerKeys,
    token_url: &str,
    login: &PasswordLogin,
) -> Result<TokenCredentials, InstapaperError> {
    let params = vec![
        ("x_auth_username".to_string(), login.username.clone()),
        ("x_auth_password".to_string(), login.password.clone()),
        ("x_auth_mode".to_string(), "client_auth".to_string()),
    ];

    let authorization = signer.authorization_header(Method::Post, token_url, consumer, None, &params);

    tracing::debug!("Requesting access token via xAuth");

    let response = transport
        .send(HttpRequest {
            method: Method::Post,
            url: token_url.to_string(),
            authorization,
            params,
        })
        .await
        .map_err(|e| InstapaperError::Authentication {
            status: None,
            message: format!("token exchange request failed: {}", e),
        })?;

    if !response.is_success() {
        return Err(InstapaperError::Authentication {
            status: Some(response.status),
            message: format!(
                "token exchange failed with status {}: {}",
                response.status,
                response.body.trim()
            ),
        });
    }

    parse_token_response(&response.body)
}

/// Parse `oauth_token=...&oauth_token_secret=...` (percent-decoded).
pub(crate) fn parse_token_response(body: &str) -> Result<TokenCredentials, InstapaperError> {
    let parsed: TokenResponse =
        serde_urlencoded::from_str(body.trim()).map_err(|e| InstapaperError::Authentication {
            status: None,
            message: format!("malformed token response: {}", e),
        })?;

    if parsed.oauth_token.is_empty() || parsed.oauth_token_secret.is_empty() {
        return Err(InstapaperError::Authentication {
            status: None,
            message: "token response contained an empty token".to_string(),
        });
    }

    Ok(TokenCredentials::new(parsed.oauth_token, parsed.oauth_token_secret))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_parsing() {
        let creds = parse_token_response("oauth_token=abc123&oauth_token_secret=s%2Fe%3Dcret").unwrap();
        assert_eq!(creds, TokenCredentials::new("abc123", "s/e=cret"));
    }

    #[test]
    fn test_token_response_field_order_and_whitespace() {
        let creds = parse_token_response("oauth_token_secret=two&oauth_token=one\n").unwrap();
        assert_eq!(creds, TokenCredentials::new("one", "two"));
    }

    #[test]
    fn test_token_response_missing_secret() {
        let err = parse_token_response("oauth_token=abc123").unwrap_err();
        assert!(matches!(err, InstapaperError::Authentication { .. }));
    }

    #[test]
    fn test_token_response_empty_values() {
        let err = parse_token_response("oauth_token=&oauth_token_secret=").unwrap_err();
        assert!(err.to_string().contains("empty token"));
    }
}
