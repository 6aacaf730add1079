use super::*;
use crate::credentials::{ConsumerKeys, PasswordLogin};
use crate::oauth::{ManualClock, RandomNonce};
use crate::transport::{HttpRequest, HttpResponse, ReqwestTransport, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const TOKEN_URL: &str = "https://instapaper.test/api/1/oauth/access_token";

/// Transport double that replays canned responses and records requests.
#[derive(Default)]
struct ScriptedTransport {
    responses: std::sync::Mutex<VecDeque<HttpResponse>>,
    requests: std::sync::Mutex<Vec<HttpRequest>>,
    delay: Option<Duration>,
    /// Number of leading calls that never complete
    hanging_calls: AtomicUsize,
}

impl ScriptedTransport {
    fn new(responses: Vec<HttpResponse>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses.into()),
            ..Default::default()
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn hanging_first(self, calls: usize) -> Self {
        self.hanging_calls.store(calls, Ordering::SeqCst);
        self
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);

        let hang = self
            .hanging_calls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if hang {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| HttpResponse::new(500, "no scripted response")))
    }
}

fn token_body(token: &str, secret: &str) -> HttpResponse {
    HttpResponse::new(
        200,
        format!("oauth_token={}&oauth_token_secret={}", token, secret),
    )
}

fn login_credentials() -> Credentials {
    Credentials::with_login(
        ConsumerKeys::new("ck", "cs"),
        PasswordLogin::new("alice", "hunter2"),
    )
}

fn authenticator(
    credentials: Credentials,
    transport: Arc<dyn Transport>,
    clock: Arc<ManualClock>,
) -> Authenticator {
    Authenticator::new(
        Arc::new(credentials),
        TOKEN_URL,
        chrono::Duration::hours(1),
        transport,
        OAuthSigner::new(clock.clone(), Arc::new(RandomNonce)),
        clock,
    )
}

#[cfg(test)]
mod exchange_tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn exchange_sends_signed_xauth_form() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/1/oauth/access_token")
            .match_header(
                "authorization",
                Matcher::Regex(r#"^OAuth .*oauth_consumer_key="ck""#.to_string()),
            )
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("x_auth_username".into(), "alice".into()),
                Matcher::UrlEncoded("x_auth_password".into(), "hunter2".into()),
                Matcher::UrlEncoded("x_auth_mode".into(), "client_auth".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/x-www-form-urlencoded")
            .with_body("oauth_token=abc%20123&oauth_token_secret=xyz")
            .expect(1)
            .create_async()
            .await;

        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let auth = Authenticator::new(
            Arc::new(login_credentials()),
            format!("{}/api/1/oauth/access_token", server.url()),
            chrono::Duration::hours(1),
            Arc::new(ReqwestTransport::new(Duration::from_secs(5)).unwrap()),
            OAuthSigner::new(clock.clone(), Arc::new(RandomNonce)),
            clock,
        );

        let token = auth.token().await.unwrap();
        assert_eq!(token, TokenCredentials::new("abc 123", "xyz"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn exchange_request_is_two_legged() {
        let transport = Arc::new(ScriptedTransport::new(vec![token_body("t", "s")]));
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let auth = authenticator(login_credentials(), transport.clone(), clock);

        auth.token().await.unwrap();

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, TOKEN_URL);
        assert_eq!(requests[0].method, crate::transport::Method::Post);
        assert!(requests[0].authorization.starts_with("OAuth "));
        assert!(!requests[0].authorization.contains("oauth_token="));
    }

    #[tokio::test]
    async fn failed_exchange_caches_nothing() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            HttpResponse::new(401, "Invalid xAuth credentials."),
            token_body("t", "s"),
        ]));
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let auth = authenticator(login_credentials(), transport.clone(), clock);

        let err = auth.token().await.unwrap_err();
        match err {
            InstapaperError::Authentication { status, message } => {
                assert_eq!(status, Some(401));
                assert!(message.contains("Invalid xAuth credentials."));
            }
            other => panic!("expected authentication error, got {:?}", other),
        }
        assert!(auth.cached().is_none());

        // The next call tries again rather than reusing a broken state
        assert_eq!(auth.token().await.unwrap(), TokenCredentials::new("t", "s"));
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn malformed_exchange_body_is_authentication_error() {
        let transport = Arc::new(ScriptedTransport::new(vec![HttpResponse::new(
            200,
            "<html>maintenance</html>",
        )]));
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let auth = authenticator(login_credentials(), transport, clock);

        let err = auth.token().await.unwrap_err();
        assert!(matches!(err, InstapaperError::Authentication { .. }));
        assert!(auth.cached().is_none());
    }
}

#[cfg(test)]
mod lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn token_is_cached_within_validity_window() {
        let transport = Arc::new(ScriptedTransport::new(vec![token_body("t1", "s1")]));
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let auth = authenticator(login_credentials(), transport.clone(), clock.clone());

        let first = auth.token().await.unwrap();
        clock.advance(chrono::Duration::minutes(59));
        let second = auth.token().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(transport.request_count(), 1);

        let cached = auth.cached().unwrap();
        assert_eq!(cached.source, TokenSource::Exchanged);
        assert_eq!(
            cached.expires_at.unwrap().timestamp(),
            1_700_000_000 + 3600
        );
    }

    #[tokio::test]
    async fn expired_token_is_reacquired() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            token_body("t1", "s1"),
            token_body("t2", "s2"),
        ]));
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let auth = authenticator(login_credentials(), transport.clone(), clock.clone());

        assert_eq!(auth.token().await.unwrap().token, "t1");
        clock.advance(chrono::Duration::minutes(61));
        assert_eq!(auth.token().await.unwrap().token, "t2");
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn out_of_range_expiry_is_an_error() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let clock = Arc::new(ManualClock::new(chrono::DateTime::<chrono::Utc>::MAX_UTC));
        let auth = authenticator(
            Credentials::with_access_token(
                ConsumerKeys::new("ck", "cs"),
                TokenCredentials::new("pre", "pre-secret"),
            ),
            transport,
            clock,
        );

        let err = auth.token().await.unwrap_err();
        assert!(matches!(err, InstapaperError::Config(_)));
        assert!(auth.cached().is_none());
    }

    #[tokio::test]
    async fn configured_token_needs_no_exchange() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let auth = authenticator(
            Credentials::with_access_token(
                ConsumerKeys::new("ck", "cs"),
                TokenCredentials::new("pre", "pre-secret"),
            ),
            transport.clone(),
            clock.clone(),
        );

        assert_eq!(
            auth.token().await.unwrap(),
            TokenCredentials::new("pre", "pre-secret")
        );
        assert_eq!(auth.cached().unwrap().source, TokenSource::Configured);

        // After the validity window it is simply adopted again
        clock.advance(chrono::Duration::hours(2));
        assert_eq!(auth.token().await.unwrap().token, "pre");
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn invalidate_clears_matching_token() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            token_body("t1", "s1"),
            token_body("t2", "s2"),
        ]));
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let auth = authenticator(login_credentials(), transport.clone(), clock);

        let first = auth.token().await.unwrap();
        auth.invalidate(&first).await;
        assert!(auth.cached().is_none());

        let second = auth.token().await.unwrap();
        assert_eq!(second.token, "t2");
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn invalidate_ignores_stale_token() {
        let transport = Arc::new(ScriptedTransport::new(vec![token_body("t1", "s1")]));
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let auth = authenticator(login_credentials(), transport, clock);

        let current = auth.token().await.unwrap();
        auth.invalidate(&TokenCredentials::new("old", "old-secret")).await;

        assert_eq!(auth.cached().unwrap().credentials, current);
    }

    #[tokio::test]
    async fn rejected_configured_token_falls_back_to_login() {
        let transport = Arc::new(ScriptedTransport::new(vec![token_body("fresh", "fresh-secret")]));
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let mut credentials = login_credentials();
        credentials.access_token = Some(TokenCredentials::new("pre", "pre-secret"));
        let auth = authenticator(credentials, transport.clone(), clock);

        let configured = auth.token().await.unwrap();
        assert_eq!(configured.token, "pre");
        assert_eq!(transport.request_count(), 0);

        auth.invalidate(&configured).await;
        let exchanged = auth.token().await.unwrap();
        assert_eq!(exchanged.token, "fresh");
        assert_eq!(auth.cached().unwrap().source, TokenSource::Exchanged);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn clear_forgets_token() {
        let transport = Arc::new(ScriptedTransport::new(vec![token_body("t1", "s1")]));
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let auth = authenticator(login_credentials(), transport, clock);

        auth.token().await.unwrap();
        auth.clear().await;
        assert!(auth.cached().is_none());
    }
}

#[cfg(test)]
mod concurrency_tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_share_one_exchange() {
        let transport = Arc::new(
            ScriptedTransport::new(vec![token_body("shared", "shared-secret")])
                .with_delay(Duration::from_millis(50)),
        );
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let auth = Arc::new(authenticator(login_credentials(), transport.clone(), clock));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let auth = Arc::clone(&auth);
                tokio::spawn(async move { auth.token().await })
            })
            .collect();

        for handle in handles {
            let token = handle.await.unwrap().unwrap();
            assert_eq!(token, TokenCredentials::new("shared", "shared-secret"));
        }
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn cancelled_exchange_releases_lock() {
        let transport = Arc::new(
            ScriptedTransport::new(vec![token_body("after-cancel", "s")]).hanging_first(1),
        );
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let auth = Arc::new(authenticator(login_credentials(), transport.clone(), clock));

        let stuck = {
            let auth = Arc::clone(&auth);
            tokio::spawn(async move { auth.token().await })
        };

        // Let the task reach the hanging exchange, then cancel it
        while transport.request_count() == 0 {
            tokio::task::yield_now().await;
        }
        stuck.abort();
        assert!(stuck.await.unwrap_err().is_cancelled());
        assert!(auth.cached().is_none());

        let token = tokio::time::timeout(Duration::from_secs(1), auth.token())
            .await
            .expect("lock must be released after cancellation")
            .unwrap();
        assert_eq!(token.token, "after-cancel");
        assert_eq!(transport.request_count(), 2);
    }
}
