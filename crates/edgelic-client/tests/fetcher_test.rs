//! Contract tests for LicenseClient against a mock licensing server.
//!
//! | Behaviour | Test |
//! |-----------|------|
//! | POST form `nonce` + `key`, `Accept: application/jwt` | `fetch_sends_form_and_accept_header` |
//! | fresh nonce per call | `each_fetch_uses_a_fresh_nonce` |
//! | retry on 5xx / 4xx, then succeed | `retries_until_success` |
//! | give up after 1 + 3 attempts | `surfaces_last_failure_after_retries` |
//! | transport failure | `unreachable_server_is_http_error` |
//! | cancellation | `cancellation_interrupts_slow_request` |

use std::time::Duration;

use edgelic_client::{FetchError, LicenseClient, LicenseSource, LicensingServerConfig};
use edgelic_core::cancel_pair;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn test_client(server_url: &str) -> LicenseClient {
    let config = LicensingServerConfig::new(server_url)
        .unwrap()
        .with_timeout_secs(5)
        .with_retry_delays(vec![
            Duration::from_millis(5),
            Duration::from_millis(10),
            Duration::from_millis(20),
        ]);
    LicenseClient::new(config).unwrap()
}

fn form_field(request: &Request, name: &str) -> Option<String> {
    let body = String::from_utf8(request.body.clone()).ok()?;
    url::form_urlencoded::parse(body.as_bytes())
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

#[tokio::test]
async fn fetch_sends_form_and_accept_header() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/license"))
        .and(header("accept", "application/jwt"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("key=LICENSE-KEY-123"))
        .and(body_string_contains("nonce="))
        .respond_with(ResponseTemplate::new(200).set_body_string("aaa.bbb.ccc\n"))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&format!("{}/license", server.uri()));
    let (_handle, cancel) = cancel_pair();
    let fetched = client.fetch("LICENSE-KEY-123", &cancel).await.unwrap();

    assert_eq!(fetched.token.as_str(), "aaa.bbb.ccc");
    let nonce = fetched.nonce.expect("online fetch binds a nonce");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(form_field(&requests[0], "nonce").as_deref(), Some(nonce.as_str()));
    assert!(uuid::Uuid::parse_str(&nonce).is_ok());
}

#[tokio::test]
async fn each_fetch_uses_a_fresh_nonce() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("t.o.k"))
        .expect(2)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let (_handle, cancel) = cancel_pair();
    let first = client.fetch_license("k", &cancel).await.unwrap();
    let second = client.fetch_license("k", &cancel).await.unwrap();

    assert_ne!(first.nonce, second.nonce);
}

/// Fails the first `failures` requests, then returns a token.
struct FlakyResponder {
    failures: usize,
    calls: std::sync::atomic::AtomicUsize,
}

impl Respond for FlakyResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self
            .calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        match n {
            n if n >= self.failures => ResponseTemplate::new(200).set_body_string("x.y.z"),
            0 => ResponseTemplate::new(503).set_body_string("unavailable"),
            _ => ResponseTemplate::new(429).set_body_string("slow down"),
        }
    }
}

#[tokio::test]
async fn retries_until_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(FlakyResponder {
            failures: 2,
            calls: Default::default(),
        })
        .expect(3)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let (_handle, cancel) = cancel_pair();
    let fetched = client.fetch_license("k", &cancel).await.unwrap();
    assert_eq!(fetched.token.as_str(), "x.y.z");

    // All attempts of one fetch carry the same nonce.
    let requests = server.received_requests().await.unwrap();
    let nonces: Vec<_> = requests.iter().map(|r| form_field(r, "nonce")).collect();
    assert!(nonces.iter().all(|n| n == &nonces[0]));
    assert_eq!(nonces[0], fetched.nonce);
}

#[tokio::test]
async fn surfaces_last_failure_after_retries() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("unknown license key"))
        .expect(4)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let (_handle, cancel) = cancel_pair();
    let err = client.fetch_license("k", &cancel).await.unwrap_err();

    match err {
        FetchError::Status { status, body, .. } => {
            assert_eq!(status, 403);
            assert_eq!(body, "unknown license key");
        }
        other => panic!("expected Status, got: {other:?}"),
    }
}

#[tokio::test]
async fn empty_body_is_a_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("  "))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let (_handle, cancel) = cancel_pair();
    let err = client.fetch_license("k", &cancel).await.unwrap_err();
    assert!(matches!(err, FetchError::EmptyLicense { .. }), "got {err:?}");
}

#[tokio::test]
async fn unreachable_server_is_http_error() {
    // Guaranteed-closed port: connection refused on every attempt.
    let client = test_client("http://127.0.0.1:1/");
    let (_handle, cancel) = cancel_pair();
    let err = client.fetch_license("k", &cancel).await.unwrap_err();
    assert!(matches!(err, FetchError::Http { .. }), "got {err:?}");
}

#[tokio::test]
async fn cancellation_interrupts_slow_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late.token.value")
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let (handle, cancel) = cancel_pair();

    let fetch = tokio::spawn(async move { client.fetch_license("k", &cancel).await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.cancel();

    let result = tokio::time::timeout(Duration::from_secs(2), fetch)
        .await
        .expect("cancelled fetch must return promptly")
        .unwrap();
    assert!(result.unwrap_err().is_cancelled());
}
