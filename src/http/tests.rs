use super::*;
use crate::auth::AuthConfig;
use crate::error::{Error, ErrorKind};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_config(server: &MockServer) -> HttpClientConfigBuilder {
    HttpClientConfig::builder()
        .endpoint(format!("{}/graphql", server.uri()))
        .no_throttle()
        .max_retries(2)
        .backoff(Duration::from_millis(1), Duration::from_millis(5))
        .jitter(0.0)
        .rate_limit(RateLimitPolicy {
            buffer: Duration::from_millis(10),
            ..RateLimitPolicy::default()
        })
}

#[derive(Default)]
struct CountingHook {
    calls: AtomicU32,
}

#[async_trait]
impl WaitHook for CountingHook {
    async fn before_wait(&self, _wait: Duration) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Retry Policy
// ============================================================================

#[test]
fn test_retry_policy_defaults() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_retries, 3);
    assert_eq!(policy.initial_backoff, Duration::from_secs(1));
    assert_eq!(policy.max_backoff, Duration::from_secs(30));
    assert!((policy.jitter - 0.1).abs() < f64::EPSILON);
}

#[test]
fn test_exponential_backoff_is_capped() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.base_delay(0), Duration::from_secs(1));
    assert_eq!(policy.base_delay(1), Duration::from_secs(2));
    assert_eq!(policy.base_delay(2), Duration::from_secs(4));
    assert_eq!(policy.base_delay(10), Duration::from_secs(30));
}

#[test]
fn test_jitter_stays_within_bounds() {
    let policy = RetryPolicy::default();
    for _ in 0..100 {
        let delay = policy.delay(1);
        assert!(delay >= Duration::from_millis(1800), "{delay:?}");
        assert!(delay <= Duration::from_millis(2200), "{delay:?}");
    }
}

#[test]
fn test_should_retry() {
    let policy = RetryPolicy::default();
    assert!(policy.should_retry(&Error::network("reset"), 0));
    assert!(!policy.should_retry(&Error::network("reset"), 3));
    assert!(!policy.should_retry(&Error::auth("bad"), 0));
}

// ============================================================================
// Rate Limit Policy
// ============================================================================

#[test]
fn test_rate_limit_info_from_headers() {
    let mut headers = HeaderMap::new();
    headers.insert("x-ratelimit-limit", HeaderValue::from_static("5000"));
    headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
    headers.insert("x-ratelimit-used", HeaderValue::from_static("5000"));
    headers.insert("x-ratelimit-reset", HeaderValue::from_static("1700000000"));

    let info = RateLimitInfo::from_headers(&headers);
    assert_eq!(info.limit, Some(5000));
    assert_eq!(info.remaining, Some(0));
    assert_eq!(info.used, Some(5000));
    assert!(info.is_exhausted());
    assert_eq!(
        info.reset_at,
        Utc.timestamp_opt(1_700_000_000, 0).single()
    );
}

#[test]
fn test_retry_after_wins_over_window_reset() {
    let now = Utc::now();
    let reset = now + chrono::Duration::seconds(3000);
    let info = RateLimitInfo {
        remaining: Some(4000),
        reset_at: Some(reset),
        retry_after: Some(Duration::from_secs(60)),
        ..RateLimitInfo::default()
    };
    assert_eq!(info.resets_at(now), Some(now + chrono::Duration::seconds(60)));

    let info = RateLimitInfo {
        reset_at: Some(reset),
        ..RateLimitInfo::default()
    };
    assert_eq!(info.resets_at(now), Some(reset));
}

#[test]
fn test_secondary_limit_waits_for_retry_after() {
    let now = Utc::now();
    let mut headers = HeaderMap::new();
    headers.insert("x-ratelimit-remaining", HeaderValue::from_static("4000"));
    let reset = (now + chrono::Duration::seconds(3000)).timestamp().to_string();
    headers.insert("x-ratelimit-reset", HeaderValue::from_str(&reset).unwrap());
    headers.insert("retry-after", HeaderValue::from_static("60"));

    let info = RateLimitInfo::from_headers(&headers);
    let err = Error::rate_limited("secondary rate limit", info.resets_at(now));

    assert_eq!(
        RateLimitPolicy::default().plan(&err, 0, now),
        RateLimitAction::WaitFor(Duration::from_secs(61))
    );
}

#[test]
fn test_rate_limit_headers_out_of_range_are_ignored() {
    let mut headers = HeaderMap::new();
    headers.insert("x-ratelimit-limit", HeaderValue::from_static("4294967296"));
    headers.insert("x-ratelimit-remaining", HeaderValue::from_static("12"));

    let info = RateLimitInfo::from_headers(&headers);
    assert_eq!(info.limit, None);
    assert_eq!(info.remaining, Some(12));
}

#[test]
fn test_plan_waits_until_reset_plus_buffer() {
    let policy = RateLimitPolicy::default();
    let now = Utc::now();
    let err = Error::rate_limited("exhausted", Some(now + chrono::Duration::seconds(30)));

    match policy.plan(&err, 0, now) {
        RateLimitAction::WaitFor(wait) => assert_eq!(wait, Duration::from_secs(31)),
        other => panic!("unexpected action {other:?}"),
    }
}

#[test]
fn test_plan_caps_wait_at_one_hour() {
    let policy = RateLimitPolicy::default();
    let now = Utc::now();
    let err = Error::rate_limited("exhausted", Some(now + chrono::Duration::hours(3)));

    assert_eq!(
        policy.plan(&err, 0, now),
        RateLimitAction::WaitFor(Duration::from_secs(3600))
    );
}

#[test]
fn test_plan_fails_fast_or_after_max_waits() {
    let now = Utc::now();
    let err = Error::rate_limited("exhausted", Some(now));

    assert_eq!(
        RateLimitPolicy::fail_fast().plan(&err, 0, now),
        RateLimitAction::Fail
    );
    assert_eq!(
        RateLimitPolicy::default().plan(&err, 10, now),
        RateLimitAction::Fail
    );
}

#[test]
fn test_plan_without_reset_backs_off() {
    let err = Error::rate_limited("secondary limit", None);
    assert_eq!(
        RateLimitPolicy::default().plan(&err, 0, Utc::now()),
        RateLimitAction::Backoff
    );
}

// ============================================================================
// Throttle
// ============================================================================

#[test]
fn test_throttle_config_default() {
    let config = ThrottleConfig::default();
    assert_eq!(config.requests_per_second, 10);
    assert_eq!(config.burst_size, 10);
}

#[tokio::test]
async fn test_throttle_allows_burst_then_blocks() {
    let throttle = Throttle::new(&ThrottleConfig::new(1, 3));

    for _ in 0..3 {
        assert!(throttle.try_acquire());
    }
    assert!(!throttle.try_acquire());
}

#[tokio::test]
async fn test_throttle_zero_rate_is_clamped() {
    let throttle = Throttle::new(&ThrottleConfig::new(0, 0));
    assert!(throttle.try_acquire());
}

// ============================================================================
// Client
// ============================================================================

#[test]
fn test_stage_order() {
    assert_eq!(
        HttpClient::STAGES,
        [Stage::Auth, Stage::SizeLimit, Stage::RateLimit, Stage::Retry]
    );
}

#[test]
fn test_config_defaults() {
    let config = HttpClientConfig::default();
    assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    assert_eq!(config.max_response_bytes, 10 * 1024 * 1024);
    assert!(config.rate_limit.auto_wait);
    assert_eq!(config.throttle, Some(ThrottleConfig::default()));
    assert!(config.user_agent.starts_with("pr-relay/"));
}

#[tokio::test]
async fn test_post_sends_auth_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("authorization", "Bearer sekret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .expect(1)
        .mount(&server)
        .await;

    let client =
        HttpClient::with_auth(fast_config(&server).build(), AuthConfig::bearer("sekret")).unwrap();
    let response = client
        .post(&json!({"query": "{}"}), &CancellationToken::new())
        .await
        .unwrap();

    assert!(response.status.is_success());
    let body: serde_json::Value = response.json().unwrap();
    assert_eq!(body, json!({"data": {}}));
}

#[tokio::test]
async fn test_retries_transient_status_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let client = HttpClient::with_config(fast_config(&server).build()).unwrap();
    let response = client
        .post(&json!({}), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.text_lossy(), "ok");
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_retries_exhausted_keeps_kind() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let client = HttpClient::with_config(fast_config(&server).build()).unwrap();
    let err = client
        .post(&json!({}), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RetriesExhausted { attempts: 3, .. }));
    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad query"))
        .mount(&server)
        .await;

    let client = HttpClient::with_config(fast_config(&server).build()).unwrap();
    let err = client
        .post(&json!({}), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        Error::HttpStatus { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "bad query");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_rate_limit_waits_for_reset_and_calls_hook() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("x-ratelimit-reset", "1"),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let hook = Arc::new(CountingHook::default());
    let client = HttpClient::with_config(fast_config(&server).max_retries(0).build())
        .unwrap()
        .with_wait_hook(hook.clone());

    let response = client.post(&json!({}), &CancellationToken::new()).await;

    // Waiting does not spend a retry
    assert!(response.is_ok());
    assert_eq!(hook.calls.load(Ordering::SeqCst), 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_rate_limit_without_auto_wait_fails_fast() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429).insert_header("x-ratelimit-reset", "4102444800"),
        )
        .mount(&server)
        .await;

    let hook = Arc::new(CountingHook::default());
    let client = HttpClient::with_config(fast_config(&server).auto_wait(false).build())
        .unwrap()
        .with_wait_hook(hook.clone());

    let err = client
        .post(&json!({}), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RateLimit);
    assert!(err.rate_limit_reset().is_some());
    assert_eq!(hook.calls.load(Ordering::SeqCst), 0);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_rate_limit_without_reset_uses_backoff() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client = HttpClient::with_config(fast_config(&server).build()).unwrap();
    let err = client
        .post(&json!({}), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RetriesExhausted { attempts: 3, .. }));
    assert_eq!(err.kind(), ErrorKind::RateLimit);
}

#[tokio::test]
async fn test_oversized_response_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(2048)))
        .mount(&server)
        .await;

    let client =
        HttpClient::with_config(fast_config(&server).max_response_bytes(1024).build()).unwrap();
    let err = client
        .post(&json!({}), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ResponseTooLarge { limit: 1024 }));
    assert_eq!(err.kind(), ErrorKind::Generic);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_cancelled_before_send() {
    let server = MockServer::start().await;
    let client = HttpClient::with_config(fast_config(&server).build()).unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = client.post(&json!({}), &cancel).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cancelled_during_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let client = HttpClient::with_config(fast_config(&server).build()).unwrap();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let err = client.post(&json!({}), &cancel).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_cancelled_during_rate_limit_wait() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "600"))
        .mount(&server)
        .await;

    let client = HttpClient::with_config(fast_config(&server).build()).unwrap();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = client.post(&json!({}), &cancel).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}
