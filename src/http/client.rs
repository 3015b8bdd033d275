//! HTTP client with the transport stages composed in fixed order
//!
//! Provides a client that handles:
//! - Authentication on every attempt
//! - A hard ceiling on response size
//! - Waiting out rate limits (or failing fast when auto-wait is off)
//! - Retries with jittered exponential backoff
//! - Cancellation at every await point

use super::body::{read_limited, TransportResponse, DEFAULT_MAX_RESPONSE_BYTES};
use super::rate_limit::{RateLimitAction, RateLimitInfo, RateLimitPolicy, WaitHook};
use super::retry::RetryPolicy;
use super::throttle::{Throttle, ThrottleConfig};
use crate::auth::{AuthConfig, Authenticator};
use crate::error::{Error, ErrorKind, Result};
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default GraphQL endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.github.com/graphql";

/// A transport stage, listed innermost first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Attach credentials
    Auth,
    /// Enforce the response size ceiling
    SizeLimit,
    /// Wait out or surface rate limits
    RateLimit,
    /// Retry transient failures
    Retry,
}

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// URL every request is posted to
    pub endpoint: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retry stage settings
    pub retry: RetryPolicy,
    /// Rate-limit stage settings
    pub rate_limit: RateLimitPolicy,
    /// Client-side pacing, if any
    pub throttle: Option<ThrottleConfig>,
    /// Response body ceiling in bytes
    pub max_response_bytes: u64,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            rate_limit: RateLimitPolicy::default(),
            throttle: Some(ThrottleConfig::default()),
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            default_headers: HashMap::new(),
            user_agent: format!("pr-relay/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the endpoint URL
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set max retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.retry.max_retries = retries;
        self
    }

    /// Set backoff configuration
    pub fn backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.config.retry.initial_backoff = initial;
        self.config.retry.max_backoff = max;
        self
    }

    /// Set the jitter fraction
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.config.retry.jitter = jitter;
        self
    }

    /// Replace the rate-limit policy
    pub fn rate_limit(mut self, policy: RateLimitPolicy) -> Self {
        self.config.rate_limit = policy;
        self
    }

    /// Toggle waiting for rate-limit resets
    pub fn auto_wait(mut self, enabled: bool) -> Self {
        self.config.rate_limit.auto_wait = enabled;
        self
    }

    /// Set client-side pacing
    pub fn throttle(mut self, config: ThrottleConfig) -> Self {
        self.config.throttle = Some(config);
        self
    }

    /// Disable client-side pacing
    pub fn no_throttle(mut self) -> Self {
        self.config.throttle = None;
        self
    }

    /// Set the response size ceiling
    pub fn max_response_bytes(mut self, limit: u64) -> Self {
        self.config.max_response_bytes = limit;
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// HTTP client running every request through the transport stages
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    authenticator: Authenticator,
    throttle: Option<Throttle>,
    wait_hook: Option<Arc<dyn WaitHook>>,
}

impl HttpClient {
    /// Stage composition order, innermost first
    pub const STAGES: [Stage; 4] = [Stage::Auth, Stage::SizeLimit, Stage::RateLimit, Stage::Retry];

    /// Create a client without credentials
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        Self::with_auth(config, AuthConfig::None)
    }

    /// Create a client with credentials
    pub fn with_auth(config: HttpClientConfig, auth: AuthConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let authenticator = Authenticator::new(auth).with_user_agent(config.user_agent.clone());
        let throttle = config.throttle.as_ref().map(Throttle::new);

        Ok(Self {
            client,
            config,
            authenticator,
            throttle,
            wait_hook: None,
        })
    }

    /// Run `hook` before every rate-limit wait
    #[must_use]
    pub fn with_wait_hook(mut self, hook: Arc<dyn WaitHook>) -> Self {
        self.wait_hook = Some(hook);
        self
    }

    /// Set or replace the wait hook
    pub fn set_wait_hook(&mut self, hook: Arc<dyn WaitHook>) {
        self.wait_hook = Some(hook);
    }

    /// Get the client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Post `payload`, failing on non-success statuses
    pub async fn post(
        &self,
        payload: &Value,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse> {
        self.execute(payload, cancel, check_status).await
    }

    /// Post `payload` through every stage, classifying each response with `decode`
    ///
    /// `decode` turns a fully read response into a value or a classified
    /// error. Rate-limit errors are handed to the rate-limit stage, retryable
    /// errors to the retry stage; everything else is returned as is.
    pub async fn execute<T, F>(
        &self,
        payload: &Value,
        cancel: &CancellationToken,
        decode: F,
    ) -> Result<T>
    where
        F: Fn(TransportResponse) -> Result<T>,
    {
        let retry = &self.config.retry;
        let mut attempt = 0;
        let mut waits = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            if let Some(ref throttle) = self.throttle {
                tokio::select! {
                    () = cancel.cancelled() => return Err(Error::Cancelled),
                    () = throttle.wait() => {}
                }
            }

            let err = match self.send_once(payload, cancel).await.and_then(&decode) {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if err.kind() == ErrorKind::Cancelled {
                return Err(err);
            }

            if err.kind() == ErrorKind::RateLimit {
                match self.config.rate_limit.plan(&err, waits, Utc::now()) {
                    RateLimitAction::Fail => return Err(err),
                    RateLimitAction::WaitFor(wait) => {
                        waits += 1;
                        warn!(
                            "Rate limited, waiting {:?} before retrying (wait {}/{})",
                            wait, waits, self.config.rate_limit.max_waits
                        );
                        if let Some(ref hook) = self.wait_hook {
                            hook.before_wait(wait).await;
                        }
                        sleep_or_cancel(wait, cancel).await?;
                        continue;
                    }
                    RateLimitAction::Backoff => {}
                }
            }

            if !err.is_retryable() {
                return Err(err);
            }

            if attempt >= retry.max_retries {
                return Err(Error::RetriesExhausted {
                    attempts: attempt + 1,
                    source: Box::new(err),
                });
            }

            let delay = retry.delay(attempt);
            warn!(
                "Request failed ({}), attempt {}/{}, retrying in {:?}",
                err,
                attempt + 1,
                retry.max_retries + 1,
                delay
            );
            sleep_or_cancel(delay, cancel).await?;
            attempt += 1;
        }
    }

    /// One attempt through the auth and size-limit stages
    async fn send_once(
        &self,
        payload: &Value,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse> {
        let mut req = self.client.post(&self.config.endpoint).json(payload);
        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }
        req = self.authenticator.apply(req);

        let exchange = async {
            let response = req.send().await?;
            let status = response.status();
            let rate_limit = RateLimitInfo::from_headers(response.headers());
            let body = read_limited(response, self.config.max_response_bytes).await?;
            debug!(
                status = status.as_u16(),
                bytes = body.len(),
                remaining = ?rate_limit.remaining,
                "Response received"
            );
            Ok(TransportResponse {
                status,
                rate_limit,
                body,
            })
        };

        tokio::select! {
            () = cancel.cancelled() => Err(Error::Cancelled),
            result = exchange => result,
        }
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("authenticator", &self.authenticator)
            .finish_non_exhaustive()
    }
}

/// Generic status classification for non-GraphQL callers
pub fn check_status(response: TransportResponse) -> Result<TransportResponse> {
    if response.status.is_success() {
        return Ok(response);
    }

    let status = response.status.as_u16();
    if status == 429 || (status == 403 && response.rate_limit.is_exhausted()) {
        return Err(Error::rate_limited(
            format!("HTTP {status}"),
            response.rate_limit.resets_at(Utc::now()),
        ));
    }

    Err(Error::http_status(status, response.text_lossy()))
}

/// Sleep for `duration` unless cancelled first
pub async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        () = cancel.cancelled() => Err(Error::Cancelled),
        () = tokio::time::sleep(duration) => Ok(()),
    }
}
