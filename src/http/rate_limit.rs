//! Rate limit detection and wait policy
//!
//! Parses the source's rate-limit headers and decides, for a classified
//! rate-limit error, whether to sleep until reset, back off, or fail.

use crate::error::Error;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::HeaderMap;
use std::time::Duration;

/// Rate limit state reported by the source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Maximum requests in the window
    pub limit: Option<u32>,
    /// Requests left in the window
    pub remaining: Option<u32>,
    /// Requests used in the window
    pub used: Option<u32>,
    /// When the window resets
    pub reset_at: Option<DateTime<Utc>>,
    /// Server-requested delay
    pub retry_after: Option<Duration>,
}

impl RateLimitInfo {
    /// Parse `x-ratelimit-*` and `retry-after` headers
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            limit: header_value(headers, "x-ratelimit-limit"),
            remaining: header_value(headers, "x-ratelimit-remaining"),
            used: header_value(headers, "x-ratelimit-used"),
            reset_at: header_value::<i64>(headers, "x-ratelimit-reset")
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
            retry_after: header_value(headers, "retry-after").map(Duration::from_secs),
        }
    }

    /// Whether the window is used up
    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    /// When requests may resume; retry-after wins over the window reset
    pub fn resets_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.retry_after
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .map(|d| now + d)
            .or(self.reset_at)
    }
}

fn header_value<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

/// What to do about a rate-limit error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitAction {
    /// Surface the error
    Fail,
    /// Sleep, then re-issue the same request without spending a retry
    WaitFor(Duration),
    /// No reset time known; leave it to the retry stage
    Backoff,
}

/// Rate limit wait policy
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    /// Sleep until reset instead of failing
    pub auto_wait: bool,
    /// Maximum number of waits per request
    pub max_waits: u32,
    /// Added to every wait to land after the reset
    pub buffer: Duration,
    /// Upper bound for a single wait
    pub max_wait: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            auto_wait: true,
            max_waits: 10,
            buffer: Duration::from_secs(1),
            max_wait: Duration::from_secs(60 * 60),
        }
    }
}

impl RateLimitPolicy {
    /// Policy that never waits
    pub fn fail_fast() -> Self {
        Self {
            auto_wait: false,
            ..Self::default()
        }
    }

    /// Decide how to handle a rate-limit error after `waits` prior waits
    pub fn plan(&self, err: &Error, waits: u32, now: DateTime<Utc>) -> RateLimitAction {
        if !self.auto_wait || waits >= self.max_waits {
            return RateLimitAction::Fail;
        }

        match err.rate_limit_reset() {
            Some(reset_at) => {
                let until_reset = (reset_at - now).to_std().unwrap_or(Duration::ZERO);
                RateLimitAction::WaitFor((until_reset + self.buffer).min(self.max_wait))
            }
            None => RateLimitAction::Backoff,
        }
    }
}

/// Called before a rate-limit wait; used to persist progress
#[async_trait]
pub trait WaitHook: Send + Sync {
    /// Best-effort work to do before sleeping for `wait`
    async fn before_wait(&self, wait: Duration);
}
