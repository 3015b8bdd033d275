//! HTTP transport module
//!
//! Provides the transport policy wrapped around every outbound call.
//!
//! # Stages
//!
//! Each request passes through a fixed sequence of stages, innermost first:
//!
//! 1. **Auth** - credentials and user agent ([`crate::auth::Authenticator`])
//! 2. **Size limit** - the response body is read under a hard byte ceiling
//! 3. **Rate limit** - rate-limit signals become a wait until reset, or a
//!    classified error when auto-wait is off
//! 4. **Retry** - transient failures are retried with jittered exponential
//!    backoff up to a fixed ceiling
//!
//! Client-side pacing (a token bucket) runs before every attempt.

mod body;
mod client;
mod rate_limit;
mod retry;
mod throttle;

pub use body::{read_limited, TransportResponse, DEFAULT_MAX_RESPONSE_BYTES};
pub use client::{
    check_status, sleep_or_cancel, HttpClient, HttpClientConfig, HttpClientConfigBuilder, Stage,
    DEFAULT_ENDPOINT,
};
pub use rate_limit::{RateLimitAction, RateLimitInfo, RateLimitPolicy, WaitHook};
pub use retry::RetryPolicy;
pub use throttle::{Throttle, ThrottleConfig};

#[cfg(test)]
mod tests;
