//! Retry policy with jittered backoff

use crate::error::Error;
use rand::Rng;
use std::time::Duration;

/// Retry configuration for transient failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Initial delay for backoff
    pub initial_backoff: Duration,
    /// Maximum delay for backoff
    pub max_backoff: Duration,
    /// Jitter as a fraction of the delay (0.1 = ±10%)
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Whether `err` should be retried after `attempt` retries
    pub fn should_retry(&self, err: &Error, attempt: u32) -> bool {
        err.is_retryable() && attempt < self.max_retries
    }

    /// Exponential backoff before jitter, capped at `max_backoff`
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let delay = self
            .initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt));
        std::cmp::min(delay, self.max_backoff)
    }

    /// Backoff with jitter applied
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if self.jitter <= 0.0 {
            return base;
        }
        let spread = self.jitter.min(1.0);
        let factor = 1.0 + rand::thread_rng().gen_range(-spread..=spread);
        base.mul_f64(factor)
    }
}
