//! Adaptive fetch driver

use crate::error::{Error, ErrorKind, Result};
use crate::github::{clamp_batch_size, FetchRequest, Page, PullRequestSource, MIN_BATCH_SIZE};
use crate::types::RepoRef;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Attempts per page before a complexity error becomes fatal
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

/// A page together with the number of requests it took
#[derive(Debug)]
pub struct Fetched {
    pub page: Page,
    pub attempts: u32,
}

/// Page fetcher that shrinks its batch size on complexity errors
pub struct AdaptiveFetcher {
    source: Arc<dyn PullRequestSource>,
    batch_size: u32,
    min_batch_size: u32,
    max_attempts: u32,
}

impl AdaptiveFetcher {
    /// Create a fetcher starting at `batch_size`
    pub fn new(source: Arc<dyn PullRequestSource>, batch_size: u32) -> Self {
        Self {
            source,
            batch_size: clamp_batch_size(batch_size),
            min_batch_size: MIN_BATCH_SIZE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Set the attempt ceiling per page
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the floor for batch size reduction
    #[must_use]
    pub fn with_min_batch_size(mut self, size: u32) -> Self {
        self.min_batch_size = size.max(1);
        self
    }

    /// The batch size the next page will be requested with
    pub fn batch_size(&self) -> u32 {
        self.batch_size
    }

    /// Fetch the page after `cursor`
    ///
    /// Only complexity errors are handled here; every other error is
    /// returned immediately.
    pub async fn fetch(
        &mut self,
        repo: &RepoRef,
        cursor: Option<&str>,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
    ) -> Result<Fetched> {
        let mut attempts = 0;

        loop {
            attempts += 1;
            let request = FetchRequest {
                batch_size: self.batch_size,
                after: cursor.map(str::to_string),
                since,
                until,
            };

            let err = match self.source.fetch_page(repo, &request, cancel).await {
                Ok(page) => return Ok(Fetched { page, attempts }),
                Err(e) => e,
            };

            if err.kind() != ErrorKind::QueryTooComplex {
                return Err(err);
            }

            if attempts >= self.max_attempts || self.batch_size <= self.min_batch_size {
                return Err(Error::ComplexityExhausted {
                    attempts,
                    batch_size: self.batch_size,
                });
            }

            let reduced = (self.batch_size / 2).max(self.min_batch_size);
            warn!(
                repository = %repo,
                attempt = attempts,
                batch_size = reduced,
                "Query too complex, reducing batch size from {} to {}",
                self.batch_size,
                reduced
            );
            self.batch_size = reduced;
        }
    }
}

impl std::fmt::Debug for AdaptiveFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptiveFetcher")
            .field("batch_size", &self.batch_size)
            .field("min_batch_size", &self.min_batch_size)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}
