//! In-memory pull request source for tests
//!
//! Serves a fixed record set sorted by creation time, honours the
//! creation-time bounds and cursors of each request, and can inject
//! failures on chosen calls.

use super::source::PullRequestSource;
use super::types::{FetchRequest, Page, PullRequest, RepositoryInfo, User};
use crate::error::{Error, ErrorKind, Result};
use crate::types::RepoRef;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct MockState {
    calls: Vec<FetchRequest>,
    failures: HashMap<usize, ErrorKind>,
    cancel_on: Option<(usize, CancellationToken)>,
}

/// Scripted [`PullRequestSource`]
#[derive(Default)]
pub struct MockSource {
    records: Vec<PullRequest>,
    complexity_limit: Option<u32>,
    state: Mutex<MockState>,
}

impl MockSource {
    /// Serve `records`, sorted by creation time then number
    pub fn new(mut records: Vec<PullRequest>) -> Self {
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.number.cmp(&b.number))
        });
        Self {
            records,
            ..Self::default()
        }
    }

    /// Fail the `call`-th page fetch (1-based) with an error of `kind`
    #[must_use]
    pub fn fail_on_call(self, call: usize, kind: ErrorKind) -> Self {
        self.lock().failures.insert(call, kind);
        self
    }

    /// Reject every request asking for more than `limit` records
    #[must_use]
    pub fn with_complexity_limit(mut self, limit: u32) -> Self {
        self.complexity_limit = Some(limit);
        self
    }

    /// Cancel `token` when the `call`-th page fetch arrives
    #[must_use]
    pub fn cancel_on_call(self, call: usize, token: CancellationToken) -> Self {
        self.lock().cancel_on = Some((call, token));
        self
    }

    /// Every page request received so far
    pub fn calls(&self) -> Vec<FetchRequest> {
        self.lock().calls.clone()
    }

    /// Number of page requests received so far
    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn matching(&self, request: &FetchRequest) -> Vec<&PullRequest> {
        self.records
            .iter()
            .filter(|r| request.since.map_or(true, |since| r.created_at >= since))
            .filter(|r| request.until.map_or(true, |until| r.created_at <= until))
            .collect()
    }
}

fn injected(kind: ErrorKind, repo: &RepoRef) -> Error {
    match kind {
        ErrorKind::Auth => Error::auth("Bad credentials"),
        ErrorKind::NotFound => Error::not_found(repo.key()),
        ErrorKind::RateLimit => Error::rate_limited("API rate limit exceeded", None),
        ErrorKind::QueryTooComplex => Error::complexity("Query has complexity too high"),
        ErrorKind::Network => Error::network("connection reset by peer"),
        ErrorKind::Cancelled => Error::Cancelled,
        other => Error::api(format!("injected {other} failure")),
    }
}

fn parse_cursor(cursor: Option<&str>) -> Result<usize> {
    match cursor {
        None => Ok(0),
        Some(c) => c
            .strip_prefix("cursor-")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| Error::api(format!("invalid cursor '{c}'"))),
    }
}

#[async_trait]
impl PullRequestSource for MockSource {
    async fn fetch_page(
        &self,
        repo: &RepoRef,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<Page> {
        let (call, failure, cancel_now) = {
            let mut state = self.lock();
            state.calls.push(request.clone());
            let call = state.calls.len();
            let failure = state.failures.remove(&call);
            let cancel_now = match state.cancel_on {
                Some((n, ref token)) if n == call => Some(token.clone()),
                _ => None,
            };
            (call, failure, cancel_now)
        };

        if let Some(token) = cancel_now {
            token.cancel();
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if let Some(kind) = failure {
            return Err(injected(kind, repo));
        }
        if let Some(limit) = self.complexity_limit {
            if request.batch_size > limit {
                return Err(Error::complexity(format!(
                    "call {call}: batch of {} exceeds node limit {limit}",
                    request.batch_size
                )));
            }
        }

        let matching = self.matching(request);
        let offset = parse_cursor(request.after.as_deref())?;
        let end = (offset + request.batch_size as usize).min(matching.len());
        let records = matching
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|r| (*r).clone())
            .collect();

        Ok(Page {
            records,
            has_next_page: end < matching.len(),
            end_cursor: Some(format!("cursor-{end}")),
            total_count: Some(matching.len() as u64),
        })
    }

    async fn repository_info(
        &self,
        _repo: &RepoRef,
        cancel: &CancellationToken,
    ) -> Result<RepositoryInfo> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(RepositoryInfo {
            total_pull_requests: self.records.len() as u64,
        })
    }
}

/// A minimal pull request with the given number and creation time
pub fn pull_request(number: u64, created_at: DateTime<Utc>) -> PullRequest {
    PullRequest {
        number,
        title: format!("Pull request #{number}"),
        state: "OPEN".to_string(),
        url: format!("https://github.com/octo/repo/pull/{number}"),
        created_at,
        updated_at: created_at,
        author: User::from_login("octocat"),
        ..PullRequest::default()
    }
}

/// `count` pull requests numbered from 1, one minute apart from `start`
pub fn sample_pull_requests(count: u64, start: DateTime<Utc>) -> Vec<PullRequest> {
    (1..=count)
        .map(|n| pull_request(n, start + Duration::minutes(n as i64)))
        .collect()
}
