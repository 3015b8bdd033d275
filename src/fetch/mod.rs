//! Complexity-adaptive page fetching
//!
//! Wraps a [`PullRequestSource`](crate::github::PullRequestSource) and halves
//! the requested batch size whenever the source rejects a query as too
//! expensive. A reduced size is kept for every later page of the run.

mod driver;

pub use driver::{AdaptiveFetcher, Fetched, DEFAULT_MAX_ATTEMPTS};
