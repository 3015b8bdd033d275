//! The paged pull request source abstraction

use super::types::{FetchRequest, Page, RepositoryInfo};
use crate::error::Result;
use crate::types::RepoRef;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// A source of pull requests, paged by cursor in ascending creation order
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    /// Fetch one page
    ///
    /// Errors are classified: authentication, not-found, rate-limit,
    /// query-too-complex, or network/generic.
    async fn fetch_page(
        &self,
        repo: &RepoRef,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<Page>;

    /// Repository metadata for progress reporting
    async fn repository_info(
        &self,
        repo: &RepoRef,
        cancel: &CancellationToken,
    ) -> Result<RepositoryInfo>;
}
