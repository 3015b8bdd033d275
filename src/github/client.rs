//! GraphQL client for the pull request search API

use super::classify::decode_response;
use super::convert::{RepositoryData, SearchData};
use super::query::{repository_info_payload, search_payload};
use super::source::PullRequestSource;
use super::types::{FetchRequest, Page, RepositoryInfo};
use crate::auth::AuthConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig};
use crate::types::RepoRef;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Pull request source backed by a GraphQL endpoint
#[derive(Debug)]
pub struct GraphQLClient {
    http: HttpClient,
}

impl GraphQLClient {
    /// Create a client for `endpoint` authenticating with `token`
    pub fn new(token: impl Into<String>, endpoint: impl Into<String>) -> Result<Self> {
        let config = HttpClientConfig::builder().endpoint(endpoint).build();
        let http = HttpClient::with_auth(config, AuthConfig::bearer(token))?;
        Ok(Self::with_http(http))
    }

    /// Wrap an already configured transport
    pub fn with_http(http: HttpClient) -> Self {
        Self { http }
    }

    /// The underlying transport
    pub fn http(&self) -> &HttpClient {
        &self.http
    }
}

#[async_trait]
impl PullRequestSource for GraphQLClient {
    async fn fetch_page(
        &self,
        repo: &RepoRef,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<Page> {
        debug!(
            repository = %repo,
            batch_size = request.batch_size,
            after = ?request.after,
            "Fetching page"
        );

        let payload = search_payload(repo, request);
        let data: SearchData = self
            .http
            .execute(&payload, cancel, |response| decode_response(response, repo))
            .await?;

        Ok(data.into_page())
    }

    async fn repository_info(
        &self,
        repo: &RepoRef,
        cancel: &CancellationToken,
    ) -> Result<RepositoryInfo> {
        let payload = repository_info_payload(repo);
        let data: RepositoryData = self
            .http
            .execute(&payload, cancel, |response| decode_response(response, repo))
            .await?;

        data.into_info().ok_or_else(|| Error::not_found(repo.key()))
    }
}
