//! Pull request API client
//!
//! Issues paged search queries against a GraphQL endpoint and converts the
//! nested response into flat [`PullRequest`] records.
//!
//! # Example
//!
//! ```rust,ignore
//! use pr_relay::github::{FetchRequest, GraphQLClient, PullRequestSource};
//!
//! let client = GraphQLClient::new(token, "https://api.github.com/graphql")?;
//! let page = client.fetch_page(&repo, &FetchRequest::default(), &cancel).await?;
//! ```

mod classify;
mod client;
mod convert;
mod mock;
mod query;
mod source;
mod types;

pub use classify::{
    check_status, classify_graphql_error, classify_message, decode_response, GraphQLError,
};
pub use client::GraphQLClient;
pub use convert::file_status;
pub use mock::{pull_request, sample_pull_requests, MockSource};
pub use query::{
    build_search_query, repository_info_payload, search_payload, REPOSITORY_INFO_QUERY,
    SEARCH_QUERY,
};
pub use source::PullRequestSource;
pub use types::{
    clamp_batch_size, is_bot_login, Commit, FetchRequest, File, Label, Page, PullRequest,
    RepositoryInfo, Review, User, UserType, DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE, MIN_BATCH_SIZE,
};
