//! Pull request record and page types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of records requested per page
pub const DEFAULT_BATCH_SIZE: u32 = 50;

/// Smallest batch size the complexity back-off will request
pub const MIN_BATCH_SIZE: u32 = 5;

/// Largest batch size the source accepts
pub const MAX_BATCH_SIZE: u32 = 100;

/// Clamp a requested batch size into the range the source accepts
pub fn clamp_batch_size(size: u32) -> u32 {
    size.clamp(1, MAX_BATCH_SIZE)
}

/// One extracted pull request
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PullRequest {
    /// Number assigned by the source, increasing with creation
    pub number: u64,
    pub title: String,
    pub state: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body: String,
    pub url: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_at: Option<DateTime<Utc>>,

    pub author: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_by: Option<User>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assignees: Vec<User>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reviewers: Vec<User>,

    pub base_ref: String,
    pub head_ref: String,
    pub base_sha: String,
    pub head_sha: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub merge_commit_sha: String,

    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
    pub comments: u64,
    pub commits: u64,

    pub merged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mergeable: Option<bool>,
    pub is_bot: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<File>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reviews: Vec<Review>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commit_list: Vec<Commit>,
}

/// Kind of account behind a login
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UserType {
    #[default]
    User,
    Bot,
}

/// A user reference
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct User {
    pub login: String,
    #[serde(rename = "type", default)]
    pub user_type: UserType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
}

impl User {
    /// A user with the given login, typed by bot detection
    pub fn from_login(login: impl Into<String>) -> Self {
        let login = login.into();
        let user_type = if is_bot_login(&login) {
            UserType::Bot
        } else {
            UserType::User
        };
        Self {
            login,
            user_type,
            email: String::new(),
        }
    }
}

/// Whether a login belongs to an automation account
pub fn is_bot_login(login: &str) -> bool {
    login.contains("[bot]") || login.ends_with("-bot")
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// A changed file
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct File {
    pub filename: String,
    /// `added`, `removed`, `modified` or `renamed`
    pub status: String,
    pub additions: u64,
    pub deletions: u64,
    pub changes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub user: User,
    pub state: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub message: String,
    pub author: User,
    pub committer: User,
    pub authored_at: DateTime<Utc>,
    pub committed_at: DateTime<Utc>,
    pub additions: u64,
    pub deletions: u64,
    pub total_changes: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

/// One page of pull requests
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Records in creation order
    pub records: Vec<PullRequest>,
    /// Whether another page follows
    pub has_next_page: bool,
    /// Cursor for the next page
    pub end_cursor: Option<String>,
    /// Total matches for the query, when the source reports it
    pub total_count: Option<u64>,
}

/// Parameters of one page query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Requested records per page
    pub batch_size: u32,
    /// Continuation cursor; `None` for the first page
    pub after: Option<String>,
    /// Inclusive lower creation-time bound
    pub since: Option<DateTime<Utc>>,
    /// Inclusive upper creation-time bound
    pub until: Option<DateTime<Utc>>,
}

impl Default for FetchRequest {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            after: None,
            since: None,
            until: None,
        }
    }
}

impl FetchRequest {
    /// Create a first-page request with the given bounds
    pub fn new(
        batch_size: u32,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            batch_size: clamp_batch_size(batch_size),
            after: None,
            since,
            until,
        }
    }
}

/// Repository metadata used for progress reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RepositoryInfo {
    /// Total pull requests in the repository
    pub total_pull_requests: u64,
}
