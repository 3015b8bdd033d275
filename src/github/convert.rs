//! Conversion of GraphQL response shapes into flat records

use super::types::{Commit, File, Label, Page, PullRequest, RepositoryInfo, Review, User, UserType};
use crate::types::OptionStringExt;
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub(crate) struct Nodes<T> {
    #[serde(default)]
    nodes: Vec<Option<T>>,
}

impl<T> Nodes<T> {
    fn flatten(nodes: Option<Self>) -> impl Iterator<Item = T> {
        nodes.into_iter().flat_map(|n| n.nodes).flatten()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PageInfo {
    #[serde(default)]
    has_next_page: bool,
    #[serde(default)]
    end_cursor: Option<String>,
}

// ============================================================================
// Search
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct SearchData {
    search: SearchConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchConnection {
    #[serde(default)]
    issue_count: Option<u64>,
    #[serde(default)]
    page_info: PageInfo,
    #[serde(default)]
    nodes: Vec<Option<PullRequestNode>>,
}

impl SearchData {
    /// Flatten into a page, dropping nodes that are not pull requests
    pub(crate) fn into_page(self) -> Page {
        let search = self.search;
        Page {
            records: search
                .nodes
                .into_iter()
                .flatten()
                .filter_map(PullRequestNode::into_record)
                .collect(),
            has_next_page: search.page_info.has_next_page,
            end_cursor: search.page_info.end_cursor.none_if_empty(),
            total_count: search.issue_count,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PullRequestNode {
    number: u64,
    title: String,
    state: String,
    body: Option<String>,
    url: String,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    merged_at: Option<DateTime<Utc>>,
    merged: bool,
    mergeable: Option<String>,
    additions: u64,
    deletions: u64,
    changed_files: u64,
    total_comments_count: u64,
    author: Option<Actor>,
    merged_by: Option<Actor>,
    base_ref: Option<GitRef>,
    head_ref: Option<GitRef>,
    merge_commit: Option<Oid>,
    labels: Option<Nodes<LabelNode>>,
    assignees: Option<Nodes<Actor>>,
    review_requests: Option<Nodes<ReviewRequestNode>>,
    files: Option<Nodes<FileNode>>,
    reviews: Option<Nodes<ReviewNode>>,
    commits: Option<CommitConnection>,
}

#[derive(Debug, Default, Deserialize)]
struct Actor {
    #[serde(default)]
    login: String,
}

#[derive(Debug, Default, Deserialize)]
struct Oid {
    #[serde(default)]
    oid: String,
}

#[derive(Debug, Default, Deserialize)]
struct GitRef {
    #[serde(default)]
    name: String,
    #[serde(default)]
    target: Option<Oid>,
}

#[derive(Debug, Deserialize)]
struct LabelNode {
    #[serde(default)]
    name: String,
    #[serde(default)]
    color: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewRequestNode {
    #[serde(default)]
    requested_reviewer: Option<Actor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileNode {
    #[serde(default)]
    path: String,
    #[serde(default)]
    additions: u64,
    #[serde(default)]
    deletions: u64,
    #[serde(default)]
    change_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewNode {
    #[serde(default)]
    id: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    author: Option<Actor>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitConnection {
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    nodes: Vec<Option<CommitNode>>,
}

#[derive(Debug, Deserialize)]
struct CommitNode {
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitDetail {
    #[serde(default)]
    oid: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    authored_date: DateTime<Utc>,
    #[serde(default)]
    committed_date: DateTime<Utc>,
    #[serde(default)]
    additions: u64,
    #[serde(default)]
    deletions: u64,
    #[serde(default)]
    author: Option<GitActor>,
    #[serde(default)]
    committer: Option<GitActor>,
    #[serde(default)]
    parents: Option<Nodes<Oid>>,
}

#[derive(Debug, Deserialize)]
struct GitActor {
    #[serde(default)]
    user: Option<Actor>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: Option<String>,
}

impl GitActor {
    fn into_user(self) -> User {
        let login = match self.user {
            Some(actor) if !actor.login.is_empty() => actor.login,
            _ => self.name,
        };
        User {
            email: self.email.unwrap_or_default(),
            ..User::from_login(login)
        }
    }
}

/// Map a GraphQL change type onto the REST-style file status
pub fn file_status(change_type: &str) -> &'static str {
    match change_type {
        "ADDED" => "added",
        "DELETED" => "removed",
        "RENAMED" => "renamed",
        _ => "modified",
    }
}

fn mergeable_flag(value: Option<&str>) -> Option<bool> {
    match value? {
        "MERGEABLE" => Some(true),
        "CONFLICTING" => Some(false),
        _ => None,
    }
}

impl PullRequestNode {
    fn into_record(self) -> Option<PullRequest> {
        // Non pull-request search hits arrive as empty objects
        if self.number == 0 {
            return None;
        }
        let created_at = self.created_at?;

        let author = User::from_login(self.author.map(|a| a.login).unwrap_or_default());
        let is_bot = author.user_type == UserType::Bot;
        let (base_ref, base_sha) = split_ref(self.base_ref);
        let (head_ref, head_sha) = split_ref(self.head_ref);
        let commits = self.commits.unwrap_or_default();

        Some(PullRequest {
            number: self.number,
            title: self.title,
            state: self.state,
            body: self.body.unwrap_or_default(),
            url: self.url,
            created_at,
            updated_at: self.updated_at.unwrap_or(created_at),
            closed_at: self.closed_at,
            merged_at: self.merged_at,
            author,
            merged_by: self.merged_by.map(|a| User::from_login(a.login)),
            assignees: Nodes::flatten(self.assignees)
                .map(|a| User::from_login(a.login))
                .collect(),
            reviewers: Nodes::flatten(self.review_requests)
                .filter_map(|r| r.requested_reviewer)
                .filter(|a| !a.login.is_empty())
                .map(|a| User::from_login(a.login))
                .collect(),
            base_ref,
            head_ref,
            base_sha,
            head_sha,
            merge_commit_sha: self.merge_commit.map(|c| c.oid).unwrap_or_default(),
            additions: self.additions,
            deletions: self.deletions,
            changed_files: self.changed_files,
            comments: self.total_comments_count,
            commits: commits.total_count,
            merged: self.merged,
            mergeable: mergeable_flag(self.mergeable.as_deref()),
            is_bot,
            labels: Nodes::flatten(self.labels)
                .map(|l| Label {
                    name: l.name,
                    color: l.color,
                    description: l.description.unwrap_or_default(),
                })
                .collect(),
            files: Nodes::flatten(self.files)
                .map(|f| File {
                    status: file_status(&f.change_type).to_string(),
                    changes: f.additions + f.deletions,
                    filename: f.path,
                    additions: f.additions,
                    deletions: f.deletions,
                })
                .collect(),
            reviews: Nodes::flatten(self.reviews)
                .map(|r| Review {
                    id: r.id,
                    user: User::from_login(r.author.map(|a| a.login).unwrap_or_default()),
                    state: r.state,
                    body: r.body.unwrap_or_default(),
                    submitted_at: r.submitted_at,
                })
                .collect(),
            commit_list: commits
                .nodes
                .into_iter()
                .flatten()
                .map(|n| convert_commit(n.commit))
                .collect(),
        })
    }
}

fn split_ref(git_ref: Option<GitRef>) -> (String, String) {
    match git_ref {
        Some(r) => (r.name, r.target.map(|t| t.oid).unwrap_or_default()),
        None => (String::new(), String::new()),
    }
}

fn convert_commit(commit: CommitDetail) -> Commit {
    Commit {
        sha: commit.oid,
        message: commit.message,
        author: commit.author.map(GitActor::into_user).unwrap_or_default(),
        committer: commit.committer.map(GitActor::into_user).unwrap_or_default(),
        authored_at: commit.authored_date,
        committed_at: commit.committed_date,
        additions: commit.additions,
        deletions: commit.deletions,
        total_changes: commit.additions + commit.deletions,
        parents: Nodes::flatten(commit.parents).map(|p| p.oid).collect(),
    }
}

// ============================================================================
// Repository info
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryData {
    repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    pull_requests: TotalCount,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TotalCount {
    total_count: u64,
}

impl RepositoryData {
    /// `None` when the repository did not resolve
    pub(crate) fn into_info(self) -> Option<RepositoryInfo> {
        self.repository.map(|r| RepositoryInfo {
            total_pull_requests: r.pull_requests.total_count,
        })
    }
}
