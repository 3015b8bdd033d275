//! GraphQL query construction

use super::types::FetchRequest;
use crate::types::RepoRef;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

/// Pull request search, one page per call
pub const SEARCH_QUERY: &str = r"query($query: String!, $first: Int!, $after: String) {
  search(query: $query, type: ISSUE, first: $first, after: $after) {
    issueCount
    pageInfo { hasNextPage endCursor }
    nodes {
      ... on PullRequest {
        number title state body url
        createdAt updatedAt closedAt mergedAt
        merged mergeable
        additions deletions changedFiles totalCommentsCount
        author { login }
        mergedBy { login }
        baseRef { name target { oid } }
        headRef { name target { oid } }
        mergeCommit { oid }
        labels(first: 100) { nodes { name color description } }
        assignees(first: 100) { nodes { login } }
        reviewRequests(first: 100) { nodes { requestedReviewer { ... on User { login } } } }
        files(first: 100) { totalCount nodes { path additions deletions changeType } }
        reviews(first: 50) { nodes { id state body submittedAt author { login } } }
        commits(first: 100) {
          totalCount
          nodes {
            commit {
              oid message authoredDate committedDate additions deletions
              author { user { login } name email }
              committer { user { login } name email }
              parents(first: 2) { nodes { oid } }
            }
          }
        }
      }
    }
  }
}";

/// Total pull request count of a repository
pub const REPOSITORY_INFO_QUERY: &str = r"query($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) {
    pullRequests { totalCount }
  }
}";

fn format_bound(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Build the search string: repository, item type, creation range, sort order
pub fn build_search_query(
    repo: &RepoRef,
    since: Option<&DateTime<Utc>>,
    until: Option<&DateTime<Utc>>,
) -> String {
    let mut parts = vec![format!("repo:{}/{}", repo.owner, repo.name), "is:pr".to_string()];

    match (since, until) {
        (Some(since), Some(until)) => parts.push(format!(
            "created:{}..{}",
            format_bound(since),
            format_bound(until)
        )),
        (Some(since), None) => parts.push(format!("created:>={}", format_bound(since))),
        (None, Some(until)) => parts.push(format!("created:<={}", format_bound(until))),
        (None, None) => {}
    }

    parts.push("sort:created-asc".to_string());
    parts.join(" ")
}

/// Request body for one page of search results
pub fn search_payload(repo: &RepoRef, request: &FetchRequest) -> Value {
    json!({
        "query": SEARCH_QUERY,
        "variables": {
            "query": build_search_query(repo, request.since.as_ref(), request.until.as_ref()),
            "first": request.batch_size,
            "after": request.after,
        }
    })
}

/// Request body for repository metadata
pub fn repository_info_payload(repo: &RepoRef) -> Value {
    json!({
        "query": REPOSITORY_INFO_QUERY,
        "variables": {
            "owner": repo.owner,
            "name": repo.name,
        }
    })
}
