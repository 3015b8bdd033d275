//! Audit record types

use super::stats::RunStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies the query strategy that produced a run
pub const METHOD_VERSION: &str = "graphql-search-v1";

/// Summary of one extraction run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunAudit {
    pub tool_version: String,
    pub method_version: String,
    pub run_id: String,
    pub parameters: FetchParams,
    pub results: RunResults,
    pub incremental: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_run: Option<RunRef>,
}

/// Parameters a run was started with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchParams {
    pub organization: String,
    pub repository: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<DateTime<Utc>>,
    pub fetch_all: bool,
    pub incremental: bool,
    /// Batch size in effect when the run finished
    pub batch_size: u32,
}

/// What a run produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResults {
    pub total_records: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oldest_created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newest_created_at: Option<DateTime<Utc>>,
    pub api_calls: u64,
    pub pages: u64,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Pointer to an earlier run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRef {
    pub run_id: String,
    pub completed_at: DateTime<Utc>,
}

impl RunAudit {
    /// Build the audit of a finished run
    pub fn from_stats(stats: &RunStats, parameters: FetchParams, previous_run: Option<RunRef>) -> Self {
        let incremental = parameters.incremental;
        let prefix = if incremental { "inc" } else { "full" };

        Self {
            tool_version: crate::VERSION.to_string(),
            method_version: METHOD_VERSION.to_string(),
            run_id: format!("{prefix}-{}", stats.started_at.timestamp_millis()),
            results: RunResults {
                total_records: stats.records_written,
                first_id: stats.first_id,
                last_id: stats.last_id,
                oldest_created_at: stats.oldest_created_at,
                newest_created_at: stats.newest_created_at,
                api_calls: stats.api_calls,
                pages: stats.pages_fetched,
                duration_ms: stats.elapsed().as_millis() as u64,
                started_at: stats.started_at,
                completed_at: Utc::now(),
            },
            parameters,
            incremental,
            previous_run,
        }
    }

    /// `owner/name` of the audited repository
    pub fn repository_key(&self) -> String {
        format!(
            "{}/{}",
            self.parameters.organization, self.parameters.repository
        )
    }

    /// A reference to this run for a later audit
    pub fn reference(&self) -> RunRef {
        RunRef {
            run_id: self.run_id.clone(),
            completed_at: self.results.completed_at,
        }
    }
}
