//! Engine types

use crate::audit::{RunAudit, RunStats};
use crate::checkpoint::Checkpoint;
use crate::github::{DEFAULT_BATCH_SIZE, MIN_BATCH_SIZE};
use crate::fetch::DEFAULT_MAX_ATTEMPTS;
use crate::types::{FetchMode, RepoRef};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;

/// States of one extraction run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Start,
    FullFetch,
    IncrementalFetch,
    Draining,
    Finalizing,
    Done,
    Failed,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::FullFetch => "full-fetch",
            Self::IncrementalFetch => "incremental-fetch",
            Self::Draining => "draining",
            Self::Finalizing => "finalizing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Configuration for the extractor
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Batch size when the request does not name one
    pub batch_size: u32,
    /// Persist progress after every page that wrote records
    pub checkpoint_every_page: bool,
    /// Attempts per page before a complexity error is fatal
    pub max_complexity_attempts: u32,
    /// Floor for complexity back-off
    pub min_batch_size: u32,
    /// Look up the repository's total for progress logging on full runs
    pub report_total: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            checkpoint_every_page: true,
            max_complexity_attempts: DEFAULT_MAX_ATTEMPTS,
            min_batch_size: MIN_BATCH_SIZE,
            report_total: true,
        }
    }
}

impl ExtractConfig {
    /// Create a new config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default batch size
    #[must_use]
    pub fn with_batch_size(mut self, size: u32) -> Self {
        self.batch_size = size;
        self
    }

    /// Toggle per-page checkpointing
    #[must_use]
    pub fn with_checkpoint_every_page(mut self, enabled: bool) -> Self {
        self.checkpoint_every_page = enabled;
        self
    }

    /// Set the floor for complexity back-off
    #[must_use]
    pub fn with_min_batch_size(mut self, size: u32) -> Self {
        self.min_batch_size = size;
        self
    }

    /// Toggle the repository total lookup
    #[must_use]
    pub fn with_report_total(mut self, enabled: bool) -> Self {
        self.report_total = enabled;
        self
    }
}

/// What to extract
#[derive(Debug, Clone)]
pub struct ExtractRequest {
    pub repo: RepoRef,
    pub mode: FetchMode,
    /// Inclusive lower creation-time bound; wins over the checkpoint's
    pub since: Option<DateTime<Utc>>,
    /// Inclusive upper creation-time bound
    pub until: Option<DateTime<Utc>>,
    /// Overrides the configured batch size
    pub batch_size: Option<u32>,
    /// Additional location for the run audit
    pub audit_path: Option<PathBuf>,
}

impl ExtractRequest {
    /// Create a request for `repo` in `mode`
    pub fn new(repo: RepoRef, mode: FetchMode) -> Self {
        Self {
            repo,
            mode,
            since: None,
            until: None,
            batch_size: None,
            audit_path: None,
        }
    }

    #[must_use]
    pub fn since(mut self, since: Option<DateTime<Utc>>) -> Self {
        self.since = since;
        self
    }

    #[must_use]
    pub fn until(mut self, until: Option<DateTime<Utc>>) -> Self {
        self.until = until;
        self
    }

    #[must_use]
    pub fn batch_size(mut self, size: Option<u32>) -> Self {
        self.batch_size = size;
        self
    }

    #[must_use]
    pub fn audit_path(mut self, path: Option<PathBuf>) -> Self {
        self.audit_path = path;
        self
    }
}

/// Result of a finished run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Final phase, `Done` for every returned outcome
    pub phase: RunPhase,
    pub mode: FetchMode,
    /// Batch size in effect at the end of the run
    pub batch_size: u32,
    pub stats: RunStats,
    /// Checkpoint persisted by this run
    pub checkpoint: Option<Checkpoint>,
    /// Audit produced by this run
    pub audit: Option<RunAudit>,
    /// Non-fatal problems, such as a failed audit write
    pub warnings: Vec<String>,
}

impl RunOutcome {
    /// Records written to the sink
    pub fn records_written(&self) -> u64 {
        self.stats.records_written
    }

    /// Records skipped as already seen
    pub fn records_skipped(&self) -> u64 {
        self.stats.records_skipped
    }

    /// Pages received
    pub fn pages(&self) -> u64 {
        self.stats.pages_fetched
    }
}
