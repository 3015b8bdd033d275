//! Per-run statistics accumulator

use crate::github::PullRequest;
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// Statistics of one extraction run
#[derive(Debug, Clone)]
pub struct RunStats {
    /// Wall-clock start of the run
    pub started_at: DateTime<Utc>,
    /// Records written to the sink
    pub records_written: u64,
    /// Records skipped as already seen
    pub records_skipped: u64,
    /// Pages received
    pub pages_fetched: u64,
    /// Page requests issued, including complexity retries
    pub api_calls: u64,
    /// Lowest record number written
    pub first_id: Option<u64>,
    /// Highest record number written
    pub last_id: Option<u64>,
    /// Earliest creation time written
    pub oldest_created_at: Option<DateTime<Utc>>,
    /// Latest creation time written
    pub newest_created_at: Option<DateTime<Utc>>,
    /// Creation time of the last record written
    pub last_written_at: Option<DateTime<Utc>>,
    started: Instant,
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStats {
    /// Start accumulating now
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            records_written: 0,
            records_skipped: 0,
            pages_fetched: 0,
            api_calls: 0,
            first_id: None,
            last_id: None,
            oldest_created_at: None,
            newest_created_at: None,
            last_written_at: None,
            started: Instant::now(),
        }
    }

    /// Account for a record written to the sink
    pub fn record(&mut self, record: &PullRequest) {
        self.record_written(record.number, record.created_at);
    }

    /// Account for a written record by number and creation time
    pub fn record_written(&mut self, number: u64, created_at: DateTime<Utc>) {
        self.records_written += 1;
        self.first_id = Some(self.first_id.map_or(number, |id| id.min(number)));
        self.last_id = Some(self.last_id.map_or(number, |id| id.max(number)));
        self.oldest_created_at = Some(
            self.oldest_created_at
                .map_or(created_at, |at| at.min(created_at)),
        );
        self.newest_created_at = Some(
            self.newest_created_at
                .map_or(created_at, |at| at.max(created_at)),
        );
        self.last_written_at = Some(created_at);
    }

    /// Account for a record skipped as already seen
    pub fn add_skipped(&mut self) {
        self.records_skipped += 1;
    }

    /// Account for a received page
    pub fn add_page(&mut self) {
        self.pages_fetched += 1;
    }

    /// Account for issued page requests
    pub fn add_api_calls(&mut self, calls: u32) {
        self.api_calls += u64::from(calls);
    }

    /// Time since the run started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
