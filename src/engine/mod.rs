//! Extraction orchestrator
//!
//! Drives one run for one repository from start to finish.
//!
//! # Overview
//!
//! - [`Extractor`] - runs the fetch loop, streams records to a sink and
//!   persists the checkpoint and audit
//! - [`ExtractRequest`] - what to extract and how far to page
//! - [`RunOutcome`] - what a successful run produced
//!
//! A run moves through `Start -> FullFetch | IncrementalFetch -> Draining
//! -> Finalizing -> Done`; any fatal error lands in `Failed` and is
//! returned to the caller after in-flight progress has been saved.

mod types;

pub use types::{ExtractConfig, ExtractRequest, RunOutcome, RunPhase};

use crate::audit::{AuditStore, FetchParams, RunAudit, RunRef, RunStats};
use crate::checkpoint::{Checkpoint, CheckpointStore, PendingCheckpoint};
use crate::error::{Error, Result};
use crate::fetch::AdaptiveFetcher;
use crate::github::{clamp_batch_size, PullRequestSource};
use crate::output::RecordSink;
use crate::types::FetchMode;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Orchestrates extraction runs against one source and state directory
pub struct Extractor {
    source: Arc<dyn PullRequestSource>,
    store: CheckpointStore,
    audits: AuditStore,
    pending: Arc<PendingCheckpoint>,
    config: ExtractConfig,
}

/// Mutable bookkeeping of one run
struct RunState {
    resource: String,
    mode: FetchMode,
    phase: RunPhase,
    previous: Option<Checkpoint>,
    stats: RunStats,
    warnings: Vec<String>,
    /// Records written since progress was last persisted
    unsaved: bool,
}

impl RunState {
    fn transition(&mut self, phase: RunPhase) {
        if self.phase != phase {
            debug!(resource = %self.resource, from = %self.phase, to = %phase, "Run phase");
            self.phase = phase;
        }
    }

    fn warn(&mut self, message: String) {
        warn!(resource = %self.resource, "{}", message);
        self.warnings.push(message);
    }

    fn already_seen(&self, number: u64) -> bool {
        self.previous.as_ref().is_some_and(|p| number <= p.last_id)
    }

    /// Checkpoint covering everything written so far
    fn progress(&self) -> Option<Checkpoint> {
        let last_id = self.stats.last_id?;
        let last_record_at = self.stats.last_written_at?;
        let (previous_id, previous_total) = self
            .previous
            .as_ref()
            .map_or((0, 0), |p| (p.last_id, p.total_processed));

        Some(Checkpoint::new(
            self.resource.clone(),
            previous_id.max(last_id),
            last_record_at,
            previous_total + self.stats.records_written,
        ))
    }
}

impl Extractor {
    /// Create an extractor keeping checkpoints and audits under `state_dir`
    pub fn new(source: Arc<dyn PullRequestSource>, state_dir: impl AsRef<Path>) -> Self {
        let store = CheckpointStore::new(state_dir.as_ref());
        Self {
            source,
            pending: Arc::new(PendingCheckpoint::new(store.clone())),
            audits: AuditStore::new(state_dir.as_ref()),
            store,
            config: ExtractConfig::default(),
        }
    }

    /// Set the extraction config
    #[must_use]
    pub fn with_config(mut self, config: ExtractConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an in-flight checkpoint, typically one the transport flushes
    /// before rate-limit waits
    #[must_use]
    pub fn with_pending(mut self, pending: Arc<PendingCheckpoint>) -> Self {
        self.pending = pending;
        self
    }

    /// The in-flight checkpoint
    pub fn pending(&self) -> Arc<PendingCheckpoint> {
        Arc::clone(&self.pending)
    }

    /// The checkpoint store
    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// The audit store
    pub fn audits(&self) -> &AuditStore {
        &self.audits
    }

    /// Run one extraction, streaming new records into `sink`
    pub async fn run(
        &self,
        request: ExtractRequest,
        sink: &mut dyn RecordSink,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome> {
        if let (Some(since), Some(until)) = (request.since, request.until) {
            if since > until {
                return Err(Error::invalid_value(
                    "since",
                    format!("{} is after until {}", since.to_rfc3339(), until.to_rfc3339()),
                ));
            }
        }

        let mut state = RunState {
            resource: request.repo.key(),
            mode: request.mode,
            phase: RunPhase::Start,
            previous: None,
            stats: RunStats::new(),
            warnings: Vec::new(),
            unsaved: false,
        };
        self.pending.clear().await;

        let batch_size =
            clamp_batch_size(request.batch_size.unwrap_or(self.config.batch_size));
        let mut fetcher = AdaptiveFetcher::new(Arc::clone(&self.source), batch_size)
            .with_max_attempts(self.config.max_complexity_attempts)
            .with_min_batch_size(self.config.min_batch_size);

        info!(
            repository = %request.repo,
            mode = %request.mode,
            batch_size,
            "Starting extraction"
        );

        let result = self.drain(&request, &mut state, &mut fetcher, sink, cancel).await;
        if let Err(e) = result {
            self.save_on_failure(&mut state, sink).await;
            state.transition(RunPhase::Failed);
            warn!(
                repository = %request.repo,
                records_written = state.stats.records_written,
                "Extraction failed: {}",
                e
            );
            return Err(e);
        }

        state.transition(RunPhase::Finalizing);
        if let Err(e) = sink.close() {
            self.save_on_failure(&mut state, sink).await;
            state.transition(RunPhase::Failed);
            return Err(e);
        }

        let (checkpoint, audit) = self
            .finalize(&request, &mut state, fetcher.batch_size())
            .await;
        self.pending.clear().await;
        state.transition(RunPhase::Done);

        info!(
            repository = %request.repo,
            records_written = state.stats.records_written,
            records_skipped = state.stats.records_skipped,
            pages = state.stats.pages_fetched,
            api_calls = state.stats.api_calls,
            duration_ms = state.stats.elapsed().as_millis() as u64,
            "Extraction complete"
        );

        Ok(RunOutcome {
            phase: state.phase,
            mode: state.mode,
            batch_size: fetcher.batch_size(),
            stats: state.stats,
            checkpoint,
            audit,
            warnings: state.warnings,
        })
    }

    /// Page through the source until the mode's stop condition
    async fn drain(
        &self,
        request: &ExtractRequest,
        state: &mut RunState,
        fetcher: &mut AdaptiveFetcher,
        sink: &mut dyn RecordSink,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut since = request.since;

        if request.mode.is_incremental() {
            state.transition(RunPhase::IncrementalFetch);
            let previous = self.load_previous(request, state).await?;
            if since.is_none() {
                since = Some(previous.last_record_at);
            }
            info!(
                repository = %request.repo,
                last_id = previous.last_id,
                since = ?since,
                "Resuming from checkpoint"
            );
            state.previous = Some(previous);
        } else {
            state.transition(RunPhase::FullFetch);
            if request.mode == FetchMode::All && self.config.report_total {
                self.report_total(request, state, cancel).await?;
            }
        }

        let mut cursor: Option<String> = None;
        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let fetched = fetcher
                .fetch(&request.repo, cursor.as_deref(), since, request.until, cancel)
                .await?;
            state.stats.add_api_calls(fetched.attempts);
            state.stats.add_page();

            let page = fetched.page;
            let mut written = 0u64;
            for record in page.records {
                if state.already_seen(record.number) {
                    state.stats.add_skipped();
                    continue;
                }
                let (number, created_at) = (record.number, record.created_at);
                sink.write(record)?;
                state.stats.record_written(number, created_at);
                state.unsaved = true;
                written += 1;
            }

            info!(
                repository = %request.repo,
                page = state.stats.pages_fetched,
                new = written,
                records = state.stats.records_written,
                total = ?page.total_count,
                batch_size = fetcher.batch_size(),
                "Fetched page"
            );

            if written > 0 {
                if let Some(progress) = state.progress() {
                    self.pending.update(progress).await;
                }
                if self.config.checkpoint_every_page {
                    sink.flush()?;
                    self.save_progress(state).await;
                }
            }

            if !page.has_next_page {
                break;
            }
            match request.mode {
                FetchMode::FirstPage => break,
                FetchMode::Poll if written == 0 => {
                    debug!(repository = %request.repo, "Page had no new records, stopping");
                    break;
                }
                _ => {}
            }
            match page.end_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => {
                    state.warn(format!(
                        "Source reported more pages for {} without a cursor, stopping",
                        request.repo
                    ));
                    break;
                }
            }
            state.transition(RunPhase::Draining);
        }

        Ok(())
    }

    async fn load_previous(
        &self,
        request: &ExtractRequest,
        state: &RunState,
    ) -> Result<Checkpoint> {
        let previous = self.store.load(&state.resource).await?;
        if previous.repository != state.resource {
            return Err(Error::CheckpointMismatch {
                expected: state.resource.clone(),
                found: previous.repository,
            });
        }
        debug!(
            repository = %request.repo,
            total_processed = previous.total_processed,
            "Loaded checkpoint"
        );
        Ok(previous)
    }

    async fn report_total(
        &self,
        request: &ExtractRequest,
        state: &mut RunState,
        cancel: &CancellationToken,
    ) -> Result<()> {
        state.stats.add_api_calls(1);
        match self.source.repository_info(&request.repo, cancel).await {
            Ok(info) => {
                info!(
                    repository = %request.repo,
                    total = info.total_pull_requests,
                    "Fetching all pull requests"
                );
                Ok(())
            }
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(e) => {
                debug!(repository = %request.repo, "Repository total unavailable: {}", e);
                Ok(())
            }
        }
    }

    /// Persist progress mid-run; failures only warn
    async fn save_progress(&self, state: &mut RunState) {
        let Some(progress) = state.progress() else {
            return;
        };
        match self.store.save(&progress).await {
            Ok(saved) => {
                state.unsaved = false;
                debug!(
                    repository = %saved.repository,
                    last_id = saved.last_id,
                    "Progress saved"
                );
            }
            Err(e) => state.warn(format!("Failed to save progress: {e}")),
        }
    }

    async fn save_on_failure(&self, state: &mut RunState, sink: &mut dyn RecordSink) {
        if !state.unsaved {
            return;
        }
        if let Err(e) = sink.flush() {
            state.warn(format!("Failed to flush output: {e}"));
        }
        self.save_progress(state).await;
    }

    async fn finalize(
        &self,
        request: &ExtractRequest,
        state: &mut RunState,
        batch_size: u32,
    ) -> (Option<Checkpoint>, Option<RunAudit>) {
        if state.stats.records_written == 0 {
            info!(repository = %request.repo, "No new pull requests");
            return (None, None);
        }

        let checkpoint = match state.progress() {
            Some(progress) => match self.store.save(&progress).await {
                Ok(saved) => {
                    info!(
                        repository = %saved.repository,
                        last_id = saved.last_id,
                        total_processed = saved.total_processed,
                        path = %self.store.path_for(&saved.repository).display(),
                        "Checkpoint saved"
                    );
                    Some(saved)
                }
                Err(e) => {
                    state.warn(format!("Failed to save checkpoint: {e}"));
                    None
                }
            },
            None => None,
        };

        let previous_run = if request.mode.is_incremental() {
            self.previous_run(state).await
        } else {
            None
        };

        let params = FetchParams {
            organization: request.repo.owner.clone(),
            repository: request.repo.name.clone(),
            since: request.since,
            until: request.until,
            fetch_all: request.mode.is_fetch_all(),
            incremental: request.mode.is_incremental(),
            batch_size,
        };
        let audit = RunAudit::from_stats(&state.stats, params, previous_run);

        match self.audits.save(&audit, request.audit_path.as_deref()).await {
            Ok(path) => debug!(run_id = %audit.run_id, path = %path.display(), "Audit written"),
            Err(e) => state.warn(format!("Failed to write run audit: {e}")),
        }

        (checkpoint, Some(audit))
    }

    async fn previous_run(&self, state: &mut RunState) -> Option<RunRef> {
        match self.audits.latest(&state.resource).await {
            Ok(latest) => latest.map(|audit| audit.reference()),
            Err(e) => {
                state.warn(format!("Failed to load previous run audit: {e}"));
                None
            }
        }
    }
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("store", &self.store)
            .field("audits", &self.audits)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
