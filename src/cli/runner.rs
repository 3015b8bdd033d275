//! CLI runner - executes commands

use crate::auth::AuthConfig;
use crate::checkpoint::{CheckpointStore, PendingCheckpoint};
use crate::cli::commands::{Cli, Commands, FetchArgs};
use crate::cli::dates::parse_date;
use crate::config::Config;
use crate::engine::{ExtractConfig, ExtractRequest, Extractor, RunOutcome};
use crate::error::{Error, ErrorKind, Result};
use crate::github::{GraphQLClient, MAX_BATCH_SIZE};
use crate::http::HttpClient;
use crate::output::{NdjsonWriter, RecordSink};
use crate::types::{FetchMode, RepoRef};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Exit code of a failed run that fits no other class
pub const EXIT_GENERIC: i32 = 1;
/// Exit code for authentication, not-found and rate-limit failures
pub const EXIT_API: i32 = 2;
/// Exit code for network failures
pub const EXIT_NETWORK: i32 = 3;
/// Exit code for missing, corrupt, incompatible or mismatched checkpoints
pub const EXIT_CHECKPOINT: i32 = 4;
/// Exit code when the query stayed too complex at the smallest batch size
pub const EXIT_COMPLEXITY: i32 = 5;
/// Exit code after Ctrl-C
pub const EXIT_CANCELLED: i32 = 130;

/// Process exit code for `err`
pub fn exit_code(err: &Error) -> i32 {
    match err.kind() {
        ErrorKind::Auth | ErrorKind::NotFound | ErrorKind::RateLimit => EXIT_API,
        ErrorKind::Network => EXIT_NETWORK,
        ErrorKind::CheckpointMissing
        | ErrorKind::CheckpointCorrupt
        | ErrorKind::CheckpointIncompatible
        | ErrorKind::CheckpointMismatch => EXIT_CHECKPOINT,
        ErrorKind::QueryTooComplex => EXIT_COMPLEXITY,
        ErrorKind::Cancelled => EXIT_CANCELLED,
        ErrorKind::Generic => EXIT_GENERIC,
    }
}

/// A `fetch` invocation with flags, config and environment resolved
#[derive(Clone)]
pub(crate) struct FetchPlan {
    pub repo: RepoRef,
    pub mode: FetchMode,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub batch_size: u32,
    pub token: String,
    pub output: Option<PathBuf>,
    pub metadata_file: Option<PathBuf>,
}

impl std::fmt::Debug for FetchPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchPlan")
            .field("repo", &self.repo)
            .field("mode", &self.mode)
            .field("since", &self.since)
            .field("until", &self.until)
            .field("batch_size", &self.batch_size)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

impl FetchPlan {
    /// Resolve `args` against `config`, reading the token through `env`
    pub(crate) fn resolve<F>(
        args: &FetchArgs,
        config: &Config,
        now: DateTime<Utc>,
        env: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let repo = RepoRef::parse(&args.repository).ok_or_else(|| {
            Error::invalid_value(
                "repository",
                format!("expected <owner>/<name>, got '{}'", args.repository),
            )
        })?;

        let since = args
            .since
            .as_deref()
            .map(|v| parse_date("since", v, now))
            .transpose()?;
        let until = args
            .until
            .as_deref()
            .map(|v| parse_date("until", v, now))
            .transpose()?;
        if let (Some(since), Some(until)) = (since, until) {
            if since > until {
                return Err(Error::invalid_value(
                    "since",
                    "--since must not be after --until",
                ));
            }
        }

        let batch_size = match args.batch_size {
            Some(size) if size == 0 || size > MAX_BATCH_SIZE => {
                return Err(Error::invalid_value(
                    "batch-size",
                    format!("must be between 1 and {MAX_BATCH_SIZE}, got {size}"),
                ))
            }
            Some(size) => size,
            None => config.batch_size_for(&repo.key()),
        };

        let token = args
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| env(&config.github.token_env).filter(|t| !t.is_empty()))
            .ok_or_else(|| {
                Error::auth(format!(
                    "no token found. Set {} or use --token",
                    config.github.token_env
                ))
            })?;

        Ok(Self {
            repo,
            mode: FetchMode::from_flags(args.incremental, args.all),
            since,
            until,
            batch_size,
            token,
            output: args.output.clone(),
            metadata_file: args.metadata_file.clone(),
        })
    }

    fn request(&self) -> ExtractRequest {
        ExtractRequest::new(self.repo.clone(), self.mode)
            .since(self.since)
            .until(self.until)
            .batch_size(Some(self.batch_size))
            .audit_path(self.metadata_file.clone())
    }
}

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parsed command line
    pub fn cli(&self) -> &Cli {
        &self.cli
    }

    /// Run the CLI command
    pub async fn run(&self, cancel: &CancellationToken) -> Result<()> {
        match &self.cli.command {
            Commands::Fetch(args) => self.fetch(args, cancel).await.map(|_| ()),
        }
    }

    /// Run `fetch`
    pub async fn fetch(&self, args: &FetchArgs, cancel: &CancellationToken) -> Result<RunOutcome> {
        let mut config = Config::load(self.cli.config.as_deref())?;
        if let Some(timeout) = args.request_timeout {
            config.defaults.request_timeout_secs = timeout;
        }
        config.validate()?;

        let plan = FetchPlan::resolve(args, &config, Utc::now(), |key| std::env::var(key).ok())?;
        debug!(?plan, state_dir = %config.defaults.state_dir.display(), "Resolved fetch");

        let state_dir = config.defaults.state_dir.clone();
        let pending = Arc::new(PendingCheckpoint::new(CheckpointStore::new(&state_dir)));
        let http = HttpClient::with_auth(
            config.http_client_config(),
            AuthConfig::bearer(plan.token.clone()),
        )?
        .with_wait_hook(pending.clone());
        let source = Arc::new(GraphQLClient::with_http(http));

        let extractor = Extractor::new(source, &state_dir)
            .with_config(ExtractConfig::new().with_batch_size(plan.batch_size))
            .with_pending(pending);

        let mut sink: Box<dyn RecordSink> = match &plan.output {
            Some(path) => Box::new(NdjsonWriter::create(path)?),
            None => Box::new(NdjsonWriter::stdout()),
        };

        let outcome = extractor
            .run(plan.request(), sink.as_mut(), cancel)
            .await?;

        info!(
            repository = %plan.repo,
            mode = %outcome.mode,
            records = outcome.records_written(),
            skipped = outcome.records_skipped(),
            warnings = outcome.warnings.len(),
            "Done"
        );
        Ok(outcome)
    }
}
