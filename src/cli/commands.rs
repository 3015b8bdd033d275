//! CLI commands and argument parsing

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Resumable pull request extraction to NDJSON
#[derive(Parser, Debug)]
#[command(name = "pr-relay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch pull requests of a repository
    Fetch(FetchArgs),
}

/// Arguments of `fetch`
#[derive(Args, Debug, Clone, Default)]
pub struct FetchArgs {
    /// Repository as `owner/name`
    pub repository: String,

    /// Access token (defaults to the configured token environment variable)
    #[arg(long)]
    pub token: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Fetch every page instead of only the first
    #[arg(long)]
    pub all: bool,

    /// Only pull requests created at or after this time
    /// (RFC 3339, YYYY-MM-DD, or relative like 7d / 2w)
    #[arg(long)]
    pub since: Option<String>,

    /// Only pull requests created at or before this time
    #[arg(long)]
    pub until: Option<String>,

    /// Continue from the repository's checkpoint
    #[arg(long)]
    pub incremental: bool,

    /// Pull requests per request (1-100)
    #[arg(long)]
    pub batch_size: Option<u32>,

    /// Also write the run audit to this file
    #[arg(long)]
    pub metadata_file: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub request_timeout: Option<u64>,
}
