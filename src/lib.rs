#![recursion_limit = "256"]
// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # pr-relay
//!
//! Resumable extraction of a repository's pull requests from a GraphQL
//! search API into newline-delimited JSON.
//!
//! ## Features
//!
//! - **Adaptive paging**: halves the batch size when the source rejects a
//!   query as too complex, then keeps the smaller size
//! - **Rate-limit aware transport**: waits out exhausted windows, retries
//!   transient failures with jittered backoff, caps response sizes
//! - **Checkpoints**: checksummed, atomically written progress markers that
//!   make interrupted runs resumable
//! - **Run audits**: one JSON summary per run, linked to the previous run
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pr_relay::engine::{ExtractRequest, Extractor};
//! use pr_relay::github::GraphQLClient;
//! use pr_relay::output::NdjsonWriter;
//! use pr_relay::{FetchMode, RepoRef};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! let source = Arc::new(GraphQLClient::new(token, pr_relay::http::DEFAULT_ENDPOINT)?);
//! let extractor = Extractor::new(source, "/var/lib/pr-relay");
//! let mut sink = NdjsonWriter::stdout();
//!
//! let request = ExtractRequest::new(RepoRef::new("golang", "go"), FetchMode::Resume);
//! let outcome = extractor.run(request, &mut sink, &CancellationToken::new()).await?;
//! eprintln!("{} new pull requests", outcome.records_written());
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Extractor (engine)                          │
//! │  Start → Full/IncrementalFetch → Draining → Finalizing → Done   │
//! └─────────────────────────────────────────────────────────────────┘
//!          │                 │                  │             │
//! ┌────────┴──────┐ ┌────────┴───────┐ ┌────────┴─────┐ ┌─────┴──────┐
//! │ AdaptiveFetch │ │  Checkpoint    │ │    Audit     │ │   Output   │
//! ├───────────────┤ ├────────────────┤ ├──────────────┤ ├────────────┤
//! │ GraphQLClient │ │ SHA-256 seal   │ │ RunStats     │ │ NDJSON     │
//! │ auth → size → │ │ atomic rename  │ │ RunAudit     │ │            │
//! │ rate → retry  │ │ pending flush  │ │ previous run │ │            │
//! └───────────────┘ └────────────────┘ └──────────────┘ └────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types and classification
pub mod error;

/// Common types
pub mod types;

/// Credential application
pub mod auth;

/// Transport with retry, rate-limit handling and size limits
pub mod http;

/// GraphQL API client and mock source
pub mod github;

/// Complexity-adaptive page fetching
pub mod fetch;

/// Checkpoint persistence
pub mod checkpoint;

/// Run statistics and audits
pub mod audit;

/// Record sinks
pub mod output;

/// Extraction orchestrator
pub mod engine;

/// Configuration file and environment overrides
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, ErrorKind, Result};
pub use types::*;

pub use engine::{ExtractRequest, Extractor, RunOutcome};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
