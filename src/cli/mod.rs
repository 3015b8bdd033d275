//! CLI module
//!
//! Command-line interface for extracting pull requests.
//!
//! # Commands
//!
//! - `fetch <owner>/<name>` - stream pull requests as NDJSON, optionally
//!   resuming from the repository's checkpoint

mod commands;
mod dates;
mod runner;

pub use commands::{Cli, Commands, FetchArgs};
pub use dates::parse_date;
pub use runner::{exit_code, Runner, EXIT_CANCELLED};

#[cfg(test)]
mod tests;
