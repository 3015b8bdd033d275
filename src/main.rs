// Allow common clippy pedantic lints
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_pass_by_value)]

//! pr-relay CLI
//!
//! Streams pull requests to stdout or a file; logs go to stderr.

use clap::Parser;
use pr_relay::cli::{exit_code, Cli, Runner, EXIT_CANCELLED};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, saving progress");
            on_signal.cancel();
        }
    });

    let runner = Runner::new(cli);
    if let Err(e) = runner.run(&cancel).await {
        let code = exit_code(&e);
        if code == EXIT_CANCELLED {
            eprintln!("Cancelled. Re-run with --incremental --all to resume.");
        } else {
            eprintln!("Error: {e}");
        }
        std::process::exit(code);
    }
}
