//! Atelier - retrieval-augmented coding assistant command-line interface
#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    reason = "The CLI streams generated output and progress to the terminal"
)]

use anyhow::Result;
use clap::Parser as _;
use tracing_subscriber::EnvFilter;

use cli::Cli;

mod cli;
mod handlers;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so streamed generation output owns stdout.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    handlers::run(cli).await
}
