//! # Geo Enricher CLI
//!
//! Command-line entry point.
//!
//! Provides:
//! - Configuration loading and validation
//! - Consumer wiring and lifecycle
//! - Graceful shutdown on Ctrl+C / SIGTERM

mod cli;
mod commands;
mod error;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_consumer, run_info, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let logging = ObservabilityConfig {
        log_format: cli.log_format.into(),
        quiet: cli.quiet,
        ..Default::default()
    }
    .with_verbosity(cli.verbose);
    observability::init_tracing(&logging)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Geo Enricher starting");

    let result = match &cli.command {
        Commands::Run(args) => run_consumer(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}
