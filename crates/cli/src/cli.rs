//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Geo Enricher - geolocation telemetry enrichment consumer
#[derive(Parser, Debug)]
#[command(
    name = "geo-enricher",
    author,
    version,
    about = "Pub/Sub -> Maps enrichment -> BigQuery consumer",
    long_about = "Pulls vehicle telemetry from a Pub/Sub subscription, adds street address,\n\
                  postal code, elevation and UTC offset from the Maps web services under a\n\
                  call quota, streams each row into BigQuery, then acknowledges the batch."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "GEO_ENRICHER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "GEO_ENRICHER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the consumer until interrupted
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "GEO_ENRICHER_CONFIG"
    )]
    pub config: PathBuf,

    /// Override the subscription (short name or full path)
    #[arg(long, env = "PUBSUB_SUBSCRIPTION")]
    pub subscription: Option<String>,

    /// Override messages requested per pull (1-1000)
    #[arg(long, env = "GEO_ENRICHER_BATCH_SIZE")]
    pub batch_size: Option<usize>,

    /// Override enrichments permitted before a cooldown
    #[arg(long, env = "GEO_ENRICHER_QUOTA_LIMIT")]
    pub quota_limit: Option<u32>,

    /// Override cooldown length in seconds
    #[arg(long, env = "GEO_ENRICHER_COOLDOWN_SECS")]
    pub cooldown_secs: Option<u64>,

    /// Maps web-service API key
    #[arg(long, env = "MAPS_API_KEY", hide_env_values = true)]
    pub maps_api_key: Option<String>,

    /// Override the Pub/Sub API endpoint
    #[arg(long, env = "GEO_ENRICHER_PUBSUB_ENDPOINT")]
    pub pubsub_endpoint: Option<String>,

    /// Pub/Sub emulator `host:port`; queue calls go there without credentials
    #[arg(long, env = "PUBSUB_EMULATOR_HOST")]
    pub emulator_host: Option<String>,

    /// Override the sink kind
    #[arg(long, value_enum)]
    pub sink: Option<SinkArg>,

    /// Output path for the file sink
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Validate configuration and exit without consuming
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "GEO_ENRICHER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

/// Sink selection on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkArg {
    Bigquery,
    Log,
    File,
}

impl From<SinkArg> for contracts::SinkKind {
    fn from(sink: SinkArg) -> Self {
        match sink {
            SinkArg::Bigquery => Self::BigQuery,
            SinkArg::Log => Self::Log,
            SinkArg::File => Self::File,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_overrides() {
        let cli = Cli::try_parse_from([
            "geo-enricher",
            "run",
            "--config",
            "consumer.toml",
            "--batch-size",
            "50",
            "--quota-limit",
            "3",
            "--sink",
            "log",
            "--metrics-port",
            "0",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.config, PathBuf::from("consumer.toml"));
        assert_eq!(args.batch_size, Some(50));
        assert_eq!(args.quota_limit, Some(3));
        assert_eq!(args.sink, Some(SinkArg::Log));
        assert_eq!(args.metrics_port, 0);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["geo-enricher", "-q", "-v", "validate"]);
        assert!(result.is_err());
    }
}
