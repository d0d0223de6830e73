//! Command line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Precond: a conditional-write verification harness for S3-compatible
/// object stores.
#[derive(Parser)]
#[command(name = "precond")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run the conditional-write verification suite against a store.
    Check(CheckArgs),
    /// Print version information.
    Version,
}

/// Arguments for the check command.
#[derive(Args)]
pub struct CheckArgs {
    /// Path to configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Store endpoint URL (overrides config and S3_ENDPOINT).
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Bucket to run against (overrides config and S3_BUCKET).
    #[arg(long)]
    pub bucket: Option<String>,

    /// Access key ID (overrides config and AWS_ACCESS_KEY_ID).
    #[arg(long)]
    pub access_key: Option<String>,

    /// Secret access key (overrides config and AWS_SECRET_ACCESS_KEY).
    #[arg(long)]
    pub secret_key: Option<String>,

    /// Number of concurrent writers in the race scenario (overrides config).
    #[arg(long)]
    pub writers: Option<u32>,

    /// Number of concurrent incrementers in the counter scenario
    /// (overrides config).
    #[arg(long)]
    pub workers: Option<u32>,

    /// Output format for the final summary (text, json).
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Output format for the final summary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}
