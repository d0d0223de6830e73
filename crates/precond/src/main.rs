//! Precond: a conditional-write verification harness for S3-compatible
//! object stores.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use precond_core::config::{Config, LogFormat};
use precond_harness::report;
use precond_store::S3StoreFactory;
use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod cli;

use cli::{CheckArgs, Cli, Commands, OutputFormat};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check(args) => run_check(args).await,
        Commands::Version => {
            println!("precond {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
    }
}

/// Exit contract: 0 all scenarios passed, 1 one or more failed, 2 the
/// harness could not run at all (bad config, store unreachable).
async fn run_check(args: CheckArgs) -> ExitCode {
    match check(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("precond: {err:#}");
            ExitCode::from(2)
        }
    }
}

async fn check(args: CheckArgs) -> Result<bool> {
    let mut config =
        Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    apply_cli_overrides(&mut config, &args);
    config.validate().context("Invalid configuration")?;

    init_logging(&config)?;
    print_banner(&config);

    let factory = S3StoreFactory::new(config.store.clone());
    let summary = precond_harness::run(&factory, &config)
        .await
        .context("Harness could not run")?;

    match args.format {
        OutputFormat::Text => print!("{}", report::render_text(&summary)),
        OutputFormat::Json => {
            println!("{}", report::render_json(&summary).context("Failed to render summary")?);
        }
    }

    if !summary.all_passed() {
        warn!(
            "some scenarios failed; the store may not support conditional writes \
             (If-Match / If-None-Match) or its implementation needs adjustment"
        );
    }

    Ok(summary.all_passed())
}

fn apply_cli_overrides(config: &mut Config, args: &CheckArgs) {
    if let Some(endpoint) = &args.endpoint {
        config.store.endpoint = endpoint.clone();
    }
    if let Some(bucket) = &args.bucket {
        config.store.bucket = bucket.clone();
    }
    if let Some(access_key) = &args.access_key {
        config.store.access_key = access_key.clone();
    }
    if let Some(secret_key) = &args.secret_key {
        config.store.secret_key = secret_key.clone();
    }
    if let Some(writers) = args.writers {
        config.race.writers = writers;
    }
    if let Some(workers) = args.workers {
        config.counter.workers = workers;
    }
}

fn init_logging(config: &Config) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry().with(filter).with(fmt_layer.json()).init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry().with(filter).with(fmt_layer).init();
        }
    }

    Ok(())
}

fn print_banner(config: &Config) {
    println!(
        r#"
  precond v{} - S3 conditional-write verification

  Endpoint:    {}
  Bucket:      {}
  Access Key:  {}
  Secret Key:  {}
  Race:        {} writers
  Counter:     {} workers, {} attempts each
"#,
        env!("CARGO_PKG_VERSION"),
        config.store.endpoint,
        config.store.bucket,
        config.store.access_key,
        mask_secret(&config.store.secret_key),
        config.race.writers,
        config.counter.workers,
        config.counter.max_attempts,
    );
}

fn mask_secret(secret: &str) -> String {
    if secret.len() <= 4 {
        "*".repeat(secret.len())
    } else {
        format!("{}****", &secret[..4])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("abc"), "***");
        assert_eq!(mask_secret("minioadmin"), "mini****");
    }

    #[test]
    fn test_cli_overrides_take_precedence() {
        let mut config = Config::default();
        let args = CheckArgs {
            config: None,
            endpoint: Some("http://127.0.0.1:9100".to_string()),
            bucket: None,
            access_key: None,
            secret_key: None,
            writers: Some(3),
            workers: None,
            format: OutputFormat::Text,
        };

        apply_cli_overrides(&mut config, &args);
        assert_eq!(config.store.endpoint, "http://127.0.0.1:9100");
        assert_eq!(config.race.writers, 3);
        // Untouched fields keep their values.
        assert_eq!(config.store.bucket, "testbucket");
        assert_eq!(config.counter.workers, 10);
    }
}
