//! Dexcom Share CLI
//!
//! One-shot command that:
//! 1. Loads TOML config (password from env or file)
//! 2. Builds a `dexcom_client::Client` with the configured session cache
//! 3. Fetches readings and prints them as JSON on stdout
//!
//! Logs go to stderr as JSON so stdout stays machine-readable.

mod config;
mod error;
mod metrics;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dexcom_client::{
    Client, FileSessionCache, MAX_MAX_COUNT, MAX_MINUTES, MemorySessionCache, SessionCache,
};
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{CacheKind, Config};

#[derive(Debug, Parser)]
#[command(name = "dexcom-share", version, about = "Read glucose values from Dexcom Share")]
struct Cli {
    /// Config file (defaults to $DEXCOM_SHARE_CONFIG, then ./dexcom-share.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print Prometheus metrics to stderr before exiting
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Most recent reading from the last 10 minutes
    Current,
    /// Most recent reading from the last 24 hours
    Latest,
    /// All readings in a time window, newest first
    Readings(ReadingsArgs),
}

#[derive(Debug, Args)]
struct ReadingsArgs {
    /// Window size in minutes (1-1440)
    #[arg(long, default_value_t = MAX_MINUTES)]
    minutes: u32,

    /// Maximum number of readings (1-288)
    #[arg(long, default_value_t = MAX_MAX_COUNT)]
    max_count: u32,
}

/// Build the client described by `config`. Performs no network I/O.
fn build_client(config: &Config) -> Result<Client> {
    let account = &config.account;
    let password = account
        .password
        .as_ref()
        .context("password was not resolved")?;

    let cache: Arc<dyn SessionCache> = match config.session.cache {
        CacheKind::Memory => Arc::new(MemorySessionCache::new()),
        CacheKind::File => {
            let path = config
                .session
                .cache_path
                .clone()
                .context("cache = \"file\" requires session.cache_path")?;
            Arc::new(FileSessionCache::new(
                path,
                Duration::from_millis(config.session.cache_timeout_ms),
            ))
        }
    };

    let mut builder = Client::builder()
        .password(password.expose())
        .region(account.region)
        .cache(cache)
        .session_ttl(Duration::from_secs(config.session.ttl_secs))
        .timeout(Duration::from_secs(config.http.timeout_secs))
        .retry_policy(config.retry.policy());
    if let Some(username) = &account.username {
        builder = builder.username(username.clone());
    }
    if let Some(account_id) = &account.account_id {
        builder = builder.account_id(account_id.clone());
    }
    if let Some(base_url) = &config.http.base_url {
        builder = builder.base_url(base_url.clone());
    }

    builder.build().context("invalid client configuration")
}

/// Run one subcommand and return its JSON output.
async fn execute(client: &Client, command: &Command) -> Result<Value> {
    let output = match command {
        Command::Current => {
            let reading = client.get_current_glucose_reading().await?;
            if reading.is_none() {
                warn!("no reading in the last 10 minutes");
            }
            serde_json::to_value(reading)
        }
        Command::Latest => serde_json::to_value(client.get_latest_glucose_reading().await?),
        Command::Readings(args) => {
            let readings = client
                .get_glucose_readings(args.minutes, args.max_count)
                .await?;
            info!(count = readings.len(), "readings received");
            serde_json::to_value(readings)
        }
    };
    output.context("failed to serialize readings")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    // Install before the client exists so every counter is captured
    let prometheus = if cli.metrics {
        Some(metrics::install_recorder()?)
    } else {
        None
    };

    let config_path = Config::resolve_path(cli.config.as_deref());
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        region = %config.account.region,
        cache = ?config.session.cache,
        ttl_secs = config.session.ttl_secs,
        "configuration loaded"
    );

    let client = build_client(&config)?;
    let result = execute(&client, &cli.command).await;

    if let Some(handle) = prometheus {
        eprint!("{}", handle.render());
    }

    let output = result.context("Dexcom Share request failed")?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
