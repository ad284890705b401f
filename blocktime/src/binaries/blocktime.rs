use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use blocktime::config::BlocktimeConfig;
use blocktime::logging::init_logging;
use blocktime::{Locator, Timestamp};
use clap::Parser;
use tracing::{error, info};
use url::Url;

/// Timestamps looked up when none are given.
const EXAMPLES: [u64; 2] = [1232103989, 1637430034];

#[derive(Parser, Debug)]
struct Cli {
    /// Path to a TOML configuration file.
    #[clap(long, short)]
    config: Option<PathBuf>,

    /// Base URL of the block explorer API.
    #[clap(long, env = "BLOCKTIME_BASE_URL")]
    base_url: Option<Url>,

    /// Point in time to look up, as unix seconds or RFC 3339.
    ///
    /// May be given more than once. Defaults to two example queries.
    #[clap(long, short)]
    timestamp: Vec<Timestamp>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_logging();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => BlocktimeConfig::read(path)
            .with_context(|| format!("could not read config {path:?}"))?,
        None => BlocktimeConfig::default(),
    };

    let cfg = config
        .explorer
        .into_config("blocktime", cli.base_url)
        .context("invalid explorer base url")?;

    info!(url = %cfg.base_url(), "using block explorer");

    let client = explorer::Client::new(cfg)?;
    let locator = Locator::new(client);

    let targets = if cli.timestamp.is_empty() {
        EXAMPLES.map(Timestamp::from).to_vec()
    } else {
        cli.timestamp
    };

    let mut failed = false;
    for target in targets {
        match locator.locate(target).await {
            Ok(found) => {
                println!(
                    "{target} ({}) -> block #{} after {} lookups",
                    target.to_iso8601(),
                    found.height,
                    found.stats.lookups
                )
            }
            Err(err) => {
                error!(%target, %err, "query failed");
                failed = true
            }
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
