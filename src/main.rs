//! gridrun - Remote browser-grid test campaign runner
//!
//! Main entry point for the CLI application.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use url::Url;

use gridrun::core::{CampaignFile, Config};
use gridrun::grid::RemoteGrid;
use gridrun::runner::{Campaign, ExitCoordinator};

/// gridrun - Remote browser-grid test campaign runner
#[derive(Parser, Debug)]
#[command(name = "gridrun")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the campaign configuration JSON file
    config: PathBuf,

    /// URL of the page under test
    url: String,

    /// Enable debug output
    #[arg(long, short = 'd')]
    debug: bool,

    /// Override total attempts per browser (initial launch + retries)
    #[arg(long)]
    max_attempts: Option<usize>,
}

#[tokio::main]
async fn main() {
    // Missing or malformed arguments are a usage error before any
    // orchestration begins
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(error) => {
            let _ = error.print();
            process::exit(1);
        }
    };

    let coordinator = Arc::new(ExitCoordinator::new());

    let (config, file, test_url) = match prepare(&args) {
        Ok(inputs) => inputs,
        Err(error) => {
            eprintln!("Setup error: {:#}", error);
            coordinator.set_exit_status(1);
            process::exit(coordinator.wait_for_exit().await);
        }
    };

    let grid = Arc::new(RemoteGrid::from_config(&config));
    let campaign = Campaign::new(file, test_url, &config, grid, Arc::clone(&coordinator));

    let code = match campaign.run().await {
        Ok(report) => {
            report.print_summary();
            report.exit_code()
        }
        Err(error) => {
            eprintln!("Campaign orchestration failed: {}", error);
            2
        }
    };

    // The exit gate also covers reports still settling; it releases once the
    // pending count returns to zero.
    coordinator.set_exit_status(code);
    process::exit(coordinator.wait_for_exit().await);
}

/// Assemble configuration from the environment, the campaign file, and CLI
/// overrides. Any failure here is fatal before a single run starts.
fn prepare(args: &Args) -> anyhow::Result<(Config, CampaignFile, String)> {
    let mut config = Config::load().context("loading environment configuration")?;

    if args.debug {
        config.runner.debug = true;
    }
    if let Some(max_attempts) = args.max_attempts {
        config.runner.max_attempts = max_attempts;
    }

    let file = CampaignFile::load(&args.config)?;

    let test_url = Url::parse(&args.url)
        .with_context(|| format!("invalid test page URL '{}'", args.url))?;

    Ok((config, file, test_url.to_string()))
}
