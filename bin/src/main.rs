//! augur CLI binary.
//!
//! Runs rating evaluations against an HTTP rating service and manages the
//! signal cache.

mod cmd;
mod data;

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cmd::cache::{cache_stats, invalidate_entry};
use crate::cmd::run::{RunArgs, evaluate_ratings};

#[derive(Parser)]
#[command(name = "augur")]
#[command(about = "Evaluate AI stock ratings against forward returns", long_about = None)]
#[command(version)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an evaluation and write its artifacts
    Run(RunArgs),

    /// Inspect or edit the signal cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show the entry count and rating distribution
    Stats {
        /// Cache file
        #[arg(short, long)]
        path: PathBuf,
    },

    /// Remove one entry so the next run rates it again
    Invalidate {
        /// Cache file
        #[arg(short, long)]
        path: PathBuf,

        /// Ticker symbol
        #[arg(short, long)]
        ticker: String,

        /// Decision date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

/// Logs go to stderr so the printed summary stays clean on stdout.
fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run(args) => {
            evaluate_ratings(args).await?;
        }
        Commands::Cache { action } => match action {
            CacheAction::Stats { path } => {
                cache_stats(&path)?;
            }
            CacheAction::Invalidate { path, ticker, date } => {
                invalidate_entry(&path, &ticker, &date)?;
            }
        },
    }

    Ok(())
}
