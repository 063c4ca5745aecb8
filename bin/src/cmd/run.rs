//! Evaluation run command implementation.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use augur::http::HttpRatingProvider;
use augur::signals::CsvSignalStore;
use augur::{Dataset, Date, EvaluationReport, ProviderError, RatingProvider, RatingResponse, RunConfig};
use clap::Args;
use tracing::info;

use crate::cmd::{print_banner, print_section};
use crate::data::{fmt_opt, fmt_pct, load_dataset, parse_date};

/// Arguments of `augur run`.
#[derive(Debug, Args)]
pub(crate) struct RunArgs {
    /// Recommendations CSV (ticker, date, rating[, sector])
    #[arg(long)]
    pub(crate) ratings: PathBuf,

    /// Prices CSV (ticker, date, open, close)
    #[arg(long)]
    pub(crate) prices: PathBuf,

    /// News CSV (ticker, date, headline)
    #[arg(long)]
    pub(crate) news: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    pub(crate) config: Option<PathBuf>,

    /// First decision date (YYYY-MM-DD)
    #[arg(long)]
    pub(crate) start: Option<String>,

    /// Last decision date (YYYY-MM-DD)
    #[arg(long)]
    pub(crate) end: Option<String>,

    /// Primary horizon in trading days
    #[arg(short = 'H', long)]
    pub(crate) horizon: Option<usize>,

    /// Cap on the number of evaluated samples
    #[arg(long)]
    pub(crate) max_samples: Option<usize>,

    /// Transaction cost per side in basis points
    #[arg(long)]
    pub(crate) cost_bps: Option<f64>,

    /// Artifact directory
    #[arg(short, long)]
    pub(crate) output_dir: Option<PathBuf>,

    /// First decision date of the holdout period (YYYY-MM-DD)
    #[arg(long)]
    pub(crate) holdout_start: Option<String>,

    /// Only use cached signals; never call the rating service
    #[arg(long)]
    pub(crate) cache_only: bool,
}

/// Provider for cache-only runs. The generator never calls it.
#[derive(Debug)]
struct CacheOnlyProvider;

impl RatingProvider for CacheOnlyProvider {
    fn name(&self) -> &str {
        "cache-only"
    }

    async fn rate(&self, ticker: &str, as_of_date: Date) -> Result<RatingResponse, ProviderError> {
        Err(ProviderError::Unavailable {
            ticker: ticker.to_string(),
            as_of_date,
        })
    }
}

/// Build the run configuration: file (or defaults), then flag overrides.
pub(crate) fn build_config(args: &RunArgs) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::from_toml_file(path)?,
        None => RunConfig::default(),
    };

    if let Some(start) = &args.start {
        config.start_date = parse_date(start)?;
    }
    if let Some(end) = &args.end {
        config.end_date = parse_date(end)?;
    }
    if let Some(holdout) = &args.holdout_start {
        config.holdout_start = parse_date(holdout)?;
    }
    if let Some(horizon) = args.horizon {
        config.primary_horizon = horizon;
    }
    if let Some(max) = args.max_samples {
        config.max_samples = Some(max);
    }
    if let Some(bps) = args.cost_bps {
        config.cost_per_side_bps = bps;
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir.clone_from(dir);
    }
    config.cache_only |= args.cache_only;

    config.validate()?;
    Ok(config)
}

/// Run an evaluation and print its summary.
pub(crate) async fn evaluate_ratings(args: RunArgs) -> Result<()> {
    print_banner("Rating Evaluation");

    let config = build_config(&args)?;
    let dataset: Arc<dyn Dataset> = Arc::new(load_dataset(&args.ratings, &args.prices, args.news.as_deref())?);
    let store = CsvSignalStore::new(config.cache_path());

    println!("Period:   {} to {}", config.start_date, config.end_date);
    println!("Horizon:  {} days (decay: {:?})", config.primary_horizon, config.horizons);
    println!("Costs:    {} bps per side", config.cost_per_side_bps);
    println!("Cache:    {}", config.cache_path().display());
    println!();

    let report = if config.cache_only {
        info!("cache-only run, the rating service will not be called");
        augur::run_evaluation(&config, dataset.as_ref(), CacheOnlyProvider, store).await?
    } else {
        let provider = HttpRatingProvider::from_env()
            .context("rating service is not configured")?
            .with_timeout(Duration::from_secs(config.provider_timeout_secs))?;
        let provider = if args.news.is_some() {
            provider.with_news(Arc::clone(&dataset), config.news_window_days)
        } else {
            provider
        };
        info!(url = provider.base_url(), "rating via HTTP service");
        augur::run_evaluation(&config, dataset.as_ref(), provider, store).await?
    };

    print_report(&report);
    println!("Artifacts written to {}", config.output_dir.display());
    Ok(())
}

fn print_report(report: &EvaluationReport) {
    let summary = &report.summary;

    print_section("COVERAGE");
    let coverage = &summary.coverage;
    println!("  Samples:        {:>8}", coverage.total_samples);
    println!("  With signal:    {:>8}", coverage.with_signal);
    println!("  With return:    {:>8}", coverage.with_primary_return);
    println!("  Usable:         {:>8}", coverage.usable);
    println!("  Reused:         {:>8}", coverage.reused_signals);
    println!("  Generated:      {:>8}", coverage.generated_signals);
    println!("  Failed keys:    {:>8}", coverage.failed_keys);
    println!("  Data gaps:      {:>8}", coverage.data_gap_tickers);
    println!();

    print_section(&format!("INFORMATION COEFFICIENT (horizon = {} days)", summary.primary_horizon));
    for (label, ic) in [("AI signal", &summary.ic), ("Human rating", &summary.human_ic)] {
        println!("{label}:");
        println!("  Mean IC:     {:>8}", fmt_opt(ic.mean_ic, 4));
        println!("  IC Std Dev:  {:>8}", fmt_opt(ic.std_ic, 4));
        println!("  t-stat:      {:>8}", fmt_opt(ic.t_stat, 2));
        println!("  NW t-stat:   {:>8}  ({} lags)", fmt_opt(ic.nw_t_stat, 2), ic.nw_lags);
        println!("  Hit Rate:    {:>8}", fmt_pct(ic.hit_ratio));
        println!("  Dates:       {:>8}  ({} with IC)", ic.n_dates, ic.n_obs);
        println!();
    }

    println!("IC Decay (by horizon):");
    for row in &summary.decay.rows {
        println!(
            "  {:>3} days:   {:>8}  t={:>6}",
            row.horizon,
            fmt_opt(row.mean_ic, 4),
            fmt_opt(row.nw_t_stat, 2)
        );
    }
    if let Some(half_life) = summary.decay.half_life {
        println!("  Half-life:  {half_life:>8.1} days");
    }
    println!();

    print_section("LONG/SHORT BACKTEST");
    println!("{:<18} {:>12} {:>12}", "", "Net", "Gross");
    let (net, gross) = (&summary.performance, &summary.gross_performance);
    println!("{:<18} {:>12} {:>12}", "Total Return", fmt_pct(net.total_return), fmt_pct(gross.total_return));
    println!("{:<18} {:>12} {:>12}", "CAGR", fmt_pct(net.cagr), fmt_pct(gross.cagr));
    println!(
        "{:<18} {:>12} {:>12}",
        "Volatility",
        fmt_pct(net.annualized_volatility),
        fmt_pct(gross.annualized_volatility)
    );
    println!("{:<18} {:>12} {:>12}", "Sharpe", fmt_opt(net.sharpe, 2), fmt_opt(gross.sharpe, 2));
    println!(
        "{:<18} {:>12} {:>12}",
        "Max Drawdown",
        fmt_pct(net.max_drawdown),
        fmt_pct(gross.max_drawdown)
    );
    println!("{:<18} {:>12}", "Avg Turnover", fmt_opt(summary.avg_turnover, 3));
    println!("{:<18} {:>12}", "Total Costs", fmt_pct(Some(summary.total_transaction_costs)));
    println!();

    print_section("HUMAN CONSENSUS ALIGNMENT");
    println!("{:<16} {:>8} {:>12} {:>10}", "Bucket", "Count", "Mean Ret", "Mean IC");
    for bucket in &summary.consensus {
        println!(
            "{:<16} {:>8} {:>12} {:>10}",
            bucket.alignment.as_str(),
            bucket.count,
            fmt_pct(bucket.mean_return),
            fmt_opt(bucket.ic.mean_ic, 4)
        );
    }
    println!();

    print_section("HOLDOUT");
    let holdout = &summary.holdout;
    println!("Cutoff: {}", holdout.cutoff);
    for (label, period) in [("In-sample", &holdout.in_sample), ("Holdout", &holdout.holdout)] {
        println!(
            "  {:<10} samples={:>6}  IC={:>8}  Sharpe={:>6}",
            label,
            period.n_samples,
            fmt_opt(period.ic.mean_ic, 4),
            fmt_opt(period.performance.sharpe, 2)
        );
    }
    println!();

    if !summary.data_gaps.is_empty() {
        println!("Tickers without data: {}", summary.data_gaps.join(", "));
    }
    if !summary.failed_keys.is_empty() {
        println!("{} keys could not be rated (see summary.json)", summary.failed_keys.len());
    }
}
