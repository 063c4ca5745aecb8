//! Output artifacts of an evaluation run.
//!
//! Tables are written as CSV and the summary as pretty JSON. Every file is
//! replaced atomically; undefined statistics are written as empty cells or
//! `null`.

use std::fmt::Display;
use std::path::{Path, PathBuf};

use augur_traits::fs::write_atomic;
use augur_traits::{AugurError, Date, EvaluationSample, Result};
use csv::Writer;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::{AlignmentBucket, GroupStats, HoldoutReport};
use crate::backtest::PortfolioState;
use crate::decay::DecayAnalysis;
use crate::ic::IcObservation;
use crate::performance::PerformanceMetrics;
use crate::stats::IcSummary;

/// IC series file name.
pub const IC_SERIES_FILE: &str = "ic_series.csv";
/// Decay table file name.
pub const DECAY_FILE: &str = "decay.csv";
/// Backtest series file name.
pub const BACKTEST_FILE: &str = "backtest.csv";
/// Enriched universe file name.
pub const UNIVERSE_FILE: &str = "universe.csv";
/// Summary file name.
pub const SUMMARY_FILE: &str = "summary.json";

/// Sample and signal coverage of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CoverageCounts {
    /// Samples in the universe.
    pub total_samples: usize,
    /// Samples with an AI signal.
    pub with_signal: usize,
    /// Samples with a return at the primary horizon.
    pub with_primary_return: usize,
    /// Samples with both.
    pub usable: usize,
    /// Tickers without tradable price data.
    pub data_gap_tickers: usize,
    /// Keys the provider failed on.
    pub failed_keys: usize,
    /// Signals taken from the cache.
    pub reused_signals: usize,
    /// Signals generated in this run.
    pub generated_signals: usize,
}

impl CoverageCounts {
    /// Counts signal and return coverage of `samples` at `horizon`.
    pub fn from_samples(samples: &[EvaluationSample], horizon: usize) -> Self {
        let with_signal = samples.iter().filter(|s| s.has_signal()).count();
        let with_primary_return = samples.iter().filter(|s| s.forward_return(horizon).is_some()).count();
        let usable = samples
            .iter()
            .filter(|s| s.has_signal() && s.forward_return(horizon).is_some())
            .count();

        Self {
            total_samples: samples.len(),
            with_signal,
            with_primary_return,
            usable,
            ..Self::default()
        }
    }
}

/// A key the rating provider failed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedKey {
    /// Ticker.
    pub ticker: String,
    /// Decision date.
    pub as_of_date: Date,
    /// Provider error message.
    pub error: String,
}

/// Everything `summary.json` holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    /// Primary horizon in trading days.
    pub primary_horizon: usize,
    /// Cost per side in basis points.
    pub cost_per_side_bps: f64,
    /// IC summary at the primary horizon.
    pub ic: IcSummary,
    /// IC summary of the human rating as a baseline signal.
    pub human_ic: IcSummary,
    /// Decay across horizons.
    pub decay: DecayAnalysis,
    /// Net performance of the backtest.
    pub performance: PerformanceMetrics,
    /// Gross performance of the backtest.
    pub gross_performance: PerformanceMetrics,
    /// Mean turnover per rebalance.
    pub avg_turnover: Option<f64>,
    /// Sum of transaction costs.
    pub total_transaction_costs: f64,
    /// Coverage counts.
    pub coverage: CoverageCounts,
    /// Consensus/contrarian buckets.
    pub consensus: Vec<AlignmentBucket>,
    /// IC by calendar year.
    pub by_year: Vec<GroupStats>,
    /// IC by regime.
    pub by_regime: Vec<GroupStats>,
    /// IC by sector.
    pub by_sector: Vec<GroupStats>,
    /// Backtest-period versus holdout-period statistics.
    pub holdout: HoldoutReport,
    /// Tickers without tradable price data.
    pub data_gaps: Vec<String>,
    /// Keys the provider failed on.
    pub failed_keys: Vec<FailedKey>,
}

/// Writes run artifacts into an output directory.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    /// Creates a writer for `dir`. The directory is created on the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `ic_series.csv`: date, ic, n_obs.
    pub fn write_ic_series(&self, series: &[IcObservation]) -> Result<PathBuf> {
        let mut writer = Writer::from_writer(Vec::new());
        writer.write_record(["date", "ic", "n_obs"])?;
        for obs in series {
            writer.write_record([date_cell(Some(obs.date)), cell(obs.ic), obs.n_obs.to_string()])?;
        }
        self.finish(IC_SERIES_FILE, writer)
    }

    /// Writes `decay.csv`: horizon, mean_ic, t_stat, nw_t_stat, n_obs.
    pub fn write_decay(&self, decay: &DecayAnalysis) -> Result<PathBuf> {
        let mut writer = Writer::from_writer(Vec::new());
        writer.write_record(["horizon", "mean_ic", "t_stat", "nw_t_stat", "n_obs"])?;
        for row in &decay.rows {
            writer.write_record([
                row.horizon.to_string(),
                cell(row.mean_ic),
                cell(row.t_stat),
                cell(row.nw_t_stat),
                row.n_obs.to_string(),
            ])?;
        }
        self.finish(DECAY_FILE, writer)
    }

    /// Writes `backtest.csv`, one row per portfolio state.
    pub fn write_backtest(&self, states: &[PortfolioState]) -> Result<PathBuf> {
        let mut writer = Writer::from_writer(Vec::new());
        writer.write_record([
            "date",
            "execution_date",
            "n_positions",
            "gross_exposure",
            "turnover",
            "gross_return",
            "transaction_cost",
            "net_return",
            "cumulative_return",
        ])?;
        for state in states {
            writer.write_record([
                date_cell(Some(state.date)),
                date_cell(state.execution_date),
                state.positions.len().to_string(),
                state.gross_exposure().to_string(),
                state.turnover.to_string(),
                state.gross_return.to_string(),
                state.transaction_cost.to_string(),
                state.net_return.to_string(),
                state.cumulative_return.to_string(),
            ])?;
        }
        self.finish(BACKTEST_FILE, writer)
    }

    /// Writes `universe.csv`: the enriched samples with one return column per horizon.
    pub fn write_universe(&self, samples: &[EvaluationSample], horizons: &[usize]) -> Result<PathBuf> {
        let mut writer = Writer::from_writer(Vec::new());
        let mut header: Vec<String> = [
            "ticker",
            "as_of_date",
            "human_rating",
            "sector",
            "execution_date",
            "ai_rating",
            "ai_confidence",
            "ai_signal",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        header.extend(horizons.iter().map(|h| format!("forward_return_{h}d")));
        writer.write_record(&header)?;

        for sample in samples {
            let mut row = vec![
                sample.ticker().to_string(),
                date_cell(Some(sample.as_of_date())),
                cell(sample.human_rating()),
                sample.sector().unwrap_or_default().to_string(),
                date_cell(sample.execution_date()),
                cell(sample.ai_rating()),
                cell(sample.ai_confidence()),
                cell(sample.ai_signal()),
            ];
            row.extend(horizons.iter().map(|&h| cell(sample.forward_return(h))));
            writer.write_record(&row)?;
        }
        self.finish(UNIVERSE_FILE, writer)
    }

    /// Writes `summary.json`.
    pub fn write_summary(&self, summary: &EvaluationSummary) -> Result<PathBuf> {
        let path = self.dir.join(SUMMARY_FILE);
        let json = serde_json::to_vec_pretty(summary)?;
        write_atomic(&path, &json)?;
        info!(path = %path.display(), "wrote summary");
        Ok(path)
    }

    fn finish(&self, name: &str, writer: Writer<Vec<u8>>) -> Result<PathBuf> {
        let bytes = writer
            .into_inner()
            .map_err(|e| AugurError::Io(e.into_error()))?;
        let path = self.dir.join(name);
        write_atomic(&path, &bytes)?;
        info!(path = %path.display(), "wrote artifact");
        Ok(path)
    }
}

fn cell<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn date_cell(date: Option<Date>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}
