//! Statistics, backtesting and analysis for Augur.
//!
//! This crate turns an evaluated universe into evidence about the signal:
//! - Cross-sectional Information Coefficient (IC) series per decision date
//! - IC summaries with plain and Newey-West t-statistics
//! - Signal decay across horizons
//! - A long/short backtest with turnover and transaction costs
//! - Consensus, year, regime, sector and holdout breakdowns
//! - CSV and JSON output artifacts
//!
//! # Example
//!
//! ```rust,ignore
//! use augur_eval::{NeweyWestLags, SignalColumn, compute_ic_series, summarize_ic};
//!
//! let series = compute_ic_series(&samples, SignalColumn::AiSignal, 21, 5);
//! let summary = summarize_ic(&series, 21, NeweyWestLags::HorizonScaled);
//! println!("mean IC {:?}, NW t {:?}", summary.mean_ic, summary.nw_t_stat);
//! ```

pub mod analysis;
pub mod backtest;
pub mod decay;
pub mod ic;
pub mod performance;
pub mod report;
pub mod stats;

#[cfg(test)]
mod test_util;

// Re-export main types
pub use analysis::{
    Alignment, AlignmentBucket, GroupStats, HoldoutReport, PeriodReport, Regime, by_regime, by_sector, by_year,
    consensus_breakdown, holdout_report, split_holdout,
};
pub use backtest::{Backtest, BacktestConfig, BacktestResult, PortfolioState, Weighting, run_backtest};
pub use decay::{DecayAnalysis, DecayRow, compute_decay};
pub use ic::{DEFAULT_MIN_CROSS_SECTION, IcObservation, SignalColumn, calculate_ic, compute_ic_series};
pub use performance::{PerformanceMetrics, TRADING_DAYS_PER_YEAR, compute_performance_metrics, periods_per_year};
pub use report::{ArtifactWriter, CoverageCounts, EvaluationSummary, FailedKey};
pub use stats::{IcSummary, MIN_STD_THRESHOLD, NeweyWestLags, newey_west_se, summarize_ic, summarize_values};
