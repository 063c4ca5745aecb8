#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/augur-research/augur/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! # augur
//!
//! augur is an umbrella crate that re-exports the augur sub-crates and adds
//! the run configuration and the end-to-end evaluation pipeline.
//!
//! ## Quick Start
//!
//! ```ignore
//! use augur::{RunConfig, run_evaluation};
//! use augur::http::HttpRatingProvider;
//! use augur::signals::CsvSignalStore;
//! use augur::universe::FrameDataset;
//!
//! # async fn example() -> augur::Result<()> {
//! let config = RunConfig::default();
//! let dataset = FrameDataset::from_csv_paths("ratings.csv".as_ref(), "prices.csv".as_ref(), None)?;
//! let provider = HttpRatingProvider::from_env().expect("AUGUR_RATING_URL");
//! let store = CsvSignalStore::new(config.cache_path());
//!
//! let report = run_evaluation(&config, &dataset, provider, store).await?;
//! println!("mean IC: {:?}", report.summary.ic.mean_ic);
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Organization
//!
//! - [`traits`] - Core types, the [`RatingProvider`] and [`Dataset`] traits, errors
//! - [`universe`] - Universe construction and stratified sampling
//! - [`signals`] - Signal cache and generator
//! - [`eval`] - IC statistics, decay, backtest, analysis and artifacts
//! - [`http`] - HTTP rating provider

/// Version information for the augur crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod pipeline;

pub use config::{CACHE_FILE, RunConfig};
pub use pipeline::{EvaluationReport, evaluate, run_evaluation};

// ============================================================================
// Core Types
// ============================================================================

/// Core types and traits.
///
/// - [`EvaluationSample`] - One (ticker, decision date) observation
/// - [`RatingProvider`] - The external rating source
/// - [`Dataset`] - Recommendation, price and news records
pub mod traits {
    pub use augur_traits::*;
}

pub use augur_traits::{
    AugurError, Confidence, Dataset, Date, DateRange, EvaluationSample, ProviderError, RatingLabel, RatingProvider,
    RatingResponse, Result, SampleKey, Ticker, encode_signal,
};

// ============================================================================
// Pipeline Stages
// ============================================================================

/// Universe construction.
///
/// Decisions are executed at the first price bar strictly after the decision
/// date; forward returns never touch a price dated on or before it.
pub mod universe {
    pub use augur_universe::*;
}

/// Signal cache and generation.
///
/// Ratings are generated at most once per (ticker, date) key and persisted
/// through a [`SignalRepository`](augur_signals::SignalRepository).
pub mod signals {
    pub use augur_signals::*;
}

/// Statistics, backtesting and analysis.
///
/// ### Information Coefficient (IC)
///
/// Spearman rank correlation between signal and forward return across the
/// names rated on one date:
///
/// ```text
/// IC_t = rank_corr(signal_t, return_{t+1 .. t+1+h})
/// ```
///
/// ### Newey-West t-statistic
///
/// Overlapping horizons make consecutive ICs autocorrelated. The standard
/// error uses Bartlett weights `1 - j/(L+1)` with `L` close to the horizon.
///
/// ### Transaction costs
///
/// ```text
/// cost_t = turnover_t × cost_per_side × 2
/// ```
pub mod eval {
    pub use augur_eval::*;
}

/// HTTP rating provider.
///
/// Configure with `AUGUR_RATING_URL` and, optionally, `AUGUR_RATING_API_KEY`.
pub mod http {
    pub use augur_http::*;
}

// ============================================================================
// Prelude
// ============================================================================

/// Prelude module for convenient imports.
///
/// ```ignore
/// use augur::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::RunConfig;
    pub use crate::pipeline::{EvaluationReport, evaluate, run_evaluation};
    pub use crate::{AugurError, Dataset, Date, EvaluationSample, RatingLabel, RatingProvider, Result};
}
