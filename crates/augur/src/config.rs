//! Run configuration.
//!
//! Every parameter of an evaluation run lives in [`RunConfig`]. Defaults are
//! documented on each field; a TOML file can override any subset of them and
//! the CLI can override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use augur_eval::{BacktestConfig, DEFAULT_MIN_CROSS_SECTION, NeweyWestLags, Regime, Weighting};
use augur_signals::GeneratorConfig;
use augur_traits::{AugurError, Date, DateRange, Result};
use augur_universe::{Allocation, PriceField, UniverseConfig};
use serde::{Deserialize, Serialize};

/// Name of the cache file inside the output directory.
pub const CACHE_FILE: &str = "signal_cache.csv";

/// Parameters of one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// First decision date (default 2008-01-01).
    pub start_date: Date,
    /// Last decision date (default 2024-12-31).
    pub end_date: Date,
    /// Horizon for the headline IC and the backtest (default 21).
    pub primary_horizon: usize,
    /// Horizons for the decay table (default 5, 10, 21, 63).
    pub horizons: Vec<usize>,
    /// Cap on the number of samples; no cap by default.
    pub max_samples: Option<usize>,
    /// Allocation for stratified downsampling (default proportional).
    pub allocation: Allocation,
    /// Transaction cost per side in basis points (default 10).
    pub cost_per_side_bps: f64,
    /// Artifact directory (default `evaluation/outputs`).
    pub output_dir: PathBuf,
    /// Signal cache file (default `<output_dir>/signal_cache.csv`).
    pub cache_path: Option<PathBuf>,
    /// First decision date of the holdout period (default 2023-01-01).
    pub holdout_start: Date,
    /// Minimum names for a dated IC (default 5).
    pub min_cross_section: usize,
    /// Newey-West lag truncation (default horizon-scaled).
    pub newey_west_lags: NeweyWestLags,
    /// Price used for entry and exit (default open).
    pub price_field: PriceField,
    /// Largest calendar gap to the execution bar (default 5).
    pub max_execution_gap_days: u64,
    /// Signals within this distance of zero stay flat (default 0).
    pub neutral_band: f64,
    /// Position sizing (default signal-proportional).
    pub weighting: Weighting,
    /// Optional cap on a single position's weight.
    pub max_position_weight: Option<f64>,
    /// Rebalance every n-th decision date (default 1).
    pub rebalance_every: usize,
    /// Timeout for one provider call in seconds (default 120).
    pub provider_timeout_secs: u64,
    /// Save the cache after this many new signals (default 10).
    pub flush_every: usize,
    /// Use cached signals only, never calling the provider.
    pub cache_only: bool,
    /// News look-back sent with each rating request, in calendar days (default 30).
    pub news_window_days: u64,
    /// Regime windows for the breakdown.
    pub regimes: Vec<Regime>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            start_date: ymd(2008, 1, 1),
            end_date: ymd(2024, 12, 31),
            primary_horizon: 21,
            horizons: vec![5, 10, 21, 63],
            max_samples: None,
            allocation: Allocation::Proportional,
            cost_per_side_bps: 10.0,
            output_dir: PathBuf::from("evaluation/outputs"),
            cache_path: None,
            holdout_start: ymd(2023, 1, 1),
            min_cross_section: DEFAULT_MIN_CROSS_SECTION,
            newey_west_lags: NeweyWestLags::HorizonScaled,
            price_field: PriceField::Open,
            max_execution_gap_days: 5,
            neutral_band: 0.0,
            weighting: Weighting::SignalProportional,
            max_position_weight: None,
            rebalance_every: 1,
            provider_timeout_secs: 120,
            flush_every: 10,
            cache_only: false,
            news_window_days: 30,
            regimes: Regime::default_set(),
        }
    }
}

fn ymd(year: i32, month: u32, day: u32) -> Date {
    Date::from_ymd_opt(year, month, day).unwrap_or_default()
}

impl RunConfig {
    /// Reads a configuration from a TOML file. Missing keys take their defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| AugurError::InvalidConfig(format!("{}: {e}", path.display())))
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| AugurError::InvalidConfig(e.to_string()))
    }

    /// Checks the configuration and normalizes the horizon list.
    ///
    /// Horizons are sorted and deduplicated, and the primary horizon is added
    /// when missing.
    pub fn validate(&mut self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(AugurError::InvalidConfig(msg)) };

        if self.start_date > self.end_date {
            return invalid(format!(
                "start date {} is after end date {}",
                self.start_date, self.end_date
            ));
        }
        if self.primary_horizon == 0 || self.horizons.contains(&0) {
            return invalid("horizons must be at least one trading day".to_string());
        }
        if !self.cost_per_side_bps.is_finite() || self.cost_per_side_bps < 0.0 {
            return invalid(format!("cost per side must be non-negative, got {}", self.cost_per_side_bps));
        }
        if self.flush_every == 0 {
            return invalid("flush_every must be at least 1".to_string());
        }
        if self.min_cross_section < 2 {
            return invalid(format!(
                "min_cross_section must be at least 2, got {}",
                self.min_cross_section
            ));
        }
        if !self.neutral_band.is_finite() || self.neutral_band < 0.0 {
            return invalid(format!("neutral band must be non-negative, got {}", self.neutral_band));
        }
        if let Some(cap) = self.max_position_weight
            && (cap.is_nan() || cap <= 0.0 || cap > 1.0)
        {
            return invalid(format!("max position weight must be in (0, 1], got {cap}"));
        }
        if self.rebalance_every == 0 {
            return invalid("rebalance_every must be at least 1".to_string());
        }
        if self.max_samples == Some(0) {
            return invalid("max_samples must be at least 1".to_string());
        }

        self.horizons.push(self.primary_horizon);
        self.horizons.sort_unstable();
        self.horizons.dedup();
        Ok(())
    }

    /// Decision date range.
    pub fn range(&self) -> Result<DateRange> {
        DateRange::new(self.start_date, self.end_date)
    }

    /// Cache file path, defaulting to a file inside the output directory.
    pub fn cache_path(&self) -> PathBuf {
        self.cache_path
            .clone()
            .unwrap_or_else(|| self.output_dir.join(CACHE_FILE))
    }

    /// Universe builder settings.
    pub fn universe_config(&self) -> Result<UniverseConfig> {
        Ok(UniverseConfig::new(self.range()?, self.horizons.clone())
            .with_price_field(self.price_field)
            .with_max_execution_gap_days(self.max_execution_gap_days))
    }

    /// Signal generator settings.
    pub const fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            call_timeout: Duration::from_secs(self.provider_timeout_secs),
            flush_every: self.flush_every,
            cache_only: self.cache_only,
        }
    }

    /// Backtest settings at the primary horizon.
    pub const fn backtest_config(&self) -> BacktestConfig {
        BacktestConfig {
            horizon: self.primary_horizon,
            cost_per_side_bps: self.cost_per_side_bps,
            weighting: self.weighting,
            neutral_band: self.neutral_band,
            max_position_weight: self.max_position_weight,
            rebalance_every: self.rebalance_every,
        }
    }
}
