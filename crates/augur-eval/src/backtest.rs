//! Portfolio backtester.
//!
//! On every rebalance date the names rated that day are turned into a
//! long/short book with gross exposure at most one. The book is entered at the
//! next trading day's price and earns the sample's forward return. Between
//! rebalances the book is held and each name earns the forward return of its
//! most recent rating. Turnover is the sum of absolute weight changes and
//! costs `turnover × cost_per_side × 2`.

use std::collections::{BTreeMap, BTreeSet};

use augur_traits::{AugurError, Date, EvaluationSample, Result, Ticker};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ic::{SignalColumn, compute_ranks};
use crate::performance::{PerformanceMetrics, compute_performance_metrics};

/// Position sizing scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    /// Weight proportional to the signal.
    #[default]
    SignalProportional,
    /// Weight proportional to the rank of |signal|, signed by the signal.
    RankBased,
}

/// Backtesting configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Horizon of the forward return each book earns.
    pub horizon: usize,
    /// Cost per side in basis points.
    pub cost_per_side_bps: f64,
    /// Position sizing.
    pub weighting: Weighting,
    /// Signals with |signal| at or below this stay flat.
    pub neutral_band: f64,
    /// Cap on any single |weight|, applied after normalization.
    pub max_position_weight: Option<f64>,
    /// Rebalance on every n-th decision date; positions are held in between.
    pub rebalance_every: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            horizon: 21,
            cost_per_side_bps: 10.0,
            weighting: Weighting::SignalProportional,
            neutral_band: 0.0,
            max_position_weight: None,
            rebalance_every: 1,
        }
    }
}

impl BacktestConfig {
    /// Cost per side as a fraction.
    pub fn cost_per_side(&self) -> f64 {
        self.cost_per_side_bps / 10_000.0
    }
}

/// Portfolio snapshot for one decision date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    /// Decision date.
    pub date: Date,
    /// Earliest entry date of the positions' returns.
    pub execution_date: Option<Date>,
    /// Signed weights by ticker.
    pub positions: BTreeMap<Ticker, f64>,
    /// Sum of absolute weight changes versus the prior state.
    pub turnover: f64,
    /// Weighted forward return before costs.
    pub gross_return: f64,
    /// Round-trip cost of the turnover.
    pub transaction_cost: f64,
    /// `gross_return - transaction_cost`.
    pub net_return: f64,
    /// Compounded net return up to and including this state.
    pub cumulative_return: f64,
    /// Positions without a forward return on this date.
    pub missing_returns: usize,
}

impl PortfolioState {
    /// Sum of absolute weights.
    pub fn gross_exposure(&self) -> f64 {
        self.positions.values().map(|w| w.abs()).sum()
    }
}

/// Backtest states with summary metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// States in date order.
    pub states: Vec<PortfolioState>,
    /// Metrics of the net return series.
    pub metrics: PerformanceMetrics,
    /// Metrics of the gross return series.
    pub gross_metrics: PerformanceMetrics,
    /// Mean turnover per state.
    pub avg_turnover: Option<f64>,
    /// Sum of transaction costs.
    pub total_transaction_costs: f64,
}

impl BacktestResult {
    /// Computes metrics for `states` with the given annualization.
    pub fn from_states(states: Vec<PortfolioState>, periods_per_year: f64) -> Self {
        let net: Vec<f64> = states.iter().map(|s| s.net_return).collect();
        let gross: Vec<f64> = states.iter().map(|s| s.gross_return).collect();
        let avg_turnover =
            (!states.is_empty()).then(|| states.iter().map(|s| s.turnover).sum::<f64>() / states.len() as f64);

        Self {
            metrics: compute_performance_metrics(&net, periods_per_year),
            gross_metrics: compute_performance_metrics(&gross, periods_per_year),
            avg_turnover,
            total_transaction_costs: states.iter().map(|s| s.transaction_cost).sum(),
            states,
        }
    }
}

/// Backtesting engine.
#[derive(Debug, Clone, Default)]
pub struct Backtest {
    config: BacktestConfig,
}

impl Backtest {
    /// Create a new backtest with configuration.
    pub const fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    /// Configuration in use.
    pub const fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Runs the backtest and computes its metrics.
    pub fn run(
        &self,
        samples: &[EvaluationSample],
        signal: SignalColumn,
        periods_per_year: f64,
    ) -> Result<BacktestResult> {
        let states = self.states(samples, signal)?;
        let result = BacktestResult::from_states(states, periods_per_year);
        info!(
            states = result.states.len(),
            total_return = ?result.metrics.total_return,
            sharpe = ?result.metrics.sharpe,
            costs = result.total_transaction_costs,
            "backtest finished"
        );
        Ok(result)
    }

    /// Simulates the portfolio date by date.
    ///
    /// Each state depends only on the previous positions and the samples dated
    /// on or before it. A held name earns the forward return of its most recent
    /// sample. Fails with [`AugurError::LookAhead`] if a return was entered on
    /// or before the decision date of its sample.
    pub fn states(&self, samples: &[EvaluationSample], signal: SignalColumn) -> Result<Vec<PortfolioState>> {
        let mut by_date: BTreeMap<Date, Vec<&EvaluationSample>> = BTreeMap::new();
        for sample in samples {
            by_date.entry(sample.as_of_date()).or_default().push(sample);
        }

        let cost_per_side = self.config.cost_per_side();
        let rebalance_every = self.config.rebalance_every.max(1);
        let mut previous: BTreeMap<Ticker, f64> = BTreeMap::new();
        let mut latest: BTreeMap<&str, &EvaluationSample> = BTreeMap::new();
        let mut cumulative = 0.0;
        let mut states = Vec::with_capacity(by_date.len());

        for (i, (date, day)) in by_date.into_iter().enumerate() {
            let mut rated_today = BTreeSet::new();
            for &sample in &day {
                if rated_today.insert(sample.ticker()) {
                    latest.insert(sample.ticker(), sample);
                }
            }

            let positions = if i % rebalance_every == 0 {
                self.target_weights(&day, signal)
            } else {
                previous.clone()
            };

            let turnover = turnover(&previous, &positions);

            let mut gross_return = 0.0;
            let mut missing_returns = 0;
            let mut execution_date: Option<Date> = None;
            for (ticker, weight) in &positions {
                let record = latest.get(ticker.as_str()).and_then(|s| {
                    s.forward_return_record(self.config.horizon)
                        .map(|r| (s.as_of_date(), r))
                });
                match record {
                    Some((decided, r)) if r.entry_date <= decided => {
                        return Err(AugurError::LookAhead {
                            ticker: ticker.clone(),
                            as_of_date: decided,
                            entry_date: r.entry_date,
                        });
                    }
                    Some((_, r)) if r.value.is_finite() => {
                        gross_return += weight * r.value;
                        execution_date = Some(execution_date.map_or(r.entry_date, |d| d.min(r.entry_date)));
                    }
                    _ => missing_returns += 1,
                }
            }

            let transaction_cost = turnover * cost_per_side * 2.0;
            let net_return = gross_return - transaction_cost;
            cumulative = (1.0 + cumulative) * (1.0 + net_return) - 1.0;

            states.push(PortfolioState {
                date,
                execution_date,
                positions: positions.clone(),
                turnover,
                gross_return,
                transaction_cost,
                net_return,
                cumulative_return: cumulative,
                missing_returns,
            });
            previous = positions;
        }

        Ok(states)
    }

    /// Long/short weights for one date, gross exposure at most one.
    fn target_weights(&self, day: &[&EvaluationSample], signal: SignalColumn) -> BTreeMap<Ticker, f64> {
        let band = self.config.neutral_band.max(0.0);
        let mut seen = BTreeSet::new();
        let candidates: Vec<(Ticker, f64)> = day
            .iter()
            .filter_map(|s| signal.value(s).map(|v| (s.ticker().to_string(), v)))
            .filter(|(t, v)| v.is_finite() && v.abs() > band && seen.insert(t.clone()))
            .collect();

        if candidates.is_empty() {
            return BTreeMap::new();
        }

        let raw: Vec<f64> = match self.config.weighting {
            Weighting::SignalProportional => candidates.iter().map(|(_, v)| *v).collect(),
            Weighting::RankBased => {
                let magnitudes: Vec<f64> = candidates.iter().map(|(_, v)| v.abs()).collect();
                compute_ranks(&magnitudes)
                    .into_iter()
                    .zip(&candidates)
                    .map(|(rank, (_, v))| (rank + 1.0) * v.signum())
                    .collect()
            }
        };

        let gross: f64 = raw.iter().map(|w| w.abs()).sum();
        if gross <= 0.0 {
            return BTreeMap::new();
        }

        let cap = self.config.max_position_weight.map(f64::abs);
        candidates
            .into_iter()
            .zip(raw)
            .map(|((ticker, _), w)| {
                let w = w / gross;
                let w = cap.map_or(w, |c| w.clamp(-c, c));
                (ticker, w)
            })
            .collect()
    }
}

/// Runs a backtest of `signal` over `samples` with default settings for
/// everything but the horizon and the cost.
pub fn run_backtest(
    samples: &[EvaluationSample],
    signal: SignalColumn,
    horizon: usize,
    cost_per_side_bps: f64,
) -> Result<Vec<PortfolioState>> {
    let config = BacktestConfig {
        horizon,
        cost_per_side_bps,
        ..BacktestConfig::default()
    };
    Backtest::new(config).states(samples, signal)
}

/// Sum of absolute weight changes; names entering or leaving count in full.
fn turnover(previous: &BTreeMap<Ticker, f64>, next: &BTreeMap<Ticker, f64>) -> f64 {
    let tickers: BTreeSet<&Ticker> = previous.keys().chain(next.keys()).collect();
    tickers
        .into_iter()
        .map(|t| {
            let before = previous.get(t).copied().unwrap_or(0.0);
            let after = next.get(t).copied().unwrap_or(0.0);
            (after - before).abs()
        })
        .sum()
}
