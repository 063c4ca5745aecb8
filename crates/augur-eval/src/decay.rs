//! Signal decay analysis.
//!
//! Repeats the IC computation at several horizons to show how quickly the
//! signal's edge fades. Useful for choosing the holding period.

use augur_traits::EvaluationSample;
use serde::{Deserialize, Serialize};

use crate::ic::{SignalColumn, compute_ic_series};
use crate::stats::{NeweyWestLags, summarize_ic};

/// IC statistics at one horizon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayRow {
    /// Horizon in trading days.
    pub horizon: usize,
    /// Mean IC.
    pub mean_ic: Option<f64>,
    /// Plain t-statistic.
    pub t_stat: Option<f64>,
    /// Newey-West t-statistic.
    pub nw_t_stat: Option<f64>,
    /// Number of dates with a defined IC.
    pub n_obs: usize,
}

/// Signal decay analysis across multiple time horizons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayAnalysis {
    /// One row per horizon, shortest first.
    pub rows: Vec<DecayRow>,
    /// Horizon at which |IC| falls to half its first defined value.
    pub half_life: Option<f64>,
    /// Horizon and mean IC with the largest |IC|.
    pub peak: Option<(usize, f64)>,
    /// Whether |IC| never increases with the horizon.
    pub is_monotonic: bool,
}

impl DecayAnalysis {
    /// Derives the curve statistics from per-horizon rows.
    pub fn from_rows(mut rows: Vec<DecayRow>) -> Self {
        rows.sort_by_key(|r| r.horizon);

        let curve: Vec<(usize, f64)> = rows
            .iter()
            .filter_map(|r| r.mean_ic.map(|ic| (r.horizon, ic)))
            .collect();

        let peak = curve
            .iter()
            .copied()
            .max_by(|a, b| a.1.abs().partial_cmp(&b.1.abs()).unwrap_or(std::cmp::Ordering::Equal));

        let is_monotonic = curve.windows(2).all(|w| w[0].1.abs() >= w[1].1.abs());

        Self {
            half_life: half_life(&curve),
            peak,
            is_monotonic,
            rows,
        }
    }

    /// Row for `horizon`.
    pub fn row(&self, horizon: usize) -> Option<&DecayRow> {
        self.rows.iter().find(|r| r.horizon == horizon)
    }
}

/// Estimate half-life: horizon at which |IC| drops to 50% of the first value.
fn half_life(curve: &[(usize, f64)]) -> Option<f64> {
    let (_, first) = *curve.first()?;
    let half_ic = first.abs() / 2.0;

    for w in curve.windows(2) {
        let (h1, ic1) = (w[0].0 as f64, w[0].1.abs());
        let (h2, ic2) = (w[1].0 as f64, w[1].1.abs());

        if ic1 >= half_ic && ic2 <= half_ic {
            if ic1 == ic2 {
                return Some(h1);
            }
            let weight = (ic1 - half_ic) / (ic1 - ic2);
            return Some(h1 + weight * (h2 - h1));
        }
    }

    None
}

/// Computes IC statistics at each of `horizons`.
pub fn compute_decay(
    samples: &[EvaluationSample],
    signal: SignalColumn,
    horizons: &[usize],
    min_cross_section: usize,
    lags: NeweyWestLags,
) -> DecayAnalysis {
    let rows = horizons
        .iter()
        .map(|&horizon| {
            let series = compute_ic_series(samples, signal, horizon, min_cross_section);
            let summary = summarize_ic(&series, horizon, lags);
            DecayRow {
                horizon,
                mean_ic: summary.mean_ic,
                t_stat: summary.t_stat,
                nw_t_stat: summary.nw_t_stat,
                n_obs: summary.n_obs,
            }
        })
        .collect();

    DecayAnalysis::from_rows(rows)
}
