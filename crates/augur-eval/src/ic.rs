//! Information Coefficient (IC) calculations.
//!
//! IC is the Spearman rank correlation between signal values and forward
//! returns across the tickers rated on one date. A date with too few usable
//! names gets `ic = None`: unmeasurable is not the same as zero.

use std::collections::BTreeMap;

use augur_traits::{Date, EvaluationSample};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Default minimum number of names for a cross-sectional IC.
pub const DEFAULT_MIN_CROSS_SECTION: usize = 5;

/// Which value of a sample is treated as the signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalColumn {
    /// Confidence-weighted AI signal.
    #[default]
    AiSignal,
    /// Human analyst rating on the same ordinal scale.
    HumanScore,
}

impl SignalColumn {
    /// Reads the signal value from `sample`.
    pub fn value(self, sample: &EvaluationSample) -> Option<f64> {
        match self {
            Self::AiSignal => sample.ai_signal(),
            Self::HumanScore => sample.human_score(),
        }
    }

    /// Column name used in artifacts.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AiSignal => "ai_signal",
            Self::HumanScore => "human_score",
        }
    }
}

/// IC for one decision date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IcObservation {
    /// Decision date.
    pub date: Date,
    /// Rank correlation, `None` when the cross-section is too thin or flat.
    pub ic: Option<f64>,
    /// Names with both a signal and a return on this date.
    pub n_obs: usize,
}

/// Calculate Information Coefficient between signal scores and forward returns.
///
/// Pairs with a non-finite value are dropped. Returns `None` when the arrays
/// differ in length, fewer than two pairs remain, or either side has no rank
/// variance.
///
/// # Example
///
/// ```rust,ignore
/// use ndarray::array;
/// use augur_eval::calculate_ic;
///
/// let scores = array![1.5, 0.3, -0.8, 2.1];
/// let returns = array![0.02, 0.01, -0.01, 0.03];
/// let ic = calculate_ic(&scores, &returns);
/// ```
pub fn calculate_ic(signal_scores: &Array1<f64>, forward_returns: &Array1<f64>) -> Option<f64> {
    if signal_scores.len() != forward_returns.len() {
        return None;
    }

    let (signals, returns): (Vec<f64>, Vec<f64>) = signal_scores
        .iter()
        .zip(forward_returns.iter())
        .filter(|(s, r)| s.is_finite() && r.is_finite())
        .map(|(&s, &r)| (s, r))
        .unzip();

    if signals.len() < 2 {
        return None;
    }

    spearman_correlation(&compute_ranks(&signals), &compute_ranks(&returns))
}

/// Computes one [`IcObservation`] per decision date present in `samples`.
///
/// Only samples with both a signal value and a `horizon` forward return count
/// toward a date's cross-section.
pub fn compute_ic_series(
    samples: &[EvaluationSample],
    signal: SignalColumn,
    horizon: usize,
    min_cross_section: usize,
) -> Vec<IcObservation> {
    let mut by_date: BTreeMap<Date, (Vec<f64>, Vec<f64>)> = BTreeMap::new();

    for sample in samples {
        let slot = by_date.entry(sample.as_of_date()).or_default();
        if let (Some(s), Some(r)) = (signal.value(sample), sample.forward_return(horizon))
            && s.is_finite()
            && r.is_finite()
        {
            slot.0.push(s);
            slot.1.push(r);
        }
    }

    by_date
        .into_iter()
        .map(|(date, (signals, returns))| {
            let n_obs = signals.len();
            let ic = if n_obs < min_cross_section.max(2) {
                None
            } else {
                calculate_ic(&Array1::from_vec(signals), &Array1::from_vec(returns))
            };
            IcObservation { date, ic, n_obs }
        })
        .collect()
}

/// Compute ranks of values (handling ties with average rank).
pub(crate) fn compute_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut indexed: Vec<(usize, f64)> = values.iter().copied().enumerate().collect();

    indexed.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut ranks = vec![0.0; n];
    let mut i = 0;

    while i < n {
        let mut j = i;
        // Find ties
        while j < n && (indexed[j].1 - indexed[i].1).abs() < f64::EPSILON {
            j += 1;
        }

        let avg_rank = (i + j - 1) as f64 / 2.0;
        for item in &indexed[i..j] {
            ranks[item.0] = avg_rank;
        }

        i = j;
    }

    ranks
}

/// Pearson correlation of two rank vectors.
fn spearman_correlation(ranks_x: &[f64], ranks_y: &[f64]) -> Option<f64> {
    let n = ranks_x.len().min(ranks_y.len());
    if n < 2 {
        return None;
    }

    let mean_x = ranks_x.iter().sum::<f64>() / n as f64;
    let mean_y = ranks_y.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;

    for (x, y) in ranks_x.iter().zip(ranks_y) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }

    Some((cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0))
}
