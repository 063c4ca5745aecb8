//! Summary statistics for IC series.
//!
//! Consecutive decision dates share most of their forward-return window, so
//! the IC series is serially correlated. Alongside the plain t-statistic the
//! summary reports a Newey-West t-statistic with Bartlett weights.

use serde::{Deserialize, Serialize};

use crate::ic::IcObservation;

/// Standard errors below this are treated as zero.
pub const MIN_STD_THRESHOLD: f64 = 1e-10;

/// Lag truncation for the Newey-West estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeweyWestLags {
    /// As many lags as the return horizon has trading days.
    #[default]
    HorizonScaled,
    /// A fixed number of lags.
    Fixed(usize),
}

impl NeweyWestLags {
    /// Number of lags for a series of `n_obs` values at `horizon`, capped at `n_obs - 1`.
    pub fn resolve(self, horizon: usize, n_obs: usize) -> usize {
        let lags = match self {
            Self::HorizonScaled => horizon,
            Self::Fixed(n) => n,
        };
        lags.min(n_obs.saturating_sub(1))
    }
}

/// Summary of an IC series. Undefined statistics are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IcSummary {
    /// Mean of the non-null ICs.
    pub mean_ic: Option<f64>,
    /// Sample standard deviation of the non-null ICs.
    pub std_ic: Option<f64>,
    /// `mean / (std / sqrt(n))`.
    pub t_stat: Option<f64>,
    /// Mean over its Newey-West standard error.
    pub nw_t_stat: Option<f64>,
    /// Share of non-null ICs above zero.
    pub hit_ratio: Option<f64>,
    /// Number of non-null ICs.
    pub n_obs: usize,
    /// Number of dates, including those with a null IC.
    pub n_dates: usize,
    /// Lags used for the Newey-West estimate.
    pub nw_lags: usize,
}

/// Summarizes an IC series computed at `horizon`.
pub fn summarize_ic(observations: &[IcObservation], horizon: usize, lags: NeweyWestLags) -> IcSummary {
    let values: Vec<f64> = observations.iter().filter_map(|o| o.ic).collect();
    IcSummary {
        n_dates: observations.len(),
        ..summarize_values(&values, horizon, lags)
    }
}

/// Summarizes a plain series of IC values.
pub fn summarize_values(values: &[f64], horizon: usize, lags: NeweyWestLags) -> IcSummary {
    let values: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let n = values.len();
    let nw_lags = lags.resolve(horizon, n);

    if n == 0 {
        return IcSummary {
            n_dates: 0,
            nw_lags,
            ..IcSummary::default()
        };
    }

    let mean = values.iter().sum::<f64>() / n as f64;
    let hit_ratio = values.iter().filter(|&&v| v > 0.0).count() as f64 / n as f64;

    let std = (n >= 2).then(|| {
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        variance.sqrt()
    });

    let t_stat = std.and_then(|s| {
        let se = s / (n as f64).sqrt();
        (se > MIN_STD_THRESHOLD).then(|| mean / se)
    });

    let nw_t_stat = newey_west_se(&values, nw_lags)
        .filter(|&se| se > MIN_STD_THRESHOLD)
        .map(|se| mean / se);

    IcSummary {
        mean_ic: Some(mean),
        std_ic: std,
        t_stat,
        nw_t_stat,
        hit_ratio: Some(hit_ratio),
        n_obs: n,
        n_dates: n,
        nw_lags,
    }
}

/// Newey-West standard error of the mean of `values` with `lags` lags.
///
/// `gamma_j = sum(e_t * e_{t-j}) / n`, `var = gamma_0 + 2 * sum((1 - j/(L+1)) * gamma_j)`,
/// `se = sqrt(var / n)`. Returns `None` for fewer than two values or a
/// non-positive variance.
pub fn newey_west_se(values: &[f64], lags: usize) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }

    let mean = values.iter().sum::<f64>() / n as f64;
    let e: Vec<f64> = values.iter().map(|v| v - mean).collect();
    let lags = lags.min(n - 1);

    let gamma = |j: usize| e[j..].iter().zip(&e[..n - j]).map(|(a, b)| a * b).sum::<f64>() / n as f64;

    let mut variance = gamma(0);
    for j in 1..=lags {
        let weight = 1.0 - j as f64 / (lags as f64 + 1.0);
        variance += 2.0 * weight * gamma(j);
    }

    (variance > 0.0).then(|| (variance / n as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::day;
    use approx::assert_relative_eq;

    fn obs(values: &[Option<f64>]) -> Vec<IcObservation> {
        values
            .iter()
            .enumerate()
            .map(|(i, &ic)| IcObservation {
                date: day(i as u64),
                ic,
                n_obs: if ic.is_some() { 10 } else { 2 },
            })
            .collect()
    }

    #[test]
    fn test_lag_resolution() {
        assert_eq!(NeweyWestLags::HorizonScaled.resolve(21, 100), 21);
        assert_eq!(NeweyWestLags::HorizonScaled.resolve(21, 10), 9);
        assert_eq!(NeweyWestLags::Fixed(3).resolve(21, 100), 3);
        assert_eq!(NeweyWestLags::Fixed(3).resolve(21, 0), 0);
    }

    #[test]
    fn test_summary_basic() {
        let summary = summarize_ic(&obs(&[Some(0.1), Some(0.2), None, Some(0.3), Some(-0.1)]), 1, NeweyWestLags::Fixed(0));

        assert_eq!(summary.n_obs, 4);
        assert_eq!(summary.n_dates, 5);
        assert_relative_eq!(summary.mean_ic.unwrap(), 0.125, epsilon = 1e-12);
        assert_relative_eq!(summary.hit_ratio.unwrap(), 0.75);

        let std = summary.std_ic.unwrap();
        // Sample std of [0.1, 0.2, 0.3, -0.1].
        assert_relative_eq!(std, (0.0875f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(summary.t_stat.unwrap(), 0.125 / (std / 2.0), epsilon = 1e-9);
        assert!(summary.nw_t_stat.is_some());
    }

    #[test]
    fn test_zero_lag_newey_west_matches_population_se() {
        let values = [0.05, -0.02, 0.03, 0.01, 0.04, -0.01];
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let pop_var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        assert_relative_eq!(newey_west_se(&values, 0).unwrap(), (pop_var / n).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_positive_autocorrelation_widens_se() {
        // Slowly drifting series: strong positive autocorrelation.
        let values: Vec<f64> = (0..40).map(|i| ((i / 8) as f64 - 2.0) * 0.01 + 0.02).collect();
        let se0 = newey_west_se(&values, 0).unwrap();
        let se8 = newey_west_se(&values, 8).unwrap();
        assert!(se8 > se0);
    }

    #[test]
    fn test_zero_variance_does_not_panic() {
        let summary = summarize_ic(&obs(&[Some(1.0), Some(1.0), Some(1.0)]), 21, NeweyWestLags::HorizonScaled);
        assert_relative_eq!(summary.mean_ic.unwrap(), 1.0);
        assert_relative_eq!(summary.std_ic.unwrap(), 0.0);
        assert_eq!(summary.t_stat, None);
        assert_eq!(summary.nw_t_stat, None);
        assert_eq!(summary.nw_lags, 2);
    }

    #[test]
    fn test_empty_and_single() {
        let empty = summarize_ic(&obs(&[None, None]), 21, NeweyWestLags::HorizonScaled);
        assert_eq!(empty.n_obs, 0);
        assert_eq!(empty.n_dates, 2);
        assert_eq!(empty.mean_ic, None);

        let single = summarize_values(&[0.3], 21, NeweyWestLags::HorizonScaled);
        assert_eq!(single.mean_ic, Some(0.3));
        assert_eq!(single.std_ic, None);
        assert_eq!(single.t_stat, None);
        assert_eq!(single.nw_t_stat, None);
    }
}
