//! Performance metrics for a return series.

use serde::{Deserialize, Serialize};

use crate::stats::MIN_STD_THRESHOLD;

/// Trading days per calendar year.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Periods per year when each period spans `horizon` trading days.
pub fn periods_per_year(horizon: usize) -> f64 {
    TRADING_DAYS_PER_YEAR / horizon.max(1) as f64
}

/// Risk and return summary of a periodic return series.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Compounded return over the whole series.
    pub total_return: Option<f64>,
    /// Compound annual growth rate.
    pub cagr: Option<f64>,
    /// Annualized standard deviation of returns.
    pub annualized_volatility: Option<f64>,
    /// Annualized Sharpe ratio (zero risk-free rate).
    pub sharpe: Option<f64>,
    /// Worst peak-to-trough decline, as a negative fraction.
    pub max_drawdown: Option<f64>,
    /// CAGR over the magnitude of the maximum drawdown.
    pub calmar: Option<f64>,
    /// Number of periods.
    pub n_periods: usize,
    /// Annualization factor used.
    pub periods_per_year: f64,
}

/// Computes CAGR, volatility, Sharpe and drawdown statistics from `returns`.
///
/// Non-finite returns are ignored. Statistics that cannot be computed are `None`.
pub fn compute_performance_metrics(returns: &[f64], periods_per_year: f64) -> PerformanceMetrics {
    let valid: Vec<f64> = returns.iter().copied().filter(|r| r.is_finite()).collect();
    let n = valid.len();
    if n == 0 {
        return PerformanceMetrics {
            periods_per_year,
            ..PerformanceMetrics::default()
        };
    }

    let growth: f64 = valid.iter().map(|r| 1.0 + r).product();
    let total_return = growth - 1.0;

    let years = n as f64 / periods_per_year;
    let cagr = (years > 0.0 && growth > 0.0)
        .then(|| growth.powf(1.0 / years) - 1.0)
        .filter(|c| c.is_finite());

    let mean = valid.iter().sum::<f64>() / n as f64;
    let std = (n >= 2).then(|| {
        (valid.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
    });
    let annualized_volatility = std.map(|s| s * periods_per_year.sqrt());
    let sharpe = std
        .filter(|&s| s > MIN_STD_THRESHOLD)
        .map(|s| mean / s * periods_per_year.sqrt());

    let max_drawdown = Some(max_drawdown(&valid));
    let calmar = match (cagr, max_drawdown) {
        (Some(c), Some(dd)) if dd < 0.0 => Some(c / dd.abs()),
        _ => None,
    };

    PerformanceMetrics {
        total_return: Some(total_return),
        cagr,
        annualized_volatility,
        sharpe,
        max_drawdown,
        calmar,
        n_periods: n,
        periods_per_year,
    }
}

/// Largest fall of the equity curve from its running peak, as a value in [-1, 0].
fn max_drawdown(returns: &[f64]) -> f64 {
    let mut equity = 1.0;
    let mut peak = 1.0;
    let mut worst = 0.0;

    for r in returns {
        equity *= 1.0 + r;
        if equity > peak {
            peak = equity;
        }
        let dd = equity / peak - 1.0;
        if dd < worst {
            worst = dd;
        }
    }

    worst
}
