//! Input loading and argument parsing helpers for the augur CLI.

use std::path::Path;

use anyhow::{Context, Result};
use augur::universe::FrameDataset;
use chrono::NaiveDate;

/// Load recommendations, prices and optional news from CSV files.
pub(crate) fn load_dataset(ratings: &Path, prices: &Path, news: Option<&Path>) -> Result<FrameDataset> {
    FrameDataset::from_csv_paths(ratings, prices, news).with_context(|| {
        format!(
            "failed to load dataset from {} and {}",
            ratings.display(),
            prices.display()
        )
    })
}

/// Parse a date string in YYYY-MM-DD format.
pub(crate) fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date '{date_str}', expected YYYY-MM-DD"))
}

/// Format an optional statistic, printing `n/a` when undefined.
pub(crate) fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.precision$}"))
}

/// Format an optional fraction as a percentage.
pub(crate) fn fmt_pct(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}%", v * 100.0))
}
