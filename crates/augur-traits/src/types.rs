//! Common types used throughout the Augur workspace.

use serde::{Deserialize, Serialize};

use crate::{AugurError, Result};

// Re-export date type from chrono
pub use chrono::NaiveDate as Date;

/// A ticker symbol, e.g. "AAPL".
///
/// Tickers are normalized with [`normalize_ticker`] at every boundary so that
/// cache keys and dataset lookups agree.
pub type Ticker = String;

/// Normalizes a ticker to trimmed upper-case.
pub fn normalize_ticker(raw: &str) -> Ticker {
    raw.trim().to_ascii_uppercase()
}

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// First date in the range.
    pub start: Date,
    /// Last date in the range.
    pub end: Date,
}

impl DateRange {
    /// Creates a new range, failing if `start` is after `end`.
    pub fn new(start: Date, end: Date) -> Result<Self> {
        if start > end {
            return Err(AugurError::InvalidConfig(format!(
                "date range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Returns whether `date` falls inside the range.
    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }

    /// Returns a copy of the range with the end pushed out by `days` calendar days.
    pub fn extend_end(&self, days: u64) -> Self {
        let end = self
            .end
            .checked_add_days(chrono::Days::new(days))
            .unwrap_or(self.end);
        Self {
            start: self.start,
            end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize_ticker("  aapl "), "AAPL");
        assert_eq!(normalize_ticker("BRK.b"), "BRK.B");
    }

    #[test]
    fn test_date_range_contains() {
        let range = DateRange::new(d(2020, 1, 1), d(2020, 12, 31)).unwrap();
        assert!(range.contains(d(2020, 1, 1)));
        assert!(range.contains(d(2020, 12, 31)));
        assert!(!range.contains(d(2021, 1, 1)));
    }

    #[test]
    fn test_date_range_rejects_inverted() {
        assert!(DateRange::new(d(2021, 1, 1), d(2020, 1, 1)).is_err());
    }

    #[test]
    fn test_extend_end() {
        let range = DateRange::new(d(2020, 1, 1), d(2020, 1, 31)).unwrap();
        let extended = range.extend_end(10);
        assert_eq!(extended.start, d(2020, 1, 1));
        assert_eq!(extended.end, d(2020, 2, 10));
    }
}
