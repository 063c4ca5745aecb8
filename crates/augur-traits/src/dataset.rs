//! Typed access to the input data an evaluation run consumes.
//!
//! A [`Dataset`] is an explicit handle owned by the run. The universe builder
//! reads recommendations and prices through it; the HTTP rating provider reads
//! news through it.

use serde::{Deserialize, Serialize};

use crate::{Date, DateRange, Result, Ticker};

/// One analyst recommendation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Normalized ticker.
    pub ticker: Ticker,
    /// Date the recommendation was published.
    pub date: Date,
    /// Raw rating text as found in the source.
    pub rating: String,
    /// Sector of the covered company, when known.
    pub sector: Option<String>,
}

/// One daily price bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Normalized ticker.
    pub ticker: Ticker,
    /// Trading date.
    pub date: Date,
    /// Opening price, when the source provides one.
    pub open: Option<f64>,
    /// Closing price.
    pub close: f64,
}

/// One dated news headline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    /// Normalized ticker.
    pub ticker: Ticker,
    /// Publication date.
    pub date: Date,
    /// Headline text.
    pub headline: String,
}

/// Read-only source of recommendation, price and news records.
///
/// All accessors filter on an inclusive [`DateRange`] and return records sorted
/// by date. Ticker arguments are matched after normalization.
pub trait Dataset: Send + Sync {
    /// Tickers that have at least one recommendation, sorted.
    fn tickers(&self) -> Vec<Ticker>;

    /// Recommendations in `range`, for one ticker or for all of them.
    fn recommendations(&self, ticker: Option<&str>, range: DateRange)
    -> Result<Vec<Recommendation>>;

    /// Price bars for `ticker` in `range`.
    fn prices(&self, ticker: &str, range: DateRange) -> Result<Vec<PriceBar>>;

    /// News items for `ticker` in `range`.
    fn news(&self, ticker: &str, range: DateRange) -> Result<Vec<NewsItem>>;

    /// News published in the `window_days` calendar days ending on `as_of_date`.
    ///
    /// Items dated after `as_of_date` are never returned.
    fn news_before(&self, ticker: &str, as_of_date: Date, window_days: u64) -> Result<Vec<NewsItem>> {
        let start = as_of_date
            .checked_sub_days(chrono::Days::new(window_days))
            .unwrap_or(Date::MIN);
        let range = DateRange::new(start, as_of_date)?;
        let items = self.news(ticker, range)?;
        Ok(items
            .into_iter()
            .filter(|item| item.date > start || window_days == 0)
            .collect())
    }
}
