//! Error types for the Augur workspace.
//!
//! [`AugurError`] covers data gaps, cache corruption, look-ahead violations and
//! the usual I/O and parsing failures. [`ProviderError`] is the narrower error a
//! [`RatingProvider`](crate::RatingProvider) returns; the caller decides whether
//! to retry or skip the key.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// The main error type for Augur operations.
#[derive(Debug, Error)]
pub enum AugurError {
    /// A ticker has no tradable samples in the requested date range.
    #[error("No tradable data for {ticker} between {start} and {end}: {reason}")]
    DataGap {
        /// Ticker with the gap.
        ticker: String,
        /// First date of the requested range.
        start: NaiveDate,
        /// Last date of the requested range.
        end: NaiveDate,
        /// What was missing.
        reason: String,
    },

    /// Rating generation failed.
    #[error("Rating provider failed: {0}")]
    Provider(#[from] ProviderError),

    /// The signal cache file exists but cannot be trusted.
    #[error("Signal cache {} is corrupt: {reason}", path.display())]
    CacheCorrupt {
        /// Path of the cache file.
        path: PathBuf,
        /// Row or header that failed validation.
        reason: String,
    },

    /// A forward return touched a price dated on or before its decision date.
    #[error("Look-ahead in {ticker}: return entered on {entry_date} for decision on {as_of_date}")]
    LookAhead {
        /// Ticker of the offending sample.
        ticker: String,
        /// Decision date.
        as_of_date: NaiveDate,
        /// Entry date of the forward return.
        entry_date: NaiveDate,
    },

    /// Error due to invalid or malformed data.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Error due to an invalid run configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error when a required column is missing from the data.
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// Error when data is insufficient for the requested operation.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tabular file error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error from Polars operations.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

/// Failure reported by a rating provider for a single (ticker, date) key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The call did not complete within the configured timeout.
    #[error("rating call for {ticker} on {as_of_date} timed out")]
    Timeout {
        /// Requested ticker.
        ticker: String,
        /// Requested decision date.
        as_of_date: NaiveDate,
    },

    /// Network or transport failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider is throttling requests.
    #[error("rate limit exceeded")]
    RateLimited,

    /// The provider answered but the answer could not be understood.
    #[error("malformed rating response: {0}")]
    Malformed(String),

    /// The provider refused the request.
    #[error("rating request rejected: {0}")]
    Rejected(String),

    /// No rating can be produced for this key.
    #[error("no rating available for {ticker} on {as_of_date}")]
    Unavailable {
        /// Requested ticker.
        ticker: String,
        /// Requested decision date.
        as_of_date: NaiveDate,
    },
}

/// A specialized Result type for Augur operations.
pub type Result<T> = std::result::Result<T, AugurError>;
