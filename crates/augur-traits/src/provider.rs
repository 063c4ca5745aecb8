//! The external rating source.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{Confidence, Date, ProviderError, RatingLabel, encode_signal};

/// A rating and its confidence as returned by a [`RatingProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingResponse {
    /// Rating label.
    pub rating: RatingLabel,
    /// Confidence level or score.
    pub confidence: Confidence,
}

impl RatingResponse {
    /// Creates a response.
    pub const fn new(rating: RatingLabel, confidence: Confidence) -> Self {
        Self { rating, confidence }
    }

    /// Numeric signal for this response.
    pub const fn signal(&self) -> f64 {
        encode_signal(self.rating, self.confidence)
    }
}

/// An opaque source of ratings for (ticker, date) pairs.
///
/// Implementations must only use information available on or before
/// `as_of_date`. Failures are reported as [`ProviderError`]; the caller decides
/// whether to retry or skip, and never substitutes a default rating.
pub trait RatingProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Rates `ticker` as of the close of `as_of_date`.
    fn rate(
        &self,
        ticker: &str,
        as_of_date: Date,
    ) -> impl Future<Output = Result<RatingResponse, ProviderError>> + Send;
}
