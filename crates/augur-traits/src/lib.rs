#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/augur-research/augur/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core type and trait definitions for the Augur evaluation engine.
//!
//! This crate provides the foundational abstractions shared by the universe
//! builder, the signal cache and generator, and the statistics and backtest
//! engines.

/// The version of the augur-traits crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Module declarations
pub mod dataset;
pub mod error;
pub mod fs;
pub mod provider;
pub mod rating;
pub mod sample;
pub mod types;

// Re-exports
pub use dataset::{Dataset, NewsItem, PriceBar, Recommendation};
pub use error::{AugurError, ProviderError, Result};
pub use provider::{RatingProvider, RatingResponse};
pub use rating::{Confidence, RatingLabel, encode_signal};
pub use sample::{EvaluationSample, EvaluationSampleBuilder, ForwardReturn, SampleKey};
pub use types::{Date, DateRange, Ticker, normalize_ticker};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }
}
