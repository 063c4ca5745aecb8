//! Evaluation universe construction for Augur.
//!
//! This crate turns analyst recommendations and daily prices into the set of
//! [`EvaluationSample`](augur_traits::EvaluationSample)s an evaluation run works on:
//! - [`UniverseBuilder`] applies the next-trading-day execution rule and
//!   computes forward returns for every requested horizon
//! - [`stratified_sample`] downsamples a universe while keeping rating
//!   categories balanced
//! - [`FrameDataset`] is a polars-backed [`Dataset`](augur_traits::Dataset)
//!
//! # Example
//!
//! ```rust,ignore
//! use augur_universe::{FrameDataset, UniverseBuilder, UniverseConfig};
//!
//! let dataset = FrameDataset::from_csv_paths(&ratings, &prices, None)?;
//! let config = UniverseConfig::new(range, vec![5, 21, 63]);
//! let universe = UniverseBuilder::new(&dataset, config)?.build()?;
//! ```

pub mod builder;
pub mod frame;
pub mod sampling;

pub use builder::{PriceField, PriceHistory, TickerGap, Universe, UniverseBuilder, UniverseConfig};
pub use frame::FrameDataset;
pub use sampling::{Allocation, stratified_sample};
