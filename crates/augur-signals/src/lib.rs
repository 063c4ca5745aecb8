//! Signal cache and generator for Augur.
//!
//! Rating calls are the expensive part of an evaluation run, so every rating
//! is generated at most once per (ticker, as_of_date) key:
//! - [`SignalCache`] merges new entries without ever overwriting old ones
//! - [`SignalRepository`] hides the storage format; [`CsvSignalStore`] keeps
//!   the cache in a flat file replaced atomically on every save
//! - [`SignalGenerator`] rates only the keys the cache is missing and flushes
//!   progress as it goes, so an interrupted run loses at most one batch
//!
//! # Example
//!
//! ```rust,ignore
//! use augur_signals::{CsvSignalStore, GeneratorConfig, SignalGenerator};
//!
//! let store = CsvSignalStore::new("outputs/signal_cache.csv");
//! let mut generator = SignalGenerator::new(provider, store, GeneratorConfig::default());
//! let outcome = generator.generate(universe.samples).await?;
//! println!("reused {} / generated {}", outcome.reused, outcome.generated);
//! ```

pub mod cache;
pub mod generator;

pub use cache::{CsvSignalStore, MemorySignalStore, SignalCache, SignalCacheEntry, SignalRepository};
pub use generator::{GenerationFailure, GenerationOutcome, GeneratorConfig, SignalGenerator};
