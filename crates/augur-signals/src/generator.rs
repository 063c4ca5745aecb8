//! Signal generation.
//!
//! The generator loads the cache once, rates every key the cache lacks and
//! attaches cached signals to the samples. Keys are rated one at a time.
//! Failed keys are reported and left out of the cache so the next run retries
//! them.

use std::collections::BTreeSet;
use std::time::Duration;

use augur_traits::{
    EvaluationSample, ProviderError, RatingProvider, RatingResponse, Result, SampleKey,
};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::cache::{SignalCacheEntry, SignalRepository};

/// Generator settings.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Upper bound on a single provider call.
    pub call_timeout: Duration,
    /// Save the cache after this many new entries.
    pub flush_every: usize,
    /// Attach cached signals only, never calling the provider.
    pub cache_only: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(120),
            flush_every: 10,
            cache_only: false,
        }
    }
}

/// A key the provider could not rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationFailure {
    /// Sample key.
    pub key: SampleKey,
    /// Provider error.
    pub error: ProviderError,
}

/// Result of a generation pass.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    /// Input samples, with AI fields attached where a signal exists.
    pub samples: Vec<EvaluationSample>,
    /// Samples whose signal came from the cache as loaded.
    pub reused: usize,
    /// Keys rated during this pass.
    pub generated: usize,
    /// Keys left unrated because the provider was not called.
    pub skipped: usize,
    /// Keys the provider failed on.
    pub failures: Vec<GenerationFailure>,
}

impl GenerationOutcome {
    /// Number of samples carrying a signal.
    pub fn with_signal(&self) -> usize {
        self.samples.iter().filter(|s| s.has_signal()).count()
    }
}

/// Rates uncached samples and keeps the cache up to date.
#[derive(Debug)]
pub struct SignalGenerator<P, R> {
    provider: P,
    repository: R,
    config: GeneratorConfig,
}

impl<P, R> SignalGenerator<P, R>
where
    P: RatingProvider,
    R: SignalRepository,
{
    /// Creates a generator.
    pub const fn new(provider: P, repository: R, config: GeneratorConfig) -> Self {
        Self {
            provider,
            repository,
            config,
        }
    }

    /// The provider.
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// The cache storage.
    pub const fn repository(&self) -> &R {
        &self.repository
    }

    /// Consumes the generator, returning the provider and the storage.
    pub fn into_parts(self) -> (P, R) {
        (self.provider, self.repository)
    }

    /// Attaches signals to `samples`, rating only keys missing from the cache.
    ///
    /// A corrupt cache aborts before any provider call. Provider failures do
    /// not abort; they are returned in [`GenerationOutcome::failures`].
    pub async fn generate(&mut self, samples: Vec<EvaluationSample>) -> Result<GenerationOutcome> {
        let mut cache = self.repository.load()?;

        let reused = samples.iter().filter(|s| cache.contains(s.key())).count();
        let mut seen = BTreeSet::new();
        let missing: Vec<SampleKey> = samples
            .iter()
            .map(|s| s.key())
            .filter(|k| !cache.contains(k) && seen.insert((*k).clone()))
            .cloned()
            .collect();

        info!(
            provider = self.provider.name(),
            samples = samples.len(),
            cached = cache.len(),
            reused,
            missing = missing.len(),
            cache_only = self.config.cache_only,
            "generating signals"
        );

        let mut generated = 0usize;
        let mut skipped = 0usize;
        let mut unflushed = 0usize;
        let mut failures = Vec::new();

        for key in missing {
            if self.config.cache_only {
                skipped += 1;
                continue;
            }

            match self.rate(&key).await {
                Ok(response) => {
                    debug!(%key, rating = %response.rating, signal = response.signal(), "rated");
                    cache.insert(SignalCacheEntry::from_response(&key, &response, Utc::now()));
                    generated += 1;
                    unflushed += 1;
                    if unflushed >= self.config.flush_every.max(1) {
                        self.repository.save(&cache)?;
                        debug!(entries = cache.len(), "flushed signal cache");
                        unflushed = 0;
                    }
                }
                Err(error) => {
                    warn!(%key, %error, "rating failed");
                    failures.push(GenerationFailure { key, error });
                }
            }
        }

        if unflushed > 0 {
            self.repository.save(&cache)?;
        }

        let samples: Vec<EvaluationSample> = samples
            .into_iter()
            .map(|sample| match cache.get(sample.key()) {
                Some(entry) => sample.with_signal(entry.ai_rating, entry.ai_confidence, entry.ai_signal),
                None => sample,
            })
            .collect();

        info!(
            reused,
            generated,
            skipped,
            failed = failures.len(),
            cache_size = cache.len(),
            "signal generation finished"
        );

        Ok(GenerationOutcome {
            samples,
            reused,
            generated,
            skipped,
            failures,
        })
    }

    async fn rate(&self, key: &SampleKey) -> std::result::Result<RatingResponse, ProviderError> {
        let call = self.provider.rate(&key.ticker, key.as_of_date);
        match tokio::time::timeout(self.config.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                ticker: key.ticker.clone(),
                as_of_date: key.as_of_date,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemorySignalStore, SignalCache};
    use augur_traits::{Confidence, Date, RatingLabel};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Rates by ticker; tickers listed in `failing` error, `HANG` never answers.
    #[derive(Default)]
    struct ScriptedProvider {
        ratings: BTreeMap<String, RatingResponse>,
        failing: BTreeSet<String>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new() -> Self {
            let mut ratings = BTreeMap::new();
            ratings.insert("AAPL".to_string(), RatingResponse::new(RatingLabel::StrongBuy, Confidence::High));
            ratings.insert("MSFT".to_string(), RatingResponse::new(RatingLabel::Hold, Confidence::Medium));
            ratings.insert("IBM".to_string(), RatingResponse::new(RatingLabel::Sell, Confidence::Low));
            ratings.insert("INTC".to_string(), RatingResponse::new(RatingLabel::UnderPerform, Confidence::Score(0.5)));
            Self {
                ratings,
                ..Self::default()
            }
        }

        fn failing(mut self, ticker: &str) -> Self {
            self.failing.insert(ticker.to_string());
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl RatingProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn rate(&self, ticker: &str, as_of_date: Date) -> std::result::Result<RatingResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if ticker == "HANG" {
                std::future::pending::<()>().await;
            }
            if self.failing.contains(ticker) {
                return Err(ProviderError::Transport("connection reset".to_string()));
            }
            self.ratings.get(ticker).copied().ok_or(ProviderError::Unavailable {
                ticker: ticker.to_string(),
                as_of_date,
            })
        }
    }

    fn d(day: u32) -> Date {
        Date::from_ymd_opt(2020, 1, day).unwrap()
    }

    fn universe(tickers: &[&str], days: &[u32]) -> Vec<EvaluationSample> {
        let mut out = Vec::new();
        for &day in days {
            for &t in tickers {
                out.push(EvaluationSample::builder(t, d(day)).build().unwrap());
            }
        }
        out
    }

    fn signals(samples: &[EvaluationSample]) -> Vec<Option<f64>> {
        samples.iter().map(EvaluationSample::ai_signal).collect()
    }

    #[tokio::test]
    async fn test_second_run_makes_no_calls() {
        let samples = universe(&["AAPL", "MSFT", "IBM"], &[2, 3]);
        let mut generator =
            SignalGenerator::new(ScriptedProvider::new(), MemorySignalStore::new(), GeneratorConfig::default());

        let first = generator.generate(samples.clone()).await.unwrap();
        assert_eq!(first.generated, 6);
        assert_eq!(first.reused, 0);
        assert_eq!(generator.provider().calls(), 6);

        let second = generator.generate(samples).await.unwrap();
        assert_eq!(second.generated, 0);
        assert_eq!(second.reused, 6);
        assert_eq!(generator.provider().calls(), 6);
        assert_eq!(signals(&first.samples), signals(&second.samples));
    }

    #[tokio::test]
    async fn test_expanded_universe_reuses_cache() {
        let mut generator =
            SignalGenerator::new(ScriptedProvider::new(), MemorySignalStore::new(), GeneratorConfig::default());

        generator.generate(universe(&["AAPL", "MSFT"], &[2])).await.unwrap();
        let before: Vec<SignalCacheEntry> = generator.repository().cache().entries().cloned().collect();

        let outcome = generator
            .generate(universe(&["AAPL", "MSFT", "IBM"], &[2, 3]))
            .await
            .unwrap();
        assert_eq!(outcome.reused, 2);
        assert_eq!(outcome.generated, 4);
        assert_eq!(generator.provider().calls(), 6);

        let after = generator.repository().cache();
        assert_eq!(after.len(), 6);
        for entry in before {
            assert_eq!(after.get(&entry.key()), Some(&entry));
        }
    }

    #[tokio::test]
    async fn test_failures_are_reported_and_not_cached() {
        let provider = ScriptedProvider::new().failing("MSFT");
        let mut generator = SignalGenerator::new(provider, MemorySignalStore::new(), GeneratorConfig::default());

        let outcome = generator
            .generate(universe(&["AAPL", "MSFT", "NONE"], &[2]))
            .await
            .unwrap();

        assert_eq!(outcome.generated, 1);
        assert_eq!(outcome.failures.len(), 2);
        assert!(
            outcome
                .failures
                .iter()
                .any(|f| f.key.ticker == "MSFT" && matches!(f.error, ProviderError::Transport(_)))
        );
        assert_eq!(generator.repository().cache().len(), 1);
        assert_eq!(outcome.with_signal(), 1);

        // Failed keys are retried on the next run.
        generator.generate(universe(&["AAPL", "MSFT", "NONE"], &[2])).await.unwrap();
        assert_eq!(generator.provider().calls(), 5);
    }

    #[tokio::test]
    async fn test_hanging_provider_times_out() {
        let config = GeneratorConfig {
            call_timeout: Duration::from_millis(20),
            ..GeneratorConfig::default()
        };
        let mut generator = SignalGenerator::new(ScriptedProvider::new(), MemorySignalStore::new(), config);

        let outcome = generator.generate(universe(&["HANG", "AAPL"], &[2])).await.unwrap();
        assert_eq!(outcome.generated, 1);
        assert_eq!(outcome.failures.len(), 1);
        assert!(matches!(outcome.failures[0].error, ProviderError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_flushes_in_batches() {
        let config = GeneratorConfig {
            flush_every: 2,
            ..GeneratorConfig::default()
        };
        let mut generator = SignalGenerator::new(ScriptedProvider::new(), MemorySignalStore::new(), config);

        // Five new keys: flushes after the 2nd and 4th, then once at the end.
        generator
            .generate(universe(&["AAPL"], &[2, 3, 6, 7, 8]))
            .await
            .unwrap();
        assert_eq!(generator.repository().saves(), 3);

        // Nothing new: no save at all.
        generator
            .generate(universe(&["AAPL"], &[2, 3, 6, 7, 8]))
            .await
            .unwrap();
        assert_eq!(generator.repository().saves(), 3);
    }

    #[tokio::test]
    async fn test_cache_only_skips_provider() {
        let mut cache = SignalCache::new();
        let key = SampleKey::new("AAPL", d(2));
        cache.insert(SignalCacheEntry::from_response(
            &key,
            &RatingResponse::new(RatingLabel::Buy, Confidence::High),
            Utc::now(),
        ));
        let config = GeneratorConfig {
            cache_only: true,
            ..GeneratorConfig::default()
        };
        let mut generator =
            SignalGenerator::new(ScriptedProvider::new(), MemorySignalStore::with_cache(cache), config);

        let outcome = generator.generate(universe(&["AAPL", "MSFT"], &[2])).await.unwrap();
        assert_eq!(generator.provider().calls(), 0);
        assert_eq!(outcome.reused, 1);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.samples[0].ai_signal(), Some(1.0));
        assert_eq!(outcome.samples[1].ai_signal(), None);
    }

    #[tokio::test]
    async fn test_duplicate_keys_rated_once() {
        let mut samples = universe(&["AAPL"], &[2]);
        samples.extend(universe(&["AAPL"], &[2]));
        let mut generator =
            SignalGenerator::new(ScriptedProvider::new(), MemorySignalStore::new(), GeneratorConfig::default());

        let outcome = generator.generate(samples).await.unwrap();
        assert_eq!(generator.provider().calls(), 1);
        assert_eq!(outcome.with_signal(), 2);
        approx::assert_relative_eq!(outcome.samples[0].ai_signal().unwrap(), 2.0);
    }
}
