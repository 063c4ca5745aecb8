//! Signal cache and its storage.
//!
//! The cache is append-only: [`SignalCache::merge`] never replaces an entry
//! that is already present, and [`SignalCache::invalidate`] is the only way to
//! remove one.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use augur_traits::fs::write_atomic;
use augur_traits::{
    AugurError, Date, RatingLabel, RatingResponse, Result, SampleKey, Ticker, normalize_ticker,
};
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Column layout of the cache file.
pub const CACHE_HEADER: [&str; 6] = [
    "ticker",
    "as_of_date",
    "ai_rating",
    "ai_confidence",
    "ai_signal",
    "generated_at",
];

/// One cached rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalCacheEntry {
    /// Normalized ticker.
    pub ticker: Ticker,
    /// Decision date.
    pub as_of_date: Date,
    /// Rating label.
    pub ai_rating: RatingLabel,
    /// Confidence in [0, 1].
    pub ai_confidence: f64,
    /// Encoded signal.
    pub ai_signal: f64,
    /// When the rating was produced.
    pub generated_at: DateTime<Utc>,
}

impl SignalCacheEntry {
    /// Builds an entry from a provider response.
    pub fn from_response(key: &SampleKey, response: &RatingResponse, generated_at: DateTime<Utc>) -> Self {
        Self {
            ticker: key.ticker.clone(),
            as_of_date: key.as_of_date,
            ai_rating: response.rating,
            ai_confidence: response.confidence.value(),
            ai_signal: response.signal(),
            generated_at,
        }
    }

    /// Cache key of this entry.
    pub fn key(&self) -> SampleKey {
        SampleKey::new(&self.ticker, self.as_of_date)
    }
}

/// In-memory view of the cache, ordered by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalCache {
    entries: BTreeMap<SampleKey, SignalCacheEntry>,
}

impl SignalCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns whether `key` is cached.
    pub fn contains(&self, key: &SampleKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Cached entry for `key`.
    pub fn get(&self, key: &SampleKey) -> Option<&SignalCacheEntry> {
        self.entries.get(key)
    }

    /// Inserts `entry` unless its key is already present. Returns whether it was inserted.
    pub fn insert(&mut self, entry: SignalCacheEntry) -> bool {
        let key = entry.key();
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, entry);
        true
    }

    /// Merges `entries` into the cache, keeping existing entries on conflict.
    /// Returns the number of entries added.
    pub fn merge(&mut self, entries: impl IntoIterator<Item = SignalCacheEntry>) -> usize {
        entries.into_iter().filter(|e| self.insert(e.clone())).count()
    }

    /// Removes the entry for `key` so it is regenerated on the next run.
    pub fn invalidate(&mut self, key: &SampleKey) -> Option<SignalCacheEntry> {
        self.entries.remove(key)
    }

    /// Entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = &SignalCacheEntry> {
        self.entries.values()
    }

    /// Number of entries per rating label.
    pub fn rating_counts(&self) -> BTreeMap<RatingLabel, usize> {
        let mut counts = BTreeMap::new();
        for entry in self.entries.values() {
            *counts.entry(entry.ai_rating).or_insert(0) += 1;
        }
        counts
    }
}

/// Storage behind the signal cache.
///
/// `load` reads the whole cache; `save` replaces it. Implementations must not
/// leave a partially written cache behind if the process dies during `save`.
pub trait SignalRepository {
    /// Reads the persisted cache.
    fn load(&self) -> Result<SignalCache>;

    /// Persists `cache`, replacing the previous content.
    fn save(&mut self, cache: &SignalCache) -> Result<()>;
}

/// Cache stored as a CSV file.
#[derive(Debug, Clone)]
pub struct CsvSignalStore {
    path: PathBuf,
}

impl CsvSignalStore {
    /// Creates a store for `path`. The file is created on the first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the cache file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn corrupt(&self, reason: impl Into<String>) -> AugurError {
        AugurError::CacheCorrupt {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }

    fn parse_row(&self, record: &StringRecord, line: u64) -> Result<SignalCacheEntry> {
        let field = |i: usize| record.get(i).unwrap_or_default().trim();
        let bad = |what: &str, raw: &str| self.corrupt(format!("line {line}: invalid {what} '{raw}'"));

        let ticker = normalize_ticker(field(0));
        if ticker.is_empty() {
            return Err(bad("ticker", field(0)));
        }
        let as_of_date = Date::parse_from_str(field(1), "%Y-%m-%d")
            .map_err(|_| bad("as_of_date", field(1)))?;
        // Only canonical labels are ever written.
        let ai_rating = RatingLabel::ALL
            .into_iter()
            .find(|r| r.as_str() == field(2))
            .ok_or_else(|| bad("ai_rating", field(2)))?;
        let ai_confidence: f64 = field(3)
            .parse()
            .ok()
            .filter(|c: &f64| (0.0..=1.0).contains(c))
            .ok_or_else(|| bad("ai_confidence", field(3)))?;
        let ai_signal: f64 = field(4)
            .parse()
            .ok()
            .filter(|s: &f64| s.is_finite())
            .ok_or_else(|| bad("ai_signal", field(4)))?;
        let generated_at = DateTime::parse_from_rfc3339(field(5))
            .map_err(|_| bad("generated_at", field(5)))?
            .with_timezone(&Utc);

        Ok(SignalCacheEntry {
            ticker,
            as_of_date,
            ai_rating,
            ai_confidence,
            ai_signal,
            generated_at,
        })
    }
}

impl SignalRepository for CsvSignalStore {
    fn load(&self) -> Result<SignalCache> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no signal cache yet");
            return Ok(SignalCache::new());
        }

        let bytes = fs::read(&self.path)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(self.corrupt("file is empty"));
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_reader(bytes.as_slice());

        let header = reader
            .headers()
            .map_err(|e| self.corrupt(format!("unreadable header: {e}")))?
            .clone();
        if header.iter().map(str::trim).ne(CACHE_HEADER) {
            return Err(self.corrupt(format!(
                "unexpected header '{}', expected '{}'",
                header.iter().collect::<Vec<_>>().join(","),
                CACHE_HEADER.join(",")
            )));
        }

        let mut cache = SignalCache::new();
        for result in reader.records() {
            let record = result.map_err(|e| self.corrupt(e.to_string()))?;
            let line = record.position().map_or(0, |p| p.line());
            let entry = self.parse_row(&record, line)?;
            let key = entry.key();
            if !cache.insert(entry) {
                return Err(self.corrupt(format!("line {line}: duplicate key {key}")));
            }
        }

        debug!(path = %self.path.display(), entries = cache.len(), "loaded signal cache");
        Ok(cache)
    }

    fn save(&mut self, cache: &SignalCache) -> Result<()> {
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
        writer.write_record(CACHE_HEADER)?;
        for entry in cache.entries() {
            writer.write_record([
                entry.ticker.clone(),
                entry.as_of_date.format("%Y-%m-%d").to_string(),
                entry.ai_rating.to_string(),
                entry.ai_confidence.to_string(),
                entry.ai_signal.to_string(),
                entry.generated_at.to_rfc3339(),
            ])?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| AugurError::Io(e.into_error()))?;

        write_atomic(&self.path, &bytes)?;
        debug!(path = %self.path.display(), entries = cache.len(), "saved signal cache");
        Ok(())
    }
}

/// Cache held in memory. Counts saves, which makes flush behaviour observable.
#[derive(Debug, Clone, Default)]
pub struct MemorySignalStore {
    cache: SignalCache,
    saves: usize,
}

impl MemorySignalStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-filled with `cache`.
    pub fn with_cache(cache: SignalCache) -> Self {
        Self { cache, saves: 0 }
    }

    /// Number of completed saves.
    pub const fn saves(&self) -> usize {
        self.saves
    }

    /// Last saved cache.
    pub const fn cache(&self) -> &SignalCache {
        &self.cache
    }
}

impl SignalRepository for MemorySignalStore {
    fn load(&self) -> Result<SignalCache> {
        Ok(self.cache.clone())
    }

    fn save(&mut self, cache: &SignalCache) -> Result<()> {
        self.cache = cache.clone();
        self.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use augur_traits::Confidence;
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd_opt(y, m, day).unwrap()
    }

    fn entry(ticker: &str, date: Date, rating: RatingLabel, confidence: Confidence) -> SignalCacheEntry {
        let key = SampleKey::new(ticker, date);
        let generated_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 15).unwrap();
        SignalCacheEntry::from_response(&key, &RatingResponse::new(rating, confidence), generated_at)
    }

    fn sample_cache() -> SignalCache {
        let mut cache = SignalCache::new();
        cache.insert(entry("AAPL", d(2020, 1, 2), RatingLabel::Buy, Confidence::Medium));
        cache.insert(entry("MSFT", d(2020, 1, 2), RatingLabel::Sell, Confidence::Low));
        cache.insert(entry("AAPL", d(2020, 2, 3), RatingLabel::StrongBuy, Confidence::Score(0.123_456_789)));
        cache
    }

    #[test]
    fn test_merge_never_overwrites() {
        let mut cache = sample_cache();
        let original = cache.get(&SampleKey::new("AAPL", d(2020, 1, 2))).cloned().unwrap();

        let added = cache.merge([
            entry("AAPL", d(2020, 1, 2), RatingLabel::Sell, Confidence::High),
            entry("IBM", d(2020, 1, 2), RatingLabel::Hold, Confidence::High),
        ]);

        assert_eq!(added, 1);
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.get(&SampleKey::new("AAPL", d(2020, 1, 2))), Some(&original));
    }

    #[test]
    fn test_invalidate() {
        let mut cache = sample_cache();
        let key = SampleKey::new("msft", d(2020, 1, 2));
        assert!(cache.invalidate(&key).is_some());
        assert!(!cache.contains(&key));
        assert!(cache.invalidate(&key).is_none());
    }

    #[test]
    fn test_csv_round_trip_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signal_cache.csv");
        let mut store = CsvSignalStore::new(&path);

        let cache = sample_cache();
        store.save(&cache).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, cache);

        let first = fs::read(&path).unwrap();
        store.save(&loaded).unwrap();
        assert_eq!(fs::read(&path).unwrap(), first);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvSignalStore::new(dir.path().join("absent.csv"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_empty_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CsvSignalStore::new(dir.path().join("c.csv"));
        store.save(&SignalCache::new()).unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    fn load_text(text: &str) -> Result<SignalCache> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.csv");
        fs::write(&path, text).unwrap();
        CsvSignalStore::new(path).load()
    }

    #[test]
    fn test_corrupt_files_fail_fast() {
        let header = CACHE_HEADER.join(",");
        let good = "AAPL,2020-01-02,Buy,0.6,0.6,2024-05-01T12:30:15+00:00";

        let cases = [
            String::new(),
            "ticker,date,rating\n".to_string(),
            format!("{header}\n{good}\nMSFT,2020-01-0"),
            format!("{header}\nAAPL,2020-01-02,Buy,0.6\n"),
            format!("{header}\nAAPL,2020-01-02,Maybe,0.6,0.6,2024-05-01T12:30:15+00:00\n"),
            format!("{header}\nAAPL,2020-01-02,xxBUYxx,0.6,0.6,2024-05-01T12:30:15+00:00\n"),
            format!("{header}\nAAPL,2020-01-02,STRONG BUY,1.0,2.0,2024-05-01T12:30:15+00:00\n"),
            format!("{header}\nAAPL,2020-01-02,Buy,1.6,0.6,2024-05-01T12:30:15+00:00\n"),
            format!("{header}\n{good}\n{good}\n"),
        ];

        for text in cases {
            let result = load_text(&text);
            assert!(
                matches!(result, Err(AugurError::CacheCorrupt { .. })),
                "expected corrupt error for {text:?}, got {result:?}"
            );
        }
    }

    #[test]
    fn test_valid_text_loads() {
        let text = format!(
            "{}\nAAPL,2020-01-02,Buy,0.6,0.6,2024-05-01T12:30:15+00:00\n",
            CACHE_HEADER.join(",")
        );
        let cache = load_text(&text).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.rating_counts().get(&RatingLabel::Buy), Some(&1));
    }

    #[test]
    fn test_memory_store_counts_saves() {
        let mut store = MemorySignalStore::new();
        store.save(&sample_cache()).unwrap();
        store.save(&sample_cache()).unwrap();
        assert_eq!(store.saves(), 2);
        assert_eq!(store.load().unwrap().len(), 3);
    }
}
