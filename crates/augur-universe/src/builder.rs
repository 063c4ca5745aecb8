//! Universe builder.
//!
//! Decisions are taken at the close of `as_of_date` and executed on the next
//! trading day. The forward return for horizon `h` is
//! `price(execution + h bars) / price(execution) - 1`, using the same price
//! field for both legs. Samples whose prices are missing keep a `None` return
//! instead of being dropped so coverage can be reported against the full set.

use std::collections::BTreeSet;
use std::fmt;

use augur_traits::{
    AugurError, Dataset, Date, DateRange, EvaluationSample, ForwardReturn, PriceBar, RatingLabel,
    Recommendation, Result, Ticker, normalize_ticker,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::sampling::{Allocation, stratified_sample};

/// Default tolerance between a decision date and its execution bar.
pub const DEFAULT_MAX_EXECUTION_GAP_DAYS: u64 = 5;

/// Which price of a bar is used for entry and exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    /// Opening price of the bar.
    #[default]
    Open,
    /// Closing price of the bar.
    Close,
}

/// Universe construction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniverseConfig {
    /// Decision dates to include.
    pub range: DateRange,
    /// Forward-return horizons in trading days, sorted and unique.
    pub horizons: Vec<usize>,
    /// Price used for both legs of a return.
    pub price_field: PriceField,
    /// Largest calendar gap allowed between a decision and its execution bar.
    pub max_execution_gap_days: u64,
}

impl UniverseConfig {
    /// Creates a configuration with open-price execution and the default gap.
    pub fn new(range: DateRange, horizons: Vec<usize>) -> Self {
        let horizons: BTreeSet<usize> = horizons.into_iter().collect();
        Self {
            range,
            horizons: horizons.into_iter().collect(),
            price_field: PriceField::default(),
            max_execution_gap_days: DEFAULT_MAX_EXECUTION_GAP_DAYS,
        }
    }

    /// Sets the price field.
    #[must_use]
    pub const fn with_price_field(mut self, field: PriceField) -> Self {
        self.price_field = field;
        self
    }

    /// Sets the maximum execution gap.
    #[must_use]
    pub const fn with_max_execution_gap_days(mut self, days: u64) -> Self {
        self.max_execution_gap_days = days;
        self
    }

    /// Longest configured horizon.
    pub fn max_horizon(&self) -> usize {
        self.horizons.iter().copied().max().unwrap_or(0)
    }

    /// Calendar days of price history needed past the end of the range.
    ///
    /// Trading days are converted at roughly 1.5 calendar days each plus a
    /// buffer for holidays.
    pub fn price_padding_days(&self) -> u64 {
        (self.max_horizon() as f64 * 1.5).ceil() as u64 + 30 + self.max_execution_gap_days
    }

    fn validate(&self) -> Result<()> {
        if self.horizons.is_empty() {
            return Err(AugurError::InvalidConfig(
                "at least one horizon is required".to_string(),
            ));
        }
        if self.horizons.contains(&0) {
            return Err(AugurError::InvalidConfig(
                "horizons must be at least one trading day".to_string(),
            ));
        }
        Ok(())
    }
}

/// One ticker's price bars in date order.
#[derive(Debug, Clone)]
pub struct PriceHistory {
    bars: Vec<PriceBar>,
    field: PriceField,
}

impl PriceHistory {
    /// Sorts the bars by date and drops repeated dates, keeping the first.
    pub fn new(mut bars: Vec<PriceBar>, field: PriceField) -> Self {
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        Self { bars, field }
    }

    /// Number of bars.
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Returns whether there are no bars.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Date of the bar at `idx`.
    pub fn date_at(&self, idx: usize) -> Option<Date> {
        self.bars.get(idx).map(|b| b.date)
    }

    fn price_at(&self, idx: usize) -> Option<f64> {
        let bar = self.bars.get(idx)?;
        let price = match self.field {
            PriceField::Open => bar.open?,
            PriceField::Close => bar.close,
        };
        (price.is_finite() && price > 0.0).then_some(price)
    }

    /// Index of the first bar strictly after `as_of`, if it falls within
    /// `max_gap_days` calendar days.
    pub fn execution_index(&self, as_of: Date, max_gap_days: u64) -> Option<usize> {
        let idx = self.bars.partition_point(|b| b.date <= as_of);
        let bar = self.bars.get(idx)?;
        let gap = (bar.date - as_of).num_days();
        (gap > 0 && gap.unsigned_abs() <= max_gap_days).then_some(idx)
    }

    /// Return from the bar at `entry_idx` to the bar `horizon` bars later.
    pub fn forward_return(&self, entry_idx: usize, horizon: usize) -> Option<ForwardReturn> {
        let entry = self.price_at(entry_idx)?;
        let exit_idx = entry_idx.checked_add(horizon)?;
        let exit = self.price_at(exit_idx)?;
        Some(ForwardReturn {
            horizon,
            entry_date: self.date_at(entry_idx)?,
            exit_date: self.date_at(exit_idx)?,
            value: exit / entry - 1.0,
        })
    }
}

/// A ticker without tradable price data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerGap {
    /// Ticker.
    pub ticker: Ticker,
    /// What was missing.
    pub reason: String,
}

/// Output of [`UniverseBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct Universe {
    /// Samples sorted by date then ticker.
    pub samples: Vec<EvaluationSample>,
    /// Tickers whose samples carry no returns for lack of data.
    pub gaps: Vec<TickerGap>,
}

impl Universe {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns whether the universe has no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of samples with a forward return at `horizon`.
    pub fn with_return(&self, horizon: usize) -> usize {
        self.samples
            .iter()
            .filter(|s| s.forward_return(horizon).is_some())
            .count()
    }

    /// Caps the universe at `max_samples` using stratified selection.
    #[must_use]
    pub fn downsample(self, max_samples: usize, allocation: Allocation) -> Self {
        let before = self.samples.len();
        let samples = stratified_sample(self.samples, max_samples, allocation);
        if samples.len() < before {
            info!(
                before,
                after = samples.len(),
                ?allocation,
                "downsampled universe"
            );
        }
        Self {
            samples,
            gaps: self.gaps,
        }
    }
}

/// Builds [`EvaluationSample`]s from a [`Dataset`].
pub struct UniverseBuilder<'a> {
    dataset: &'a dyn Dataset,
    config: UniverseConfig,
}

impl fmt::Debug for UniverseBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniverseBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<'a> UniverseBuilder<'a> {
    /// Creates a builder, rejecting configurations without usable horizons.
    pub fn new(dataset: &'a dyn Dataset, config: UniverseConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { dataset, config })
    }

    /// Configuration in use.
    pub const fn config(&self) -> &UniverseConfig {
        &self.config
    }

    /// Builds the samples for every ticker in the dataset.
    ///
    /// Tickers without tradable data are recorded in [`Universe::gaps`] and
    /// their recommendations are kept as samples with no execution date and
    /// no returns. Any other error aborts the build.
    pub fn build(&self) -> Result<Universe> {
        let tickers = self.dataset.tickers();
        let mut universe = Universe::default();

        for ticker in &tickers {
            match self.build_ticker(ticker) {
                Ok(samples) => universe.samples.extend(samples),
                Err(AugurError::DataGap { ticker, reason, .. }) => {
                    let samples = self.unpriced_samples(&ticker)?;
                    warn!(%ticker, %reason, samples = samples.len(), "data gap, keeping samples without returns");
                    universe.samples.extend(samples);
                    universe.gaps.push(TickerGap { ticker, reason });
                }
                Err(e) => return Err(e),
            }
        }

        universe
            .samples
            .sort_by(|a, b| (a.as_of_date(), a.ticker()).cmp(&(b.as_of_date(), b.ticker())));

        info!(
            tickers = tickers.len(),
            samples = universe.samples.len(),
            gaps = universe.gaps.len(),
            start = %self.config.range.start,
            end = %self.config.range.end,
            "built evaluation universe"
        );
        Ok(universe)
    }

    /// Builds the samples for one ticker.
    ///
    /// Fails with [`AugurError::DataGap`] when the ticker has no
    /// recommendations in range or no price bars on or after the range start.
    pub fn build_ticker(&self, ticker: &str) -> Result<Vec<EvaluationSample>> {
        let ticker = normalize_ticker(ticker);
        let range = self.config.range;

        let recs = self.dataset.recommendations(Some(&ticker), range)?;
        if recs.is_empty() {
            return Err(self.gap(ticker, "no recommendations in range"));
        }

        let price_range = range.extend_end(self.config.price_padding_days());
        let history = PriceHistory::new(self.dataset.prices(&ticker, price_range)?, self.config.price_field);
        if history.is_empty() {
            return Err(self.gap(ticker, "no price bars after range start"));
        }

        let (recs, collapsed) = dedupe_by_date(recs);
        if collapsed > 0 {
            debug!(%ticker, collapsed, "collapsed duplicate recommendations");
        }

        recs.into_iter()
            .map(|rec| self.sample_for(&history, rec))
            .collect()
    }

    /// Samples for `ticker` without price data: every return is `None`.
    fn unpriced_samples(&self, ticker: &str) -> Result<Vec<EvaluationSample>> {
        let recs = self.dataset.recommendations(Some(ticker), self.config.range)?;
        let (recs, _) = dedupe_by_date(recs);
        let no_prices = PriceHistory::new(Vec::new(), self.config.price_field);
        recs.into_iter()
            .map(|rec| self.sample_for(&no_prices, rec))
            .collect()
    }

    fn sample_for(&self, history: &PriceHistory, rec: Recommendation) -> Result<EvaluationSample> {
        let human = RatingLabel::parse_lenient(&rec.rating);
        if human.is_none() && !rec.rating.trim().is_empty() {
            debug!(ticker = %rec.ticker, date = %rec.date, rating = %rec.rating, "unrecognized rating");
        }

        let entry_idx = history.execution_index(rec.date, self.config.max_execution_gap_days);
        let mut builder = EvaluationSample::builder(&rec.ticker, rec.date)
            .human_rating(human)
            .sector(rec.sector)
            .execution_date(entry_idx.and_then(|i| history.date_at(i)));

        for &horizon in &self.config.horizons {
            let ret = entry_idx.and_then(|i| history.forward_return(i, horizon));
            builder = builder.forward_return(horizon, ret);
        }

        builder.build()
    }

    fn gap(&self, ticker: Ticker, reason: &str) -> AugurError {
        AugurError::DataGap {
            ticker,
            start: self.config.range.start,
            end: self.config.range.end,
            reason: reason.to_string(),
        }
    }
}

/// Keeps the first recommendation per date, returning how many were dropped.
fn dedupe_by_date(recs: Vec<Recommendation>) -> (Vec<Recommendation>, usize) {
    let total = recs.len();
    let mut seen = BTreeSet::new();
    let kept: Vec<_> = recs.into_iter().filter(|r| seen.insert(r.date)).collect();
    let dropped = total - kept.len();
    (kept, dropped)
}
