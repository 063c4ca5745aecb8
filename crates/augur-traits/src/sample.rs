//! Evaluation samples: one (ticker, as_of_date) observation.
//!
//! Samples are assembled through [`EvaluationSampleBuilder`], which refuses any
//! forward return whose entry date is not strictly after the decision date.
//! Once built, a sample changes exactly once, when the signal generator attaches
//! the AI rating through [`EvaluationSample::with_signal`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{AugurError, Date, RatingLabel, Result, Ticker, normalize_ticker};

/// Key identifying a sample and its cached signal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SampleKey {
    /// Normalized ticker.
    pub ticker: Ticker,
    /// Decision date.
    pub as_of_date: Date,
}

impl SampleKey {
    /// Creates a key, normalizing the ticker.
    pub fn new(ticker: &str, as_of_date: Date) -> Self {
        Self {
            ticker: normalize_ticker(ticker),
            as_of_date,
        }
    }
}

impl std::fmt::Display for SampleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.ticker, self.as_of_date)
    }
}

/// A realized forward return and the two price dates it was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForwardReturn {
    /// Horizon in trading days after the execution date.
    pub horizon: usize,
    /// Date of the entry price (the execution date).
    pub entry_date: Date,
    /// Date of the exit price.
    pub exit_date: Date,
    /// `exit_price / entry_price - 1`.
    pub value: f64,
}

/// One (ticker, as_of_date) observation in the evaluation universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSample {
    key: SampleKey,
    human_rating: Option<RatingLabel>,
    sector: Option<String>,
    execution_date: Option<Date>,
    forward_returns: BTreeMap<usize, Option<ForwardReturn>>,
    ai_rating: Option<RatingLabel>,
    ai_confidence: Option<f64>,
    ai_signal: Option<f64>,
}

impl EvaluationSample {
    /// Starts building a sample for `ticker` decided at the close of `as_of_date`.
    pub fn builder(ticker: &str, as_of_date: Date) -> EvaluationSampleBuilder {
        EvaluationSampleBuilder::new(ticker, as_of_date)
    }

    /// Sample key.
    pub const fn key(&self) -> &SampleKey {
        &self.key
    }

    /// Ticker.
    pub fn ticker(&self) -> &str {
        &self.key.ticker
    }

    /// Decision date.
    pub const fn as_of_date(&self) -> Date {
        self.key.as_of_date
    }

    /// Human analyst rating on the decision date, if any.
    pub const fn human_rating(&self) -> Option<RatingLabel> {
        self.human_rating
    }

    /// Sector reported with the recommendation, if any.
    pub fn sector(&self) -> Option<&str> {
        self.sector.as_deref()
    }

    /// Next trading day after the decision date, if it could be established.
    pub const fn execution_date(&self) -> Option<Date> {
        self.execution_date
    }

    /// Horizons this sample was built for.
    pub fn horizons(&self) -> impl Iterator<Item = usize> + '_ {
        self.forward_returns.keys().copied()
    }

    /// Full forward return record for `horizon`.
    pub fn forward_return_record(&self, horizon: usize) -> Option<&ForwardReturn> {
        self.forward_returns.get(&horizon).and_then(Option::as_ref)
    }

    /// Forward return value for `horizon`, `None` when unavailable.
    pub fn forward_return(&self, horizon: usize) -> Option<f64> {
        self.forward_return_record(horizon).map(|r| r.value)
    }

    /// AI rating, once generated.
    pub const fn ai_rating(&self) -> Option<RatingLabel> {
        self.ai_rating
    }

    /// AI confidence in [0, 1], once generated.
    pub const fn ai_confidence(&self) -> Option<f64> {
        self.ai_confidence
    }

    /// AI signal in [-2, 2], once generated.
    pub const fn ai_signal(&self) -> Option<f64> {
        self.ai_signal
    }

    /// Human rating mapped onto the same ordinal scale as the AI signal.
    pub fn human_score(&self) -> Option<f64> {
        self.human_rating.map(RatingLabel::base_score)
    }

    /// Returns whether the AI fields have been attached.
    pub const fn has_signal(&self) -> bool {
        self.ai_signal.is_some()
    }

    /// Attaches the generated AI rating, consuming the sample.
    pub const fn with_signal(mut self, rating: RatingLabel, confidence: f64, signal: f64) -> Self {
        self.ai_rating = Some(rating);
        self.ai_confidence = Some(confidence);
        self.ai_signal = Some(signal);
        self
    }
}

/// Builder for [`EvaluationSample`].
#[derive(Debug, Clone)]
pub struct EvaluationSampleBuilder {
    key: SampleKey,
    human_rating: Option<RatingLabel>,
    sector: Option<String>,
    execution_date: Option<Date>,
    forward_returns: BTreeMap<usize, Option<ForwardReturn>>,
}

impl EvaluationSampleBuilder {
    fn new(ticker: &str, as_of_date: Date) -> Self {
        Self {
            key: SampleKey::new(ticker, as_of_date),
            human_rating: None,
            sector: None,
            execution_date: None,
            forward_returns: BTreeMap::new(),
        }
    }

    /// Sets the human rating.
    pub const fn human_rating(mut self, rating: Option<RatingLabel>) -> Self {
        self.human_rating = rating;
        self
    }

    /// Sets the sector.
    pub fn sector(mut self, sector: Option<String>) -> Self {
        self.sector = sector;
        self
    }

    /// Sets the execution date.
    pub const fn execution_date(mut self, date: Option<Date>) -> Self {
        self.execution_date = date;
        self
    }

    /// Records the forward return for `horizon`; `None` marks it unavailable.
    pub fn forward_return(mut self, horizon: usize, value: Option<ForwardReturn>) -> Self {
        self.forward_returns.insert(horizon, value);
        self
    }

    /// Builds the sample, checking every forward return against the decision date.
    pub fn build(self) -> Result<EvaluationSample> {
        let as_of = self.key.as_of_date;

        if let Some(exec) = self.execution_date
            && exec <= as_of
        {
            return Err(AugurError::LookAhead {
                ticker: self.key.ticker,
                as_of_date: as_of,
                entry_date: exec,
            });
        }

        for (horizon, record) in &self.forward_returns {
            let Some(record) = record else { continue };
            if record.entry_date <= as_of {
                return Err(AugurError::LookAhead {
                    ticker: self.key.ticker,
                    as_of_date: as_of,
                    entry_date: record.entry_date,
                });
            }
            if record.exit_date < record.entry_date || record.horizon != *horizon {
                return Err(AugurError::InvalidData(format!(
                    "{}: inconsistent {horizon}d return ({} -> {})",
                    self.key, record.entry_date, record.exit_date
                )));
            }
        }

        Ok(EvaluationSample {
            key: self.key,
            human_rating: self.human_rating,
            sector: self.sector,
            execution_date: self.execution_date,
            forward_returns: self.forward_returns,
            ai_rating: None,
            ai_confidence: None,
            ai_signal: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd_opt(y, m, day).unwrap()
    }

    fn fr(horizon: usize, entry: Date, exit: Date, value: f64) -> ForwardReturn {
        ForwardReturn {
            horizon,
            entry_date: entry,
            exit_date: exit,
            value,
        }
    }

    #[test]
    fn test_build_sample() {
        let sample = EvaluationSample::builder(" aapl", d(2020, 1, 3))
            .human_rating(Some(RatingLabel::Buy))
            .execution_date(Some(d(2020, 1, 6)))
            .forward_return(5, Some(fr(5, d(2020, 1, 6), d(2020, 1, 13), 0.02)))
            .forward_return(21, None)
            .build()
            .unwrap();

        assert_eq!(sample.ticker(), "AAPL");
        assert_eq!(sample.forward_return(5), Some(0.02));
        assert_eq!(sample.forward_return(21), None);
        assert_eq!(sample.forward_return(63), None);
        assert_eq!(sample.horizons().collect::<Vec<_>>(), vec![5, 21]);
        assert_eq!(sample.human_score(), Some(1.0));
        assert!(!sample.has_signal());
    }

    #[test]
    fn test_build_rejects_entry_on_decision_date() {
        let result = EvaluationSample::builder("AAPL", d(2020, 1, 3))
            .forward_return(5, Some(fr(5, d(2020, 1, 3), d(2020, 1, 10), 0.01)))
            .build();
        assert!(matches!(result, Err(AugurError::LookAhead { .. })));
    }

    #[test]
    fn test_build_rejects_execution_before_decision() {
        let result = EvaluationSample::builder("AAPL", d(2020, 1, 3))
            .execution_date(Some(d(2020, 1, 2)))
            .build();
        assert!(matches!(result, Err(AugurError::LookAhead { .. })));
    }

    #[test]
    fn test_build_rejects_mismatched_horizon() {
        let result = EvaluationSample::builder("AAPL", d(2020, 1, 3))
            .forward_return(5, Some(fr(10, d(2020, 1, 6), d(2020, 1, 17), 0.01)))
            .build();
        assert!(matches!(result, Err(AugurError::InvalidData(_))));
    }

    #[test]
    fn test_with_signal() {
        let sample = EvaluationSample::builder("MSFT", d(2021, 6, 1))
            .build()
            .unwrap()
            .with_signal(RatingLabel::StrongBuy, 0.3, 0.6);
        assert_eq!(sample.ai_rating(), Some(RatingLabel::StrongBuy));
        assert_eq!(sample.ai_confidence(), Some(0.3));
        assert_eq!(sample.ai_signal(), Some(0.6));
        assert!(sample.has_signal());
    }

    #[test]
    fn test_key_display() {
        let key = SampleKey::new("ibm", d(2019, 2, 1));
        assert_eq!(key.to_string(), "IBM@2019-02-01");
    }
}
