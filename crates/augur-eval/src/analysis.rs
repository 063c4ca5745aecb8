//! Derived breakdowns of an evaluated universe.
//!
//! - Consensus/contrarian buckets comparing the AI rating with the human one
//! - IC statistics by calendar year, by regime window and by sector
//! - Holdout separation at a cutoff date

use std::collections::BTreeMap;

use augur_traits::{Date, EvaluationSample, RatingLabel, Result};
use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::backtest::{Backtest, BacktestConfig};
use crate::ic::{IcObservation, SignalColumn, compute_ic_series};
use crate::performance::PerformanceMetrics;
use crate::stats::{IcSummary, NeweyWestLags, summarize_ic};

/// How an AI rating relates to the human rating of the same sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// Same label.
    Agreement,
    /// Same direction (or one side neutral), AI further from neutral.
    MoreExtreme,
    /// Same direction (or one side neutral), AI closer to neutral.
    LessExtreme,
    /// Opposite directions, AI bullish.
    AiMoreBullish,
    /// Opposite directions, AI bearish.
    AiMoreBearish,
}

impl Alignment {
    /// Every bucket in report order.
    pub const ALL: [Self; 5] = [
        Self::Agreement,
        Self::MoreExtreme,
        Self::LessExtreme,
        Self::AiMoreBullish,
        Self::AiMoreBearish,
    ];

    /// Classifies an AI rating against a human rating.
    pub fn classify(ai: RatingLabel, human: RatingLabel) -> Self {
        let a = ai.base_score();
        let h = human.base_score();

        if ai == human {
            Self::Agreement
        } else if a * h < 0.0 {
            if a > h { Self::AiMoreBullish } else { Self::AiMoreBearish }
        } else if a.abs() > h.abs() {
            Self::MoreExtreme
        } else {
            Self::LessExtreme
        }
    }

    /// Bucket name used in artifacts.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Agreement => "agreement",
            Self::MoreExtreme => "more_extreme",
            Self::LessExtreme => "less_extreme",
            Self::AiMoreBullish => "ai_more_bullish",
            Self::AiMoreBearish => "ai_more_bearish",
        }
    }
}

/// Statistics for one alignment bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentBucket {
    /// Bucket.
    pub alignment: Alignment,
    /// Samples in the bucket.
    pub count: usize,
    /// Samples with a forward return at the horizon.
    pub with_return: usize,
    /// Mean forward return of those samples.
    pub mean_return: Option<f64>,
    /// IC of the AI signal within the bucket.
    pub ic: IcSummary,
}

/// Partitions samples with both ratings into alignment buckets.
///
/// All buckets are reported, empty ones with `None` statistics.
pub fn consensus_breakdown(
    samples: &[EvaluationSample],
    horizon: usize,
    min_cross_section: usize,
    lags: NeweyWestLags,
) -> Vec<AlignmentBucket> {
    let mut buckets: BTreeMap<Alignment, Vec<EvaluationSample>> = BTreeMap::new();
    for sample in samples {
        if let (Some(ai), Some(human)) = (sample.ai_rating(), sample.human_rating()) {
            buckets
                .entry(Alignment::classify(ai, human))
                .or_default()
                .push(sample.clone());
        }
    }

    Alignment::ALL
        .into_iter()
        .map(|alignment| {
            let members = buckets.remove(&alignment).unwrap_or_default();
            let returns: Vec<f64> = members
                .iter()
                .filter_map(|s| s.forward_return(horizon))
                .filter(|r| r.is_finite())
                .collect();
            let mean_return =
                (!returns.is_empty()).then(|| returns.iter().sum::<f64>() / returns.len() as f64);
            let series = compute_ic_series(&members, SignalColumn::AiSignal, horizon, min_cross_section);

            AlignmentBucket {
                alignment,
                count: members.len(),
                with_return: returns.len(),
                mean_return,
                ic: summarize_ic(&series, horizon, lags),
            }
        })
        .collect()
}

/// IC statistics for one group of dates or samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    /// Group label.
    pub label: String,
    /// IC summary of the group.
    pub ic: IcSummary,
}

/// A named window of decision dates, `start` inclusive and `end` exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Regime {
    /// Display label.
    pub label: String,
    /// First date in the regime; open-ended when `None`.
    pub start: Option<Date>,
    /// First date after the regime; open-ended when `None`.
    pub end: Option<Date>,
}

impl Regime {
    /// Creates a regime.
    pub fn new(label: impl Into<String>, start: Option<Date>, end: Option<Date>) -> Self {
        Self {
            label: label.into(),
            start,
            end,
        }
    }

    /// Whether `date` falls in the regime.
    pub fn contains(&self, date: Date) -> bool {
        self.start.is_none_or(|s| date >= s) && self.end.is_none_or(|e| date < e)
    }

    /// Pre-2015, 2015-2019, 2020-2022 and 2023+.
    pub fn default_set() -> Vec<Self> {
        let jan1 = |y| Date::from_ymd_opt(y, 1, 1);
        vec![
            Self::new("Pre-2015", None, jan1(2015)),
            Self::new("2015-2019", jan1(2015), jan1(2020)),
            Self::new("2020-2022", jan1(2020), jan1(2023)),
            Self::new("2023+", jan1(2023), None),
        ]
    }
}

/// Groups an IC series by calendar year of the decision date.
pub fn by_year(observations: &[IcObservation], horizon: usize, lags: NeweyWestLags) -> Vec<GroupStats> {
    let mut years: BTreeMap<i32, Vec<IcObservation>> = BTreeMap::new();
    for obs in observations {
        years.entry(obs.date.year()).or_default().push(*obs);
    }

    years
        .into_iter()
        .map(|(year, obs)| GroupStats {
            label: year.to_string(),
            ic: summarize_ic(&obs, horizon, lags),
        })
        .collect()
}

/// Groups an IC series by regime. Every regime is reported, empty or not.
pub fn by_regime(
    observations: &[IcObservation],
    regimes: &[Regime],
    horizon: usize,
    lags: NeweyWestLags,
) -> Vec<GroupStats> {
    regimes
        .iter()
        .map(|regime| {
            let obs: Vec<IcObservation> = observations
                .iter()
                .filter(|o| regime.contains(o.date))
                .copied()
                .collect();
            GroupStats {
                label: regime.label.clone(),
                ic: summarize_ic(&obs, horizon, lags),
            }
        })
        .collect()
}

/// IC within each sector. Samples without a sector are left out; returns an
/// empty list when no sample has one.
pub fn by_sector(
    samples: &[EvaluationSample],
    signal: SignalColumn,
    horizon: usize,
    min_cross_section: usize,
    lags: NeweyWestLags,
) -> Vec<GroupStats> {
    let mut sectors: BTreeMap<&str, Vec<EvaluationSample>> = BTreeMap::new();
    for sample in samples {
        if let Some(sector) = sample.sector() {
            sectors.entry(sector).or_default().push(sample.clone());
        }
    }

    sectors
        .into_iter()
        .map(|(sector, members)| GroupStats {
            label: sector.to_string(),
            ic: summarize_ic(
                &compute_ic_series(&members, signal, horizon, min_cross_section),
                horizon,
                lags,
            ),
        })
        .collect()
}

/// Splits samples at `cutoff`: decisions before it form the backtest period,
/// the rest the holdout period.
pub fn split_holdout(samples: &[EvaluationSample], cutoff: Date) -> (Vec<EvaluationSample>, Vec<EvaluationSample>) {
    samples.iter().cloned().partition(|s| s.as_of_date() < cutoff)
}

/// Statistics for one side of the holdout split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodReport {
    /// Samples in the period.
    pub n_samples: usize,
    /// IC summary.
    pub ic: IcSummary,
    /// Net performance of the backtest restricted to the period.
    pub performance: PerformanceMetrics,
}

/// Backtest-period and holdout-period statistics, reported separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldoutReport {
    /// First holdout decision date.
    pub cutoff: Date,
    /// Decisions before the cutoff.
    pub in_sample: PeriodReport,
    /// Decisions on or after the cutoff.
    pub holdout: PeriodReport,
}

/// Evaluates both sides of the holdout split.
pub fn holdout_report(
    samples: &[EvaluationSample],
    cutoff: Date,
    signal: SignalColumn,
    config: &BacktestConfig,
    min_cross_section: usize,
    lags: NeweyWestLags,
    periods_per_year: f64,
) -> Result<HoldoutReport> {
    let (in_sample, holdout) = split_holdout(samples, cutoff);
    let backtest = Backtest::new(config.clone());

    let period = |part: &[EvaluationSample]| -> Result<PeriodReport> {
        let series = compute_ic_series(part, signal, config.horizon, min_cross_section);
        let result = backtest.run(part, signal, periods_per_year)?;
        Ok(PeriodReport {
            n_samples: part.len(),
            ic: summarize_ic(&series, config.horizon, lags),
            performance: result.metrics,
        })
    };

    Ok(HoldoutReport {
        cutoff,
        in_sample: period(&in_sample)?,
        holdout: period(&holdout)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{HORIZON, build, day, rated, sample};
    use approx::assert_relative_eq;
    use augur_traits::RatingLabel::*;

    #[test]
    fn test_classify() {
        assert_eq!(Alignment::classify(Buy, Buy), Alignment::Agreement);
        assert_eq!(Alignment::classify(StrongBuy, Buy), Alignment::MoreExtreme);
        assert_eq!(Alignment::classify(Buy, StrongBuy), Alignment::LessExtreme);
        assert_eq!(Alignment::classify(Sell, UnderPerform), Alignment::MoreExtreme);
        assert_eq!(Alignment::classify(Hold, Sell), Alignment::LessExtreme);
        assert_eq!(Alignment::classify(Buy, Hold), Alignment::MoreExtreme);
        assert_eq!(Alignment::classify(Buy, Sell), Alignment::AiMoreBullish);
        assert_eq!(Alignment::classify(UnderPerform, StrongBuy), Alignment::AiMoreBearish);
    }

    #[test]
    fn test_consensus_breakdown_reports_every_bucket() {
        let samples = vec![
            rated("A", day(0), Some(Buy), Buy, Some(0.02)),
            rated("B", day(0), Some(Buy), Buy, Some(0.04)),
            rated("C", day(0), Some(Sell), Buy, Some(-0.01)),
            rated("D", day(0), Some(Buy), StrongBuy, None),
            // No human rating: not classified.
            rated("E", day(0), None, Sell, Some(0.5)),
        ];
        let buckets = consensus_breakdown(&samples, HORIZON, 5, NeweyWestLags::HorizonScaled);

        assert_eq!(buckets.len(), 5);
        let get = |a| buckets.iter().find(|b| b.alignment == a).unwrap();

        let agree = get(Alignment::Agreement);
        assert_eq!(agree.count, 2);
        assert_relative_eq!(agree.mean_return.unwrap(), 0.03, epsilon = 1e-12);
        // Two names never reach the minimum cross-section.
        assert_eq!(agree.ic.mean_ic, None);

        let extreme = get(Alignment::MoreExtreme);
        assert_eq!(extreme.count, 1);
        assert_eq!(extreme.with_return, 0);
        assert_eq!(extreme.mean_return, None);

        assert_eq!(get(Alignment::AiMoreBullish).count, 1);
        let bearish = get(Alignment::AiMoreBearish);
        assert_eq!(bearish.count, 0);
        assert_eq!(bearish.mean_return, None);
    }

    fn obs(date: Date, ic: f64) -> IcObservation {
        IcObservation {
            date,
            ic: Some(ic),
            n_obs: 10,
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_by_year() {
        let series = vec![
            obs(ymd(2019, 3, 1), 0.1),
            obs(ymd(2019, 9, 1), 0.3),
            obs(ymd(2020, 1, 2), -0.2),
        ];
        let groups = by_year(&series, HORIZON, NeweyWestLags::HorizonScaled);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].label, "2019");
        assert_relative_eq!(groups[0].ic.mean_ic.unwrap(), 0.2, epsilon = 1e-12);
        assert_eq!(groups[1].ic.n_obs, 1);
    }

    #[test]
    fn test_by_regime_boundaries() {
        let regimes = Regime::default_set();
        assert!(regimes[0].contains(ymd(2014, 12, 31)));
        assert!(!regimes[0].contains(ymd(2015, 1, 1)));
        assert!(regimes[1].contains(ymd(2015, 1, 1)));
        assert!(regimes[3].contains(ymd(2030, 6, 1)));

        let series = vec![obs(ymd(2014, 6, 1), 0.1), obs(ymd(2023, 1, 1), 0.4)];
        let groups = by_regime(&series, &regimes, HORIZON, NeweyWestLags::HorizonScaled);
        assert_eq!(groups.len(), 4);
        assert_eq!(groups[0].ic.mean_ic, Some(0.1));
        assert_eq!(groups[1].ic.n_obs, 0);
        assert_eq!(groups[1].ic.mean_ic, None);
        assert_eq!(groups[3].label, "2023+");
        assert_eq!(groups[3].ic.mean_ic, Some(0.4));
    }

    #[test]
    fn test_by_sector() {
        let mut samples = Vec::new();
        for i in 0..5 {
            let s = i as f64;
            samples.push(build(
                &format!("T{i}"),
                day(0),
                None,
                Some("Tech"),
                Some((Hold, s)),
                &[(HORIZON, Some(s / 100.0))],
            ));
        }
        samples.push(sample("X", day(0), Some(1.0), Some(0.0)));

        let groups = by_sector(&samples, SignalColumn::AiSignal, HORIZON, 5, NeweyWestLags::HorizonScaled);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].label, "Tech");
        assert_relative_eq!(groups[0].ic.mean_ic.unwrap(), 1.0);

        assert!(by_sector(&samples[5..], SignalColumn::AiSignal, HORIZON, 5, NeweyWestLags::HorizonScaled).is_empty());
    }

    #[test]
    fn test_holdout_split() {
        let samples = vec![
            sample("A", ymd(2022, 12, 30), Some(1.0), Some(0.01)),
            sample("B", ymd(2023, 1, 1), Some(-1.0), Some(0.02)),
            sample("C", ymd(2023, 2, 1), Some(1.0), Some(0.03)),
        ];
        let (in_sample, holdout) = split_holdout(&samples, ymd(2023, 1, 1));
        assert_eq!(in_sample.len(), 1);
        assert_eq!(holdout.len(), 2);
        assert!(holdout.iter().all(|s| s.as_of_date() >= ymd(2023, 1, 1)));

        let report = holdout_report(
            &samples,
            ymd(2023, 1, 1),
            SignalColumn::AiSignal,
            &BacktestConfig::default(),
            5,
            NeweyWestLags::HorizonScaled,
            12.0,
        )
        .unwrap();
        assert_eq!(report.in_sample.n_samples, 1);
        assert_eq!(report.holdout.n_samples, 2);
        assert_eq!(report.holdout.performance.n_periods, 2);
    }
}
