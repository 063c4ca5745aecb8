//! End-to-end runs against an in-memory dataset and a scripted provider.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use augur::eval::report::{BACKTEST_FILE, DECAY_FILE, IC_SERIES_FILE, SUMMARY_FILE, UNIVERSE_FILE};
use augur::signals::{CsvSignalStore, SignalRepository};
use augur::traits::{NewsItem, PriceBar, Recommendation};
use augur::universe::FrameDataset;
use augur::{
    Confidence, Date, ProviderError, RatingLabel, RatingProvider, RatingResponse, RunConfig, run_evaluation,
};
use chrono::Datelike;

const TICKERS: [&str; 6] = ["AAA", "BBB", "CCC", "DDD", "EEE", "FFF"];

/// Rates by position in `TICKERS`, so the signal rises with the ticker's growth rate.
#[derive(Clone, Default)]
struct LadderProvider {
    calls: Arc<AtomicUsize>,
}

impl RatingProvider for LadderProvider {
    fn name(&self) -> &str {
        "ladder"
    }

    async fn rate(&self, ticker: &str, as_of_date: Date) -> Result<RatingResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = match TICKERS.iter().position(|t| *t == ticker) {
            Some(0) => RatingResponse::new(RatingLabel::Sell, Confidence::High),
            Some(1) => RatingResponse::new(RatingLabel::UnderPerform, Confidence::High),
            Some(2) => RatingResponse::new(RatingLabel::Hold, Confidence::High),
            Some(3) => RatingResponse::new(RatingLabel::Buy, Confidence::Medium),
            Some(4) => RatingResponse::new(RatingLabel::Buy, Confidence::High),
            Some(_) => RatingResponse::new(RatingLabel::StrongBuy, Confidence::High),
            None => {
                return Err(ProviderError::Unavailable {
                    ticker: ticker.to_string(),
                    as_of_date,
                });
            }
        };
        Ok(response)
    }
}

fn ymd(y: i32, m: u32, d: u32) -> Date {
    Date::from_ymd_opt(y, m, d).unwrap()
}

fn weekdays(start: Date, end: Date) -> Vec<Date> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| d.weekday().number_from_monday() <= 5)
        .collect()
}

/// Six rated tickers with distinct growth rates, one ticker the provider
/// cannot rate and one ticker without prices.
fn dataset() -> FrameDataset {
    let mondays: Vec<Date> = weekdays(ymd(2020, 1, 6), ymd(2020, 3, 27))
        .into_iter()
        .filter(|d| d.weekday().number_from_monday() == 1)
        .collect();
    let trading_days = weekdays(ymd(2020, 1, 1), ymd(2020, 6, 30));
    let human = ["Buy", "Hold", "Sell", "Strong Buy"];

    let mut recommendations = Vec::new();
    let mut prices = Vec::new();
    let rated: Vec<&str> = TICKERS.iter().copied().chain(["FAIL"]).collect();

    for (i, ticker) in rated.iter().enumerate() {
        for (j, date) in mondays.iter().enumerate() {
            recommendations.push(Recommendation {
                ticker: ticker.to_string(),
                date: *date,
                rating: human[(i + j) % human.len()].to_string(),
                sector: Some(if i % 2 == 0 { "Tech" } else { "Energy" }.to_string()),
            });
        }
        let growth = 1.0 + i as f64 * 0.001;
        for (k, date) in trading_days.iter().enumerate() {
            let close = 100.0 * growth.powi(k as i32);
            prices.push(PriceBar {
                ticker: ticker.to_string(),
                date: *date,
                open: Some(close),
                close,
            });
        }
    }

    recommendations.push(Recommendation {
        ticker: "GAP".to_string(),
        date: ymd(2020, 2, 3),
        rating: "Buy".to_string(),
        sector: None,
    });

    let news = vec![NewsItem {
        ticker: "AAA".to_string(),
        date: ymd(2020, 1, 3),
        headline: "Guidance cut".to_string(),
    }];

    FrameDataset::from_records(recommendations, prices, news)
}

fn config(dir: &std::path::Path) -> RunConfig {
    RunConfig {
        start_date: ymd(2020, 1, 6),
        end_date: ymd(2020, 3, 27),
        primary_horizon: 21,
        horizons: vec![5, 21],
        holdout_start: ymd(2020, 3, 1),
        output_dir: dir.join("outputs"),
        cache_path: Some(dir.join("cache").join("signals.csv")),
        flush_every: 5,
        ..RunConfig::default()
    }
}

#[tokio::test]
async fn test_full_run_writes_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let dataset = dataset();
    let provider = LadderProvider::default();

    let report = run_evaluation(&config, &dataset, provider.clone(), CsvSignalStore::new(config.cache_path()))
        .await
        .unwrap();

    // 7 tickers with prices x 12 Mondays plus one unpriced GAP sample; the
    // provider rates 6 of the priced tickers.
    let coverage = report.summary.coverage;
    assert_eq!(coverage.total_samples, 85);
    assert_eq!(coverage.generated_signals, 72);
    assert_eq!(coverage.reused_signals, 0);
    assert_eq!(coverage.failed_keys, 13);
    assert_eq!(coverage.with_signal, 72);
    assert_eq!(coverage.data_gap_tickers, 1);
    assert_eq!(report.summary.data_gaps, vec!["GAP".to_string()]);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 85);
    assert!(report.summary.failed_keys.iter().all(|k| k.ticker == "FAIL" || k.ticker == "GAP"));

    // Signals rise with growth, so every date ranks perfectly.
    assert_eq!(report.ic_series.len(), 12);
    for obs in &report.ic_series {
        assert_eq!(obs.n_obs, 6);
        assert!((obs.ic.unwrap() - 1.0).abs() < 1e-12);
    }
    assert!((report.summary.ic.mean_ic.unwrap() - 1.0).abs() < 1e-12);
    assert_eq!(report.summary.ic.t_stat, None);

    // Every sample executes strictly after its decision date.
    for sample in &report.samples {
        if let Some(record) = sample.forward_return_record(21) {
            assert!(record.entry_date > sample.as_of_date());
        }
    }

    let states = &report.backtest.states;
    assert_eq!(states.len(), 12);
    assert!(states.iter().all(|s| s.gross_exposure() <= 1.0 + 1e-12));
    assert!(states[0].gross_return > 0.0);
    assert!(report.summary.holdout.holdout.n_samples > 0);
    assert!(report.summary.holdout.in_sample.n_samples > 0);
    assert_eq!(report.summary.by_sector.len(), 2);

    let out = config.output_dir.clone();
    for name in [IC_SERIES_FILE, DECAY_FILE, BACKTEST_FILE, UNIVERSE_FILE, SUMMARY_FILE] {
        assert!(out.join(name).exists(), "{name} missing");
    }
    assert_eq!(report.artifacts.len(), 5);

    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.join(SUMMARY_FILE)).unwrap()).unwrap();
    assert_eq!(summary["primary_horizon"], 21);
    assert_eq!(summary["coverage"]["failed_keys"], 13);
    assert!(summary["ic"]["t_stat"].is_null());
}

#[tokio::test]
async fn test_unpriced_ticker_counted_in_coverage() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig {
        cache_only: true,
        ..config(dir.path())
    };

    let report = run_evaluation(&config, &dataset(), LadderProvider::default(), CsvSignalStore::new(config.cache_path()))
        .await
        .unwrap();

    let coverage = report.summary.coverage;
    assert_eq!(coverage.total_samples, 85);
    assert_eq!(coverage.with_primary_return, 84);
    assert_eq!(coverage.data_gap_tickers, 1);

    let gap: Vec<_> = report.samples.iter().filter(|s| s.ticker() == "GAP").collect();
    assert_eq!(gap.len(), 1);
    assert_eq!(gap[0].execution_date(), None);
    assert!(config.horizons.iter().all(|&h| gap[0].forward_return(h).is_none()));
}

#[tokio::test]
async fn test_second_run_reuses_cache() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let dataset = dataset();

    let first = LadderProvider::default();
    let first_report = run_evaluation(&config, &dataset, first.clone(), CsvSignalStore::new(config.cache_path()))
        .await
        .unwrap();

    let second = LadderProvider::default();
    let second_report = run_evaluation(&config, &dataset, second.clone(), CsvSignalStore::new(config.cache_path()))
        .await
        .unwrap();

    // Only the keys that failed are tried again.
    assert_eq!(second.calls.load(Ordering::SeqCst), 13);
    assert_eq!(second_report.summary.coverage.generated_signals, 0);
    assert_eq!(second_report.summary.coverage.reused_signals, 72);

    let signals = |r: &augur::EvaluationReport| -> Vec<Option<f64>> { r.samples.iter().map(|s| s.ai_signal()).collect() };
    assert_eq!(signals(&first_report), signals(&second_report));

    let cache = CsvSignalStore::new(config.cache_path()).load().unwrap();
    assert_eq!(cache.len(), 72);
}

#[tokio::test]
async fn test_cache_only_run_makes_no_calls() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig {
        cache_only: true,
        ..config(dir.path())
    };
    let provider = LadderProvider::default();

    let report = run_evaluation(&config, &dataset(), provider.clone(), CsvSignalStore::new(config.cache_path()))
        .await
        .unwrap();

    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    assert_eq!(report.summary.coverage.with_signal, 0);
    assert!(report.ic_series.iter().all(|o| o.ic.is_none()));
    assert!(report.summary.performance.sharpe.is_none());
}

#[tokio::test]
async fn test_downsampled_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig {
        max_samples: Some(20),
        ..config(dir.path())
    };
    let provider = LadderProvider::default();

    let report = run_evaluation(&config, &dataset(), provider.clone(), CsvSignalStore::new(config.cache_path()))
        .await
        .unwrap();

    assert_eq!(report.summary.coverage.total_samples, 20);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 20);
}

#[tokio::test]
async fn test_corrupt_cache_aborts_before_rating() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let path = config.cache_path();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "ticker,as_of_date\nAAA,2020-01-06\n").unwrap();
    let provider = LadderProvider::default();

    let err = run_evaluation(&config, &dataset(), provider.clone(), CsvSignalStore::new(path))
        .await
        .unwrap_err();

    assert!(matches!(err, augur::AugurError::CacheCorrupt { .. }));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}
