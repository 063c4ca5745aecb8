//! Polars-backed dataset.
//!
//! Expected frames:
//! - ratings: `ticker`, `date`, `rating`, optional `sector`
//! - prices: `ticker`, `date`, optional `open`, `close`
//! - news: `ticker`, `date`, `headline`
//!
//! Date columns may be polars `Date`/`Datetime` or ISO `YYYY-MM-DD` strings.
//! Records are indexed per ticker at construction, so lookups never touch the
//! frames again.

use std::collections::BTreeMap;
use std::path::Path;

use augur_traits::{
    AugurError, Dataset, Date, DateRange, NewsItem, PriceBar, Recommendation, Result, Ticker,
    normalize_ticker,
};
use polars::prelude::*;
use tracing::{debug, info};

/// Days between 0001-01-01 and the Unix epoch.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

trait Keyed {
    fn date(&self) -> Date;
    fn ticker_mut(&mut self) -> &mut Ticker;
}

impl Keyed for Recommendation {
    fn date(&self) -> Date {
        self.date
    }

    fn ticker_mut(&mut self) -> &mut Ticker {
        &mut self.ticker
    }
}

impl Keyed for PriceBar {
    fn date(&self) -> Date {
        self.date
    }

    fn ticker_mut(&mut self) -> &mut Ticker {
        &mut self.ticker
    }
}

impl Keyed for NewsItem {
    fn date(&self) -> Date {
        self.date
    }

    fn ticker_mut(&mut self) -> &mut Ticker {
        &mut self.ticker
    }
}

/// An in-memory [`Dataset`] indexed by ticker.
#[derive(Debug, Clone, Default)]
pub struct FrameDataset {
    recommendations: BTreeMap<Ticker, Vec<Recommendation>>,
    prices: BTreeMap<Ticker, Vec<PriceBar>>,
    news: BTreeMap<Ticker, Vec<NewsItem>>,
}

impl FrameDataset {
    /// Builds a dataset from typed records.
    ///
    /// Tickers are normalized and each ticker's records are sorted by date,
    /// keeping the input order among records on the same date.
    pub fn from_records(
        recommendations: Vec<Recommendation>,
        prices: Vec<PriceBar>,
        news: Vec<NewsItem>,
    ) -> Self {
        Self {
            recommendations: index(recommendations),
            prices: index(prices),
            news: index(news),
        }
    }

    /// Builds a dataset from polars frames.
    pub fn from_frames(
        ratings: &DataFrame,
        prices: &DataFrame,
        news: Option<&DataFrame>,
    ) -> Result<Self> {
        let recommendations = parse_ratings(ratings)?;
        let bars = parse_prices(prices)?;
        let news = news.map(parse_news).transpose()?.unwrap_or_default();

        let dataset = Self::from_records(recommendations, bars, news);
        info!(
            tickers = dataset.recommendations.len(),
            recommendations = dataset.n_recommendations(),
            price_bars = dataset.n_price_bars(),
            news = dataset.news.values().map(Vec::len).sum::<usize>(),
            "loaded dataset"
        );
        Ok(dataset)
    }

    /// Reads the frames from CSV files with a header row.
    pub fn from_csv_paths(ratings: &Path, prices: &Path, news: Option<&Path>) -> Result<Self> {
        let ratings = read_csv(ratings)?;
        let prices = read_csv(prices)?;
        let news = news.map(read_csv).transpose()?;
        Self::from_frames(&ratings, &prices, news.as_ref())
    }

    /// Total number of recommendation records.
    pub fn n_recommendations(&self) -> usize {
        self.recommendations.values().map(Vec::len).sum()
    }

    /// Total number of price bars.
    pub fn n_price_bars(&self) -> usize {
        self.prices.values().map(Vec::len).sum()
    }
}

impl Dataset for FrameDataset {
    fn tickers(&self) -> Vec<Ticker> {
        self.recommendations.keys().cloned().collect()
    }

    fn recommendations(
        &self,
        ticker: Option<&str>,
        range: DateRange,
    ) -> Result<Vec<Recommendation>> {
        match ticker {
            Some(t) => Ok(lookup(&self.recommendations, t, range)),
            None => {
                let mut all: Vec<_> = self
                    .recommendations
                    .values()
                    .flat_map(|recs| in_range(recs, range).iter().cloned())
                    .collect();
                all.sort_by_key(|r| r.date);
                Ok(all)
            }
        }
    }

    fn prices(&self, ticker: &str, range: DateRange) -> Result<Vec<PriceBar>> {
        Ok(lookup(&self.prices, ticker, range))
    }

    fn news(&self, ticker: &str, range: DateRange) -> Result<Vec<NewsItem>> {
        Ok(lookup(&self.news, ticker, range))
    }
}

fn index<T: Keyed>(records: Vec<T>) -> BTreeMap<Ticker, Vec<T>> {
    let mut map: BTreeMap<Ticker, Vec<T>> = BTreeMap::new();
    for mut record in records {
        let key = normalize_ticker(record.ticker_mut());
        record.ticker_mut().clone_from(&key);
        map.entry(key).or_default().push(record);
    }
    for records in map.values_mut() {
        records.sort_by_key(Keyed::date);
    }
    map
}

fn in_range<T: Keyed>(records: &[T], range: DateRange) -> &[T] {
    let lo = records.partition_point(|r| r.date() < range.start);
    let hi = records.partition_point(|r| r.date() <= range.end);
    &records[lo..hi.max(lo)]
}

fn lookup<T: Keyed + Clone>(
    map: &BTreeMap<Ticker, Vec<T>>,
    ticker: &str,
    range: DateRange,
) -> Vec<T> {
    map.get(&normalize_ticker(ticker))
        .map(|records| in_range(records, range).to_vec())
        .unwrap_or_default()
}

fn read_csv(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    debug!(path = %path.display(), rows = df.height(), "read csv frame");
    Ok(df)
}

fn required<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(Column::as_materialized_series)
        .map_err(|_| AugurError::MissingColumn(name.to_string()))
}

fn optional<'a>(df: &'a DataFrame, name: &str) -> Option<&'a Series> {
    df.column(name).ok().map(Column::as_materialized_series)
}

fn strings(series: &Series) -> Result<Vec<Option<String>>> {
    let cast = series.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v: Option<&str>| v.map(str::to_string))
        .collect())
}

fn floats(series: &Series) -> Result<Vec<Option<f64>>> {
    let cast = series.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}

fn dates(series: &Series) -> Result<Vec<Option<Date>>> {
    match series.dtype() {
        DataType::Date => Ok(series
            .date()?
            .into_iter()
            .map(|d: Option<i32>| {
                d.and_then(|d| Date::from_num_days_from_ce_opt(d + EPOCH_DAYS_FROM_CE))
            })
            .collect()),
        DataType::Datetime(_, _) => dates(&series.cast(&DataType::Date)?),
        DataType::String => series
            .str()?
            .into_iter()
            .map(|v: Option<&str>| v.map(parse_iso_date).transpose())
            .collect(),
        other => Err(AugurError::InvalidData(format!(
            "column '{}' has unsupported date type {other}",
            series.name()
        ))),
    }
}

fn parse_iso_date(raw: &str) -> Result<Date> {
    let trimmed = raw.trim();
    let day = trimmed.get(..10).unwrap_or(trimmed);
    Date::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| AugurError::InvalidData(format!("invalid date '{raw}': {e}")))
}

fn key_at(
    tickers: &[Option<String>],
    dates: &[Option<Date>],
    row: usize,
    frame: &str,
) -> Result<(Ticker, Date)> {
    match (tickers.get(row).cloned().flatten(), dates.get(row).copied().flatten()) {
        (Some(t), Some(d)) if !t.trim().is_empty() => Ok((normalize_ticker(&t), d)),
        _ => Err(AugurError::InvalidData(format!(
            "{frame} row {row}: missing ticker or date"
        ))),
    }
}

fn parse_ratings(df: &DataFrame) -> Result<Vec<Recommendation>> {
    let tickers = strings(required(df, "ticker")?)?;
    let dates = dates(required(df, "date")?)?;
    let ratings = strings(required(df, "rating")?)?;
    let sectors = optional(df, "sector").map(strings).transpose()?;

    (0..df.height())
        .map(|row| {
            let (ticker, date) = key_at(&tickers, &dates, row, "ratings")?;
            let sector = sectors
                .as_ref()
                .and_then(|s| s.get(row).cloned().flatten())
                .filter(|s| !s.trim().is_empty());
            Ok(Recommendation {
                ticker,
                date,
                rating: ratings.get(row).cloned().flatten().unwrap_or_default(),
                sector,
            })
        })
        .collect()
}

fn parse_prices(df: &DataFrame) -> Result<Vec<PriceBar>> {
    let tickers = strings(required(df, "ticker")?)?;
    let dates = dates(required(df, "date")?)?;
    let closes = floats(required(df, "close")?)?;
    let opens = optional(df, "open").map(floats).transpose()?;

    let mut bars = Vec::with_capacity(df.height());
    let mut skipped = 0usize;
    for row in 0..df.height() {
        let (ticker, date) = key_at(&tickers, &dates, row, "prices")?;
        let Some(close) = closes.get(row).copied().flatten() else {
            skipped += 1;
            continue;
        };
        let open = opens.as_ref().and_then(|o| o.get(row).copied().flatten());
        bars.push(PriceBar {
            ticker,
            date,
            open,
            close,
        });
    }
    if skipped > 0 {
        debug!(skipped, "dropped price rows without a close");
    }
    Ok(bars)
}

fn parse_news(df: &DataFrame) -> Result<Vec<NewsItem>> {
    let tickers = strings(required(df, "ticker")?)?;
    let dates = dates(required(df, "date")?)?;
    let headlines = strings(required(df, "headline")?)?;

    let mut items = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let (ticker, date) = key_at(&tickers, &dates, row, "news")?;
        if let Some(headline) = headlines.get(row).cloned().flatten() {
            items.push(NewsItem {
                ticker,
                date,
                headline,
            });
        }
    }
    Ok(items)
}
