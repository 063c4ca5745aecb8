//! Signal cache commands.

use std::path::Path;

use anyhow::{Context, Result, bail};
use augur::SampleKey;
use augur::signals::{CsvSignalStore, SignalRepository};

use crate::cmd::print_banner;
use crate::data::parse_date;

/// Show the number of cached signals and their rating distribution.
pub(crate) fn cache_stats(path: &Path) -> Result<()> {
    print_banner("Signal Cache");

    if !path.exists() {
        bail!("no cache file at {}", path.display());
    }
    let cache = CsvSignalStore::new(path)
        .load()
        .with_context(|| format!("failed to read {}", path.display()))?;

    println!("Path:     {}", path.display());
    println!("Entries:  {}", cache.len());

    let first = cache.entries().map(|e| e.as_of_date).min();
    let last = cache.entries().map(|e| e.as_of_date).max();
    if let (Some(first), Some(last)) = (first, last) {
        println!("Dates:    {first} to {last}");
    }
    println!();

    println!("{:<14} {:>8} {:>8}", "Rating", "Count", "Share");
    println!("{}", "-".repeat(32));
    for (rating, count) in cache.rating_counts() {
        let share = count as f64 / cache.len() as f64;
        println!("{:<14} {:>8} {:>7.1}%", rating.to_string(), count, share * 100.0);
    }
    println!();

    Ok(())
}

/// Remove the entry for (`ticker`, `date`) and save the cache.
pub(crate) fn invalidate_entry(path: &Path, ticker: &str, date: &str) -> Result<()> {
    let key = SampleKey::new(ticker, parse_date(date)?);
    let mut store = CsvSignalStore::new(path);
    let mut cache = store
        .load()
        .with_context(|| format!("failed to read {}", path.display()))?;

    match cache.invalidate(&key) {
        Some(entry) => {
            store.save(&cache)?;
            println!(
                "Removed {key} ({}, signal {:.3}); {} entries remain",
                entry.ai_rating,
                entry.ai_signal,
                cache.len()
            );
        }
        None => println!("No cached signal for {key}"),
    }

    Ok(())
}
