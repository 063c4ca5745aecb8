//! Stratified downsampling.
//!
//! Strata are the human rating categories, with unrated samples as their own
//! stratum. Each stratum gets a quota and contributes samples spread evenly
//! through its date order, so a small run still covers the whole period.

use std::collections::BTreeMap;

use augur_traits::{EvaluationSample, RatingLabel};
use serde::{Deserialize, Serialize};

/// How the sample cap is split across rating categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Allocation {
    /// Quotas proportional to stratum size (largest-remainder rounding).
    #[default]
    Proportional,
    /// Equal quotas, capped at stratum size, leftover spread over the rest.
    CappedEqual,
}

/// Selects at most `max_samples` samples balanced across rating categories.
///
/// The result is sorted by date then ticker. When the input already fits, it is
/// returned whole.
pub fn stratified_sample(
    samples: Vec<EvaluationSample>,
    max_samples: usize,
    allocation: Allocation,
) -> Vec<EvaluationSample> {
    let mut strata: BTreeMap<Option<RatingLabel>, Vec<EvaluationSample>> = BTreeMap::new();
    let total = samples.len();
    for sample in samples {
        strata.entry(sample.human_rating()).or_default().push(sample);
    }

    let sizes: Vec<usize> = strata.values().map(Vec::len).collect();
    let quotas = if total <= max_samples {
        sizes.clone()
    } else {
        match allocation {
            Allocation::Proportional => proportional_quotas(&sizes, max_samples),
            Allocation::CappedEqual => capped_equal_quotas(&sizes, max_samples),
        }
    };

    let mut selected: Vec<EvaluationSample> = strata
        .into_values()
        .zip(quotas)
        .flat_map(|(mut stratum, quota)| {
            stratum.sort_by(|a, b| (a.as_of_date(), a.ticker()).cmp(&(b.as_of_date(), b.ticker())));
            evenly_spaced(stratum, quota)
        })
        .collect();

    selected.sort_by(|a, b| (a.as_of_date(), a.ticker()).cmp(&(b.as_of_date(), b.ticker())));
    selected
}

/// Largest-remainder apportionment of `target` over `sizes`.
fn proportional_quotas(sizes: &[usize], target: usize) -> Vec<usize> {
    let total: usize = sizes.iter().sum();
    if total == 0 {
        return vec![0; sizes.len()];
    }

    let mut quotas: Vec<usize> = sizes.iter().map(|&s| s * target / total).collect();
    let mut remainders: Vec<(usize, usize)> = sizes
        .iter()
        .enumerate()
        .map(|(i, &s)| (s * target % total, i))
        .collect();
    // Larger remainder first, then the earlier stratum.
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    let mut left = target.saturating_sub(quotas.iter().sum());
    for (_, i) in remainders {
        if left == 0 {
            break;
        }
        if quotas[i] < sizes[i] {
            quotas[i] += 1;
            left -= 1;
        }
    }
    quotas
}

/// Equal shares capped at stratum size, redistributing what small strata cannot use.
fn capped_equal_quotas(sizes: &[usize], target: usize) -> Vec<usize> {
    let mut quotas = vec![0; sizes.len()];
    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by_key(|&i| sizes[i]);

    let mut left = target;
    for (pos, &i) in order.iter().enumerate() {
        let share = left / (order.len() - pos);
        quotas[i] = sizes[i].min(share);
        left -= quotas[i];
    }

    // Integer division leftovers go one at a time to strata with room.
    while left > 0 {
        let mut progressed = false;
        for &i in &order {
            if left > 0 && quotas[i] < sizes[i] {
                quotas[i] += 1;
                left -= 1;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }
    quotas
}

/// Picks `k` items spread evenly through `items`.
fn evenly_spaced<T>(items: Vec<T>, k: usize) -> Vec<T> {
    let n = items.len();
    if k >= n {
        return items;
    }
    if k == 0 {
        return Vec::new();
    }
    let mut wanted = (0..k).map(|j| (2 * j + 1) * n / (2 * k)).peekable();
    items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| {
            if wanted.peek() == Some(&i) {
                wanted.next();
                Some(item)
            } else {
                None
            }
        })
        .collect()
}
