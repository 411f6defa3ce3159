//! Injected indicator-catalogue cache seam.
//!
//! The recommendation pipeline works correctly, only slower, when the cache
//! is stubbed empty: missing snapshots are recomputed by the batch engine and
//! written through.

use base::entities::PricePoint;
use chrono::NaiveDate;
use indicators::snapshot::IndicatorSnapshot;
use indicators::{adjusted_closes, batch};
use std::collections::HashMap;

pub trait IndicatorCache {
    fn get(&self, ticker: &str, date: NaiveDate) -> Option<IndicatorSnapshot>;

    fn put(&mut self, ticker: &str, date: NaiveDate, snapshot: IndicatorSnapshot);
}

#[derive(Default)]
pub struct InMemoryIndicatorCache {
    snapshots: HashMap<(String, NaiveDate), IndicatorSnapshot>,
}

impl InMemoryIndicatorCache {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl IndicatorCache for InMemoryIndicatorCache {
    fn get(&self, ticker: &str, date: NaiveDate) -> Option<IndicatorSnapshot> {
        self.snapshots.get(&(ticker.to_owned(), date)).cloned()
    }

    fn put(&mut self, ticker: &str, date: NaiveDate, snapshot: IndicatorSnapshot) {
        self.snapshots.insert((ticker.to_owned(), date), snapshot);
    }
}

/// A cache that stores nothing; every lookup recomputes.
#[derive(Default)]
pub struct NoopIndicatorCache;

impl IndicatorCache for NoopIndicatorCache {
    fn get(&self, _ticker: &str, _date: NaiveDate) -> Option<IndicatorSnapshot> {
        None
    }

    fn put(&mut self, _ticker: &str, _date: NaiveDate, _snapshot: IndicatorSnapshot) {}
}

/// Snapshots for `prices[0..=end_index]`, read through the cache.
///
/// A snapshot's value depends only on the series up to its own index, so
/// entries cached against an earlier prefix stay valid.
pub fn catalogue_snapshots(
    prices: &[PricePoint],
    ticker: &str,
    end_index: usize,
    cache: &mut impl IndicatorCache,
) -> Vec<IndicatorSnapshot> {
    let mut snapshots: Vec<Option<IndicatorSnapshot>> = prices[..=end_index]
        .iter()
        .map(|price| cache.get(ticker, price.date))
        .collect();

    if snapshots.iter().any(Option::is_none) {
        let closes = adjusted_closes(&prices[..=end_index]);
        let computed = batch::compute_series(&closes);

        for (index, computed_snapshot) in computed.into_iter().enumerate() {
            if snapshots[index].is_none() {
                cache.put(ticker, prices[index].date, computed_snapshot.clone());
                snapshots[index] = Some(computed_snapshot);
            }
        }
    }

    snapshots.into_iter().flatten().collect()
}
