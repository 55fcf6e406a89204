use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::PriceStore;
use crate::domain::{Granularity, PriceArea, PricePoint};

type SeriesKey = (PriceArea, Granularity);

/// Price store held in memory, keyed per region and granularity.
///
/// Inserting a point for an instant that already exists replaces it, which
/// keeps at most one quote per (region, instant, granularity).
#[derive(Debug, Default)]
pub struct InMemoryPriceStore {
    series: RwLock<HashMap<SeriesKey, BTreeMap<DateTime<Utc>, PricePoint>>>,
}

impl InMemoryPriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_points(points: impl IntoIterator<Item = PricePoint>) -> Self {
        let store = Self::new();
        store.insert_many(points);
        store
    }

    /// Upsert one point, returning the quote it replaced
    pub fn insert(&self, point: PricePoint) -> Option<PricePoint> {
        self.series
            .write()
            .entry((point.region, point.granularity))
            .or_default()
            .insert(point.instant_utc, point)
    }

    pub fn insert_many(&self, points: impl IntoIterator<Item = PricePoint>) -> usize {
        let mut series = self.series.write();
        let mut inserted = 0;
        for point in points {
            series
                .entry((point.region, point.granularity))
                .or_default()
                .insert(point.instant_utc, point);
            inserted += 1;
        }
        debug!(inserted, "loaded prices into memory store");
        inserted
    }

    pub fn len(&self) -> usize {
        self.series.read().values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PriceStore for InMemoryPriceStore {
    async fn fetch_range(
        &self,
        region: PriceArea,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        granularity: Granularity,
    ) -> Result<Vec<PricePoint>> {
        if end <= start {
            return Ok(Vec::new());
        }
        let series = self.series.read();
        Ok(series
            .get(&(region, granularity))
            .map(|points| points.range(start..end).map(|(_, p)| p.clone()).collect())
            .unwrap_or_default())
    }
}
