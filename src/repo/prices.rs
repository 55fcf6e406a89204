//! Read-only access to stored spot prices.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::ops::Range;
use tracing::{debug, warn};

use crate::calendar::TimeZoneBucketer;
use crate::domain::{Granularity, PriceArea, PricePoint};

/// External price store. Implementations return the points of one series
/// whose start instant lies in `[start, end)`; an empty vector means no data.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceStore: Send + Sync {
    async fn fetch_range(
        &self,
        region: PriceArea,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        granularity: Granularity,
    ) -> Result<Vec<PricePoint>>;
}

/// Query facade over a [`PriceStore`]. Guarantees ascending, duplicate-free output.
pub struct PriceSeriesAccessor<S> {
    store: S,
}

impl<S: PriceStore> PriceSeriesAccessor<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Ordered price points of one series in `[start, end)`
    pub async fn fetch_range(
        &self,
        region: PriceArea,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        granularity: Granularity,
    ) -> Result<Vec<PricePoint>> {
        if end <= start {
            return Ok(Vec::new());
        }

        let mut points = self
            .store
            .fetch_range(region, start, end, granularity)
            .await
            .with_context(|| format!("Failed to fetch {granularity} prices for {region}"))?;

        if !points.windows(2).all(|w| w[0].instant_utc <= w[1].instant_utc) {
            warn!(%region, %granularity, "price store returned unordered points");
            points.sort_by_key(|p| p.instant_utc);
        }

        let before = points.len();
        points.dedup_by_key(|p| p.instant_utc);
        if points.len() != before {
            warn!(
                %region,
                %granularity,
                dropped = before - points.len(),
                "price store returned duplicate instants"
            );
        }

        if points.is_empty() {
            debug!(%region, %granularity, %start, %end, "no price data for range");
        } else {
            debug!(%region, %granularity, points = points.len(), "fetched prices");
        }

        Ok(points)
    }

    pub async fn fetch(&self, region: PriceArea, range: &Range<DateTime<Utc>>, granularity: Granularity) -> Result<Vec<PricePoint>> {
        self.fetch_range(region, range.start, range.end, granularity).await
    }

    /// Hourly points for a range. Hours the hourly series lacks are filled by
    /// averaging the quarter-hour series, if it has them.
    pub async fn fetch_hourly(
        &self,
        region: PriceArea,
        range: &Range<DateTime<Utc>>,
        bucketer: &TimeZoneBucketer,
    ) -> Result<Vec<PricePoint>> {
        let mut hourly = self.fetch(region, range, Granularity::Hourly).await?;
        let quarters = self.fetch(region, range, Granularity::QuarterHourly).await?;
        if quarters.is_empty() {
            return Ok(hourly);
        }

        let known: HashSet<DateTime<Utc>> = hourly.iter().map(|p| p.instant_utc).collect();
        let before = hourly.len();
        hourly.extend(
            bucketer
                .aggregate_hourly(&quarters)
                .into_iter()
                .filter(|p| !known.contains(&p.instant_utc)),
        );
        if hourly.len() != before {
            debug!(%region, filled = hourly.len() - before, "filled hours from quarter-hour prices");
            hourly.sort_by_key(|p| p.instant_utc);
        }
        Ok(hourly)
    }

    /// Price in effect at `now`: the quarter-hour quote if one covers it,
    /// otherwise the hourly one.
    pub async fn current_price(&self, region: PriceArea, now: DateTime<Utc>) -> Result<Option<PricePoint>> {
        for granularity in [Granularity::QuarterHourly, Granularity::Hourly] {
            let lookback = granularity.duration();
            let candidates = self
                .fetch_range(region, now - lookback, now + lookback, granularity)
                .await?;
            if let Some(point) = candidates.into_iter().find(|p| p.covers(now)) {
                return Ok(Some(point));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use mockall::predicate::eq;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 3, h, m, 0).unwrap()
    }

    fn point(instant: DateTime<Utc>, granularity: Granularity, price: f64) -> PricePoint {
        PricePoint::new(PriceArea::FI, instant, granularity, price, 0.255)
    }

    #[tokio::test]
    async fn test_empty_range_is_not_an_error() {
        let mut store = MockPriceStore::new();
        store.expect_fetch_range().returning(|_, _, _, _| Ok(vec![]));

        let accessor = PriceSeriesAccessor::new(store);
        let points = accessor
            .fetch_range(PriceArea::FI, at(0, 0), at(12, 0), Granularity::Hourly)
            .await
            .unwrap();
        assert!(points.is_empty());
    }

    #[tokio::test]
    async fn test_inverted_range_skips_store() {
        let mut store = MockPriceStore::new();
        store.expect_fetch_range().never();

        let accessor = PriceSeriesAccessor::new(store);
        let points = accessor
            .fetch_range(PriceArea::FI, at(12, 0), at(0, 0), Granularity::Hourly)
            .await
            .unwrap();
        assert!(points.is_empty());
    }

    #[tokio::test]
    async fn test_output_is_sorted_and_deduplicated() {
        let mut store = MockPriceStore::new();
        store.expect_fetch_range().returning(|_, _, _, _| {
            Ok(vec![
                point(at(2, 0), Granularity::Hourly, 3.0),
                point(at(1, 0), Granularity::Hourly, 2.0),
                point(at(2, 0), Granularity::Hourly, 9.0),
            ])
        });

        let accessor = PriceSeriesAccessor::new(store);
        let points = accessor
            .fetch_range(PriceArea::FI, at(0, 0), at(12, 0), Granularity::Hourly)
            .await
            .unwrap();
        let instants: Vec<_> = points.iter().map(|p| p.instant_utc).collect();
        assert_eq!(instants, vec![at(1, 0), at(2, 0)]);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let mut store = MockPriceStore::new();
        store
            .expect_fetch_range()
            .returning(|_, _, _, _| Err(anyhow::anyhow!("connection refused")));

        let accessor = PriceSeriesAccessor::new(store);
        let result = accessor
            .fetch_range(PriceArea::FI, at(0, 0), at(1, 0), Granularity::Hourly)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_current_price_prefers_quarter_hour() {
        let mut store = MockPriceStore::new();
        store
            .expect_fetch_range()
            .with(
                eq(PriceArea::FI),
                eq(at(9, 22) - Duration::minutes(15)),
                eq(at(9, 22) + Duration::minutes(15)),
                eq(Granularity::QuarterHourly),
            )
            .returning(|_, _, _, _| {
                Ok(vec![
                    point(at(9, 15), Granularity::QuarterHourly, 7.0),
                    point(at(9, 30), Granularity::QuarterHourly, 8.0),
                ])
            });
        store
            .expect_fetch_range()
            .with(eq(PriceArea::FI), mockall::predicate::always(), mockall::predicate::always(), eq(Granularity::Hourly))
            .never();

        let accessor = PriceSeriesAccessor::new(store);
        let current = accessor.current_price(PriceArea::FI, at(9, 22)).await.unwrap().unwrap();
        assert_eq!(current.price_without_tax, 7.0);
        assert_eq!(current.granularity, Granularity::QuarterHourly);
    }

    #[tokio::test]
    async fn test_current_price_falls_back_to_hourly() {
        let mut store = MockPriceStore::new();
        store
            .expect_fetch_range()
            .returning(|_, _, _, granularity| match granularity {
                Granularity::QuarterHourly => Ok(vec![]),
                Granularity::Hourly => Ok(vec![point(at(9, 0), Granularity::Hourly, 4.5)]),
            });

        let accessor = PriceSeriesAccessor::new(store);
        let current = accessor.current_price(PriceArea::FI, at(9, 40)).await.unwrap().unwrap();
        assert_eq!(current.price_without_tax, 4.5);
        assert_eq!(current.granularity, Granularity::Hourly);
    }

    #[tokio::test]
    async fn test_current_price_absent() {
        let mut store = MockPriceStore::new();
        store.expect_fetch_range().returning(|_, _, _, _| Ok(vec![]));

        let accessor = PriceSeriesAccessor::new(store);
        assert!(accessor.current_price(PriceArea::FI, at(9, 40)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fetch_hourly_prefers_hourly_series() {
        let mut store = MockPriceStore::new();
        store
            .expect_fetch_range()
            .returning(|_, _, _, granularity| match granularity {
                Granularity::Hourly => Ok(vec![point(at(10, 0), Granularity::Hourly, 5.0)]),
                Granularity::QuarterHourly => Ok((0..8)
                    .map(|q| point(at(10, 0) + Duration::minutes(15 * q), Granularity::QuarterHourly, 1.0))
                    .collect()),
            });

        let accessor = PriceSeriesAccessor::new(store);
        let hourly = accessor
            .fetch_hourly(PriceArea::FI, &(at(10, 0)..at(12, 0)), &TimeZoneBucketer::helsinki())
            .await
            .unwrap();
        let prices: Vec<f64> = hourly.iter().map(|p| p.price_without_tax).collect();
        assert_eq!(prices, vec![5.0, 1.0]);
        assert_eq!(hourly[1].instant_utc, at(11, 0));
    }

    #[tokio::test]
    async fn test_fetch_hourly_resamples_quarters() {
        let mut store = MockPriceStore::new();
        store
            .expect_fetch_range()
            .returning(|_, _, _, granularity| match granularity {
                Granularity::Hourly => Ok(vec![]),
                Granularity::QuarterHourly => Ok((0..4)
                    .map(|q| point(at(10, 15 * q), Granularity::QuarterHourly, f64::from(q)))
                    .collect()),
            });

        let accessor = PriceSeriesAccessor::new(store);
        let hourly = accessor
            .fetch_hourly(PriceArea::FI, &(at(10, 0)..at(11, 0)), &TimeZoneBucketer::helsinki())
            .await
            .unwrap();
        assert_eq!(hourly.len(), 1);
        assert_eq!(hourly[0].price_without_tax, 1.5);
        assert_eq!(hourly[0].granularity, Granularity::Hourly);
    }
}
