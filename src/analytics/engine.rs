//! Composes the analytics for one region into a single snapshot.

use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::historical::{HistoricalComparator, HistoricalComparison};
use super::savings::{peak_trough_cost, scheduled_load_savings, PeakTroughCost, ScheduledLoadSavings};
use super::statistics::DayStatistics;
use super::window::{best_consecutive_window, cheapest_upcoming, ConsecutiveWindow};
use crate::calendar::{on_date, LocalHourBucket, TimeZoneBucketer};
use crate::config::AnalyticsConfig;
use crate::domain::{AnalyticsError, Granularity, PriceArea, PricePoint};
use crate::presentation::{day_chart, write_csv, DecimalSeparator, PriceChart};
use crate::repo::{PriceSeriesAccessor, PriceStore};

/// Everything the dashboard shows, computed against one captured instant
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSnapshot {
    pub region: PriceArea,
    pub generated_at: DateTime<Utc>,
    pub local_date: NaiveDate,
    pub current_price: Option<PricePoint>,
    pub today: DayStatistics,
    /// Absent until tomorrow's prices are published
    pub tomorrow: Option<DayStatistics>,
    pub best_window: Option<ConsecutiveWindow>,
    pub cheapest_upcoming: Vec<LocalHourBucket>,
    pub comparison: HistoricalComparison,
    pub scheduled_load: Option<ScheduledLoadSavings>,
    pub sauna: Option<PeakTroughCost>,
    pub chart: PriceChart,
}

pub struct AnalyticsEngine<S> {
    accessor: PriceSeriesAccessor<S>,
    region: PriceArea,
    bucketer: TimeZoneBucketer,
    settings: AnalyticsConfig,
}

impl<S: PriceStore> AnalyticsEngine<S> {
    pub fn new(store: S, settings: AnalyticsConfig) -> Result<Self> {
        Ok(Self {
            accessor: PriceSeriesAccessor::new(store),
            region: settings.area()?,
            bucketer: settings.bucketer()?,
            settings,
        })
    }

    pub fn region(&self) -> PriceArea {
        self.region
    }

    pub fn bucketer(&self) -> &TimeZoneBucketer {
        &self.bucketer
    }

    /// Hourly buckets of the inclusive local-date window `[first, last]`
    pub async fn local_days(&self, first: NaiveDate, last: NaiveDate) -> Result<Vec<LocalHourBucket>> {
        let range = self.bucketer.days_range(first, last)?;
        let points = self.accessor.fetch_hourly(self.region, &range, &self.bucketer).await?;
        Ok(self.bucketer.bucket(&points))
    }

    pub async fn day_statistics(&self, date: NaiveDate) -> Result<DayStatistics> {
        let day = self.local_days(date, date).await?;
        Ok(DayStatistics::from_points(&day))
    }

    pub async fn snapshot(&self, now: DateTime<Utc>) -> Result<AnalyticsSnapshot> {
        let today = self.bucketer.local_date(now);
        let tomorrow = today
            .succ_opt()
            .ok_or_else(|| AnalyticsError::InvalidDate(today.to_string()))?;

        let comparator = HistoricalComparator::new(self.bucketer);
        let horizons = comparator.horizons(now)?;
        let history_range = horizons.fetch_range(&self.bucketer)?;
        let upcoming_range = self.bucketer.day_range(tomorrow)?;

        // History ends with today; tomorrow comes from a second, adjacent range.
        let mut points = self.accessor.fetch_hourly(self.region, &history_range, &self.bucketer).await?;
        points.extend(self.accessor.fetch_hourly(self.region, &upcoming_range, &self.bucketer).await?);
        let series = self.bucketer.bucket(&points);
        debug!(region = %self.region, buckets = series.len(), "price history loaded");

        let today_buckets = on_date(&series, today);
        let tomorrow_buckets = on_date(&series, tomorrow);
        let near: Vec<LocalHourBucket> = today_buckets.iter().chain(&tomorrow_buckets).cloned().collect();

        let current_price = self.accessor.current_price(self.region, now).await?;
        let comparison = comparator.compare(&series, now)?;
        let best_window = best_consecutive_window(&today_buckets, self.settings.scheduled_load_hours);
        let upcoming = cheapest_upcoming(&near, now, self.settings.cheapest_hours_count);

        let snapshot = AnalyticsSnapshot {
            region: self.region,
            generated_at: now,
            local_date: today,
            current_price,
            today: DayStatistics::from_points(&today_buckets),
            tomorrow: (!tomorrow_buckets.is_empty()).then(|| DayStatistics::from_points(&tomorrow_buckets)),
            best_window,
            cheapest_upcoming: upcoming,
            comparison,
            scheduled_load: scheduled_load_savings(
                &today_buckets,
                self.settings.scheduled_load_hours,
                self.settings.scheduled_load_kw,
            ),
            sauna: peak_trough_cost(&today_buckets, self.settings.sauna_power_kw),
            chart: day_chart(&today_buckets, self.settings.chart_basis),
        };

        info!(
            region = %self.region,
            local_date = %today,
            today_points = snapshot.today.count,
            has_tomorrow = snapshot.tomorrow.is_some(),
            has_current_price = snapshot.current_price.is_some(),
            "analytics snapshot computed"
        );

        Ok(snapshot)
    }

    /// CSV of one series over the inclusive local-date window `[first, last]`.
    ///
    /// Rows use the series' own granularity, so quarter-hour data exports as
    /// quarter-hour rows.
    pub async fn export_csv(
        &self,
        first: NaiveDate,
        last: NaiveDate,
        granularity: Granularity,
        separator: DecimalSeparator,
    ) -> Result<String> {
        let range = self.bucketer.days_range(first, last)?;
        let points = self.accessor.fetch(self.region, &range, granularity).await?;
        info!(region = %self.region, %first, %last, rows = points.len(), "exporting prices");
        write_csv(&self.bucketer.bucket(&points), separator)
    }

    /// Export the `days` local days ending today.
    pub async fn export_recent_csv(&self, now: DateTime<Utc>, days: u32, separator: DecimalSeparator) -> Result<String> {
        let last = self.bucketer.local_date(now);
        let first = last - Duration::days(i64::from(days.max(1)) - 1);
        self.export_csv(first, last, Granularity::Hourly, separator).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PriceArea, PricePoint};
    use crate::presentation::{parse_csv, CSV_HEADER};
    use crate::repo::InMemoryPriceStore;
    use chrono::TimeZone;

    const VAT: f64 = 0.255;

    fn settings() -> AnalyticsConfig {
        AnalyticsConfig::default()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Hourly points for every local hour of `day`, priced by `price(hour)`
    fn local_day(day: NaiveDate, price: impl Fn(u32) -> f64) -> Vec<PricePoint> {
        let bucketer = TimeZoneBucketer::helsinki();
        let range = bucketer.day_range(day).unwrap();
        let mut points = Vec::new();
        let mut instant = range.start;
        while instant < range.end {
            let hour = bucketer.local_hour(instant);
            points.push(PricePoint::hourly(PriceArea::FI, instant, price(hour), VAT));
            instant += Duration::hours(1);
        }
        points
    }

    fn scenario_price(hour: u32) -> f64 {
        match hour {
            14 => -2.0,
            18 => 45.0,
            h => 5.0 + f64::from(h % 4),
        }
    }

    fn engine_with(points: Vec<PricePoint>) -> AnalyticsEngine<InMemoryPriceStore> {
        AnalyticsEngine::new(InMemoryPriceStore::from_points(points), settings()).unwrap()
    }

    /// 2024-09-02 09:30 Helsinki (UTC+3)
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 2, 6, 30, 0).unwrap()
    }

    #[tokio::test]
    async fn test_snapshot_today() {
        let engine = engine_with(local_day(date(2024, 9, 2), scenario_price));
        let snapshot = engine.snapshot(now()).await.unwrap();

        assert_eq!(snapshot.local_date, date(2024, 9, 2));
        assert_eq!(snapshot.today.count, 24);
        assert_eq!(snapshot.today.min, Some(-2.0));
        assert_eq!(snapshot.today.max, Some(45.0));
        assert!(snapshot.tomorrow.is_none());

        let current = snapshot.current_price.unwrap();
        assert_eq!(current.instant_utc, Utc.with_ymd_and_hms(2024, 9, 2, 6, 0, 0).unwrap());

        let sauna = snapshot.sauna.unwrap();
        assert_eq!(sauna.cheapest.local_hour, 14);
        assert_eq!(sauna.most_expensive.local_hour, 18);

        let load = snapshot.scheduled_load.unwrap();
        assert_eq!(load.duration_hours, 3);
        assert!(load.savings_cents > 0.0);
        assert!(load.window.points.iter().any(|b| b.local_hour == 14));

        assert_eq!(snapshot.chart.len(), 24);
        assert_eq!(snapshot.chart.labels[0], "00:00");
        assert_eq!(snapshot.cheapest_upcoming.len(), 5);
        assert!(snapshot.cheapest_upcoming.iter().all(|b| b.local_hour > 9));
        assert_eq!(snapshot.cheapest_upcoming[0].local_hour, 14);
    }

    #[tokio::test]
    async fn test_snapshot_with_tomorrow_and_history() {
        let mut points = local_day(date(2024, 9, 2), |_| 12.0);
        points.extend(local_day(date(2024, 9, 3), |h| if h == 3 { 0.5 } else { 20.0 }));
        points.extend(local_day(date(2024, 9, 1), |_| 10.0));
        for day in 25..=31 {
            points.extend(local_day(date(2024, 8, day), |_| 8.0));
        }

        let engine = engine_with(points);
        let snapshot = engine.snapshot(now()).await.unwrap();

        let tomorrow = snapshot.tomorrow.unwrap();
        assert_eq!(tomorrow.count, 24);
        assert_eq!(tomorrow.min, Some(0.5));
        assert_eq!(snapshot.cheapest_upcoming[0].local_date, date(2024, 9, 3));
        assert_eq!(snapshot.cheapest_upcoming[0].local_hour, 3);

        let comparison = snapshot.comparison;
        assert_eq!(comparison.yesterday.average, Some(10.0));
        assert_eq!(comparison.weekly_days_available(), 7);
        assert_eq!(comparison.trailing_week.average, Some(8.0));
        let vs_yesterday = comparison.today_vs_yesterday.unwrap();
        assert!((vs_yesterday - 20.0).abs() < 1e-9);
        assert_eq!(comparison.today_vs_week, Some(50.0));
        assert!(!comparison.has_last_year_data);
        assert!(comparison.year_over_year.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_without_data() {
        let engine = engine_with(Vec::new());
        let snapshot = engine.snapshot(now()).await.unwrap();

        assert!(snapshot.today.is_empty());
        assert!(snapshot.current_price.is_none());
        assert!(snapshot.best_window.is_none());
        assert!(snapshot.scheduled_load.is_none());
        assert!(snapshot.sauna.is_none());
        assert!(snapshot.chart.is_empty());
        assert!(snapshot.cheapest_upcoming.is_empty());
        assert!(snapshot.comparison.today_vs_yesterday.is_none());
    }

    #[tokio::test]
    async fn test_day_statistics_on_dst_day() {
        let day = date(2024, 10, 27);
        let engine = engine_with(local_day(day, |_| 1.0));
        let stats = engine.day_statistics(day).await.unwrap();
        assert_eq!(stats.count, 25);
        assert_eq!(stats.average, Some(1.0));
    }

    #[tokio::test]
    async fn test_export_csv_window() {
        let mut points = local_day(date(2024, 9, 1), |_| 1.0);
        points.extend(local_day(date(2024, 9, 2), |_| 2.0));
        points.extend(local_day(date(2024, 9, 3), |_| 3.0));
        let engine = engine_with(points);

        let text = engine
            .export_csv(date(2024, 9, 1), date(2024, 9, 2), Granularity::Hourly, DecimalSeparator::Comma)
            .await
            .unwrap();
        assert!(text.starts_with(&CSV_HEADER.join(";")));

        let rows = parse_csv(&text, DecimalSeparator::Comma).unwrap();
        assert_eq!(rows.len(), 48);
        assert_eq!(rows[0].date, date(2024, 9, 1));
        assert_eq!(rows[0].hour, 0);
        assert_eq!(rows[47].date, date(2024, 9, 2));
        assert_eq!(rows[47].price_without_tax, 2.0);

        let recent = engine
            .export_recent_csv(now(), 1, DecimalSeparator::Point)
            .await
            .unwrap();
        assert_eq!(parse_csv(&recent, DecimalSeparator::Point).unwrap().len(), 24);
    }

    #[test]
    fn test_unknown_region_rejected() {
        let mut settings = settings();
        settings.region = "XX".into();
        assert!(AnalyticsEngine::new(InMemoryPriceStore::new(), settings).is_err());
    }
}
