//! Multi-horizon price history: yesterday, trailing week, month-over-month
//! and year-over-year.
//!
//! Every horizon is resolved against one captured `now` in the configured
//! zone. Gaps in history shrink the day counts and turn averages into `None`;
//! they never abort the comparison.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::{Range, RangeInclusive};
use tracing::debug;

use super::statistics::mean;
use crate::calendar::{first_of_month, month_days, previous_month, LocalHourBucket, TimeZoneBucketer};
use crate::domain::AnalyticsError;

/// Days in the trailing comparison week
pub const TRAILING_WEEK_DAYS: i64 = 7;

/// Average over a horizon plus how many local days contributed to it
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodAverage {
    pub average: Option<f64>,
    pub days_available: usize,
}

impl PeriodAverage {
    pub fn has_data(&self) -> bool {
        self.days_available > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalComparison {
    pub today: PeriodAverage,
    pub yesterday: PeriodAverage,
    /// Mean of daily averages over the 7 days before yesterday
    pub trailing_week: PeriodAverage,
    pub month_to_date: PeriodAverage,
    pub previous_month: PeriodAverage,
    pub same_month_last_year: PeriodAverage,
    pub has_last_year_data: bool,
    pub today_vs_yesterday: Option<f64>,
    pub today_vs_week: Option<f64>,
    pub month_over_month: Option<f64>,
    pub year_over_year: Option<f64>,
}

impl HistoricalComparison {
    pub fn weekly_days_available(&self) -> usize {
        self.trailing_week.days_available
    }
}

/// `(current - baseline) / baseline * 100`, absent without a usable baseline
pub fn percentage_change(current: Option<f64>, baseline: Option<f64>) -> Option<f64> {
    let (current, baseline) = (current?, baseline?);
    if baseline == 0.0 || !baseline.is_finite() || !current.is_finite() {
        return None;
    }
    Some((current - baseline) / baseline * 100.0)
}

/// Local calendar horizons as of one instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryHorizons {
    pub today: NaiveDate,
    pub yesterday: NaiveDate,
    pub trailing_week: RangeInclusive<NaiveDate>,
    pub month_to_date: RangeInclusive<NaiveDate>,
    pub previous_month: RangeInclusive<NaiveDate>,
    pub same_month_last_year: RangeInclusive<NaiveDate>,
}

impl HistoryHorizons {
    pub fn as_of(bucketer: &TimeZoneBucketer, now: DateTime<Utc>) -> Result<Self, AnalyticsError> {
        let today = bucketer.local_date(now);
        let yesterday = today - Duration::days(1);
        let trailing_week = (yesterday - Duration::days(TRAILING_WEEK_DAYS))..=(yesterday - Duration::days(1));

        let month_first = first_of_month(today.year(), today.month())?;
        let (prev_year, prev_month) = previous_month(today.year(), today.month());

        Ok(Self {
            today,
            yesterday,
            trailing_week,
            month_to_date: month_first..=today,
            previous_month: month_days(prev_year, prev_month)?,
            same_month_last_year: month_days(today.year() - 1, today.month())?,
        })
    }

    /// UTC span holding every horizon, from the year-ago month to the end of today
    pub fn fetch_range(&self, bucketer: &TimeZoneBucketer) -> Result<Range<DateTime<Utc>>, AnalyticsError> {
        bucketer.days_range(*self.same_month_last_year.start(), self.today)
    }
}

/// Flat mean over the buckets, counting distinct local days
fn flat_average<'a>(buckets: impl IntoIterator<Item = &'a LocalHourBucket>) -> PeriodAverage {
    let buckets: Vec<&LocalHourBucket> = buckets.into_iter().collect();
    PeriodAverage {
        average: mean(buckets.iter().map(|b| b.point.price_without_tax)),
        days_available: buckets.iter().map(|b| b.local_date).unique().count(),
    }
}

/// Computes a [`HistoricalComparison`] from already-fetched history.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoricalComparator {
    bucketer: TimeZoneBucketer,
}

impl HistoricalComparator {
    pub fn new(bucketer: TimeZoneBucketer) -> Self {
        Self { bucketer }
    }

    pub fn horizons(&self, now: DateTime<Utc>) -> Result<HistoryHorizons, AnalyticsError> {
        HistoryHorizons::as_of(&self.bucketer, now)
    }

    /// Compare today and this month with their baselines.
    ///
    /// `history` may span any range; only buckets inside a horizon count.
    pub fn compare(&self, history: &[LocalHourBucket], now: DateTime<Utc>) -> Result<HistoricalComparison, AnalyticsError> {
        let horizons = self.horizons(now)?;
        let on_day = |date: NaiveDate| history.iter().filter(move |b| b.local_date == date);
        let within = |days: &RangeInclusive<NaiveDate>| {
            let days = days.clone();
            history.iter().filter(move |b| days.contains(&b.local_date))
        };

        let today = flat_average(on_day(horizons.today));
        let yesterday = flat_average(on_day(horizons.yesterday));
        let trailing_week = daily_average_of_days(within(&horizons.trailing_week));
        let month_to_date = flat_average(within(&horizons.month_to_date).filter(|b| b.instant_utc() <= now));
        let previous_month = flat_average(within(&horizons.previous_month));
        let same_month_last_year = flat_average(within(&horizons.same_month_last_year));

        debug!(
            today = %horizons.today,
            weekly_days_available = trailing_week.days_available,
            month_days = month_to_date.days_available,
            last_year_days = same_month_last_year.days_available,
            "historical comparison computed"
        );

        Ok(HistoricalComparison {
            today_vs_yesterday: percentage_change(today.average, yesterday.average),
            today_vs_week: percentage_change(today.average, trailing_week.average),
            month_over_month: percentage_change(month_to_date.average, previous_month.average),
            year_over_year: percentage_change(month_to_date.average, same_month_last_year.average),
            has_last_year_data: same_month_last_year.has_data(),
            today,
            yesterday,
            trailing_week,
            month_to_date,
            previous_month,
            same_month_last_year,
        })
    }
}

/// Average of per-day averages, so a day with missing hours weighs the same
/// as a complete one
fn daily_average_of_days<'a>(buckets: impl IntoIterator<Item = &'a LocalHourBucket>) -> PeriodAverage {
    let mut days: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for bucket in buckets {
        days.entry(bucket.local_date).or_default().push(bucket.point.price_without_tax);
    }
    let daily: Vec<f64> = days.into_values().filter_map(|prices| mean(prices)).collect();
    PeriodAverage {
        days_available: daily.len(),
        average: mean(daily),
    }
}
