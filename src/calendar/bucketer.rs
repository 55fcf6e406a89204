//! Local civil time projection.
//!
//! Prices are stored against UTC instants but every statistic is computed per
//! local calendar day. The UTC offset is re-derived for each instant from the
//! zone database, so DST days come out 23 or 25 hours long.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::{Range, RangeInclusive};

use crate::domain::{AnalyticsError, Granularity, PriceArea, PricePoint, Priced};

pub const DEFAULT_ZONE: &str = "Europe/Helsinki";

/// Formats accepted for zone-less timestamps, read as UTC
const NAIVE_INSTANT_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Local calendar position of an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LocalSlot {
    pub date: NaiveDate,
    pub hour: u32,
    pub minute: u32,
}

/// A price point annotated with its local-civil-time projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalHourBucket {
    pub point: PricePoint,
    pub local_date: NaiveDate,
    /// 0-23
    pub local_hour: u32,
    /// 0 for hourly points, 0/15/30/45 for quarter-hour points
    pub local_minute: u32,
}

impl LocalHourBucket {
    pub fn instant_utc(&self) -> DateTime<Utc> {
        self.point.instant_utc
    }

    /// `HH:MM` label of the local start time
    pub fn label(&self) -> String {
        format!("{:02}:{:02}", self.local_hour, self.local_minute)
    }
}

impl Priced for LocalHourBucket {
    fn price_without_tax(&self) -> f64 {
        self.point.price_without_tax
    }

    fn price_with_tax(&self) -> f64 {
        self.point.price_with_tax()
    }
}

/// Projects UTC instants into a named civil zone and back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeZoneBucketer {
    zone: Tz,
}

impl TimeZoneBucketer {
    /// Create a bucketer for an IANA zone identifier
    pub fn new(zone: &str) -> Result<Self, AnalyticsError> {
        zone.parse::<Tz>()
            .map(|zone| Self { zone })
            .map_err(|_| AnalyticsError::InvalidZone(zone.to_string()))
    }

    pub fn helsinki() -> Self {
        Self {
            zone: chrono_tz::Europe::Helsinki,
        }
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// Parse an RFC 3339 timestamp, or a zone-less `YYYY-MM-DD HH:MM:SS` read as UTC.
    pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>, AnalyticsError> {
        let trimmed = raw.trim();
        if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(instant.with_timezone(&Utc));
        }

        NAIVE_INSTANT_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
            .map(|naive| naive.and_utc())
            .ok_or_else(|| AnalyticsError::InvalidInstant(raw.to_string()))
    }

    pub fn project(&self, instant: DateTime<Utc>) -> LocalSlot {
        let local = instant.with_timezone(&self.zone);
        LocalSlot {
            date: local.date_naive(),
            hour: local.hour(),
            minute: local.minute(),
        }
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.zone).date_naive()
    }

    pub fn local_hour(&self, instant: DateTime<Utc>) -> u32 {
        instant.with_timezone(&self.zone).hour()
    }

    /// First instant of a local calendar day.
    ///
    /// Some zones skip midnight on their DST day; the day then starts at the
    /// first local time that exists.
    pub fn local_midnight(&self, date: NaiveDate) -> Result<DateTime<Utc>, AnalyticsError> {
        let midnight = date.and_time(NaiveTime::MIN);
        (0..=4)
            .map(|half_hours| midnight + Duration::minutes(30 * half_hours))
            .find_map(|candidate| self.zone.from_local_datetime(&candidate).earliest())
            .map(|start| start.with_timezone(&Utc))
            .ok_or_else(|| AnalyticsError::InvalidDate(date.to_string()))
    }

    /// `[start, end)` in UTC covering one full local day
    pub fn day_range(&self, date: NaiveDate) -> Result<Range<DateTime<Utc>>, AnalyticsError> {
        self.days_range(date, date)
    }

    /// `[start, end)` in UTC covering the local days `first..=last`
    pub fn days_range(&self, first: NaiveDate, last: NaiveDate) -> Result<Range<DateTime<Utc>>, AnalyticsError> {
        let after_last = last
            .succ_opt()
            .ok_or_else(|| AnalyticsError::InvalidDate(last.to_string()))?;
        Ok(self.local_midnight(first)?..self.local_midnight(after_last)?)
    }

    /// `[start, end)` in UTC covering one full local calendar month
    pub fn month_range(&self, year: i32, month: u32) -> Result<Range<DateTime<Utc>>, AnalyticsError> {
        let days = month_days(year, month)?;
        self.days_range(*days.start(), *days.end())
    }

    pub fn bucket_point(&self, point: &PricePoint) -> LocalHourBucket {
        let slot = self.project(point.instant_utc);
        LocalHourBucket {
            point: point.clone(),
            local_date: slot.date,
            local_hour: slot.hour,
            local_minute: slot.minute,
        }
    }

    pub fn bucket(&self, points: &[PricePoint]) -> Vec<LocalHourBucket> {
        points.iter().map(|p| self.bucket_point(p)).collect()
    }

    /// Group points by local calendar day, preserving order inside each day
    pub fn group_by_day(&self, points: &[PricePoint]) -> BTreeMap<NaiveDate, Vec<LocalHourBucket>> {
        group_buckets_by_day(self.bucket(points))
    }

    /// Average quarter-hour points into the local hour they start in.
    ///
    /// Hourly points pass through unchanged. The VAT rate of the first quarter
    /// is kept for the hour. Output is ordered by instant.
    pub fn aggregate_hourly(&self, points: &[PricePoint]) -> Vec<PricePoint> {
        let mut hours: BTreeMap<(DateTime<Utc>, PriceArea), Vec<&PricePoint>> = BTreeMap::new();
        for point in points {
            let local = point.instant_utc.with_timezone(&self.zone);
            let hour_start = point.instant_utc
                - Duration::minutes(i64::from(local.minute()))
                - Duration::seconds(i64::from(local.second()));
            hours.entry((hour_start, point.region)).or_default().push(point);
        }

        hours
            .into_iter()
            .filter_map(|((hour_start, region), quarters)| {
                let first = quarters.first()?;
                let average =
                    quarters.iter().map(|p| p.price_without_tax).sum::<f64>() / quarters.len() as f64;
                Some(PricePoint::new(
                    region,
                    hour_start,
                    Granularity::Hourly,
                    average,
                    first.vat_rate,
                ))
            })
            .collect()
    }
}

impl Default for TimeZoneBucketer {
    fn default() -> Self {
        Self::helsinki()
    }
}

/// Group already-projected buckets by local day
pub fn group_buckets_by_day(
    buckets: impl IntoIterator<Item = LocalHourBucket>,
) -> BTreeMap<NaiveDate, Vec<LocalHourBucket>> {
    let mut days: BTreeMap<NaiveDate, Vec<LocalHourBucket>> = BTreeMap::new();
    for bucket in buckets {
        days.entry(bucket.local_date).or_default().push(bucket);
    }
    days
}

/// Buckets falling on one local date
pub fn on_date(buckets: &[LocalHourBucket], date: NaiveDate) -> Vec<LocalHourBucket> {
    buckets.iter().filter(|b| b.local_date == date).cloned().collect()
}

pub fn first_of_month(year: i32, month: u32) -> Result<NaiveDate, AnalyticsError> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| AnalyticsError::InvalidDate(format!("{year}-{month:02}")))
}

pub fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

pub fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month <= 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

/// Local dates of one calendar month, first to last
pub fn month_days(year: i32, month: u32) -> Result<RangeInclusive<NaiveDate>, AnalyticsError> {
    let first = first_of_month(year, month)?;
    let (next_year, next_month) = next_month(year, month);
    let last = first_of_month(next_year, next_month)?
        .pred_opt()
        .ok_or_else(|| AnalyticsError::InvalidDate(format!("{year}-{month:02}")))?;
    Ok(first..=last)
}
