//! Cheapest-time search over a day's hourly prices.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::statistics::mean;
use crate::calendar::LocalHourBucket;
use crate::domain::Granularity;

/// Relative difference below which two window averages count as equal
const TIE_TOLERANCE: f64 = 1e-9;

/// A run of consecutive local hours inside one local day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsecutiveWindow {
    pub local_date: NaiveDate,
    /// Local hour of the first point
    pub start_hour: u32,
    /// Local hour of the last point (inclusive)
    pub end_hour: u32,
    pub average_price: f64,
    pub points: Vec<LocalHourBucket>,
}

impl ConsecutiveWindow {
    pub fn hours(&self) -> usize {
        self.points.len()
    }

    pub fn start_utc(&self) -> Option<DateTime<Utc>> {
        self.points.first().map(LocalHourBucket::instant_utc)
    }

    /// Exclusive end of the last hour
    pub fn end_utc(&self) -> Option<DateTime<Utc>> {
        self.points.last().map(|b| b.point.time_end())
    }
}

/// Whether the buckets form an unbroken hourly run on one local day.
///
/// Adjacency is judged on the UTC instants, so the run stays valid across the
/// DST gap (02 -> 04) and through the repeated autumn hour.
fn is_consecutive(run: &[LocalHourBucket]) -> bool {
    let Some(first) = run.first() else {
        return false;
    };
    run.iter()
        .all(|b| b.local_date == first.local_date && b.point.granularity == Granularity::Hourly)
        && run
            .windows(2)
            .all(|pair| pair[1].instant_utc() - pair[0].instant_utc() == Duration::hours(1))
}

/// Cheapest run of `hours` consecutive hourly points within one local day.
///
/// Missing hours break a run; ties go to the earliest start. Returns `None`
/// when no complete run exists.
pub fn best_consecutive_window(day: &[LocalHourBucket], hours: usize) -> Option<ConsecutiveWindow> {
    if hours == 0 || day.len() < hours {
        return None;
    }

    let mut sorted = day.to_vec();
    sorted.sort_by_key(LocalHourBucket::instant_utc);

    let mut best: Option<(usize, f64)> = None;
    for start in 0..=sorted.len() - hours {
        let run = &sorted[start..start + hours];
        if !is_consecutive(run) {
            continue;
        }
        let Some(average) = mean(run.iter().map(|b| b.point.price_without_tax)) else {
            continue;
        };
        // Float noise must not let a later run beat an equal earlier one
        let cheaper = |best_average: f64| average < best_average - TIE_TOLERANCE * best_average.abs().max(1.0);
        if best.map_or(true, |(_, best_average)| cheaper(best_average)) {
            best = Some((start, average));
        }
    }

    let (start, average_price) = best?;
    let points = sorted[start..start + hours].to_vec();
    let first = points.first()?;
    let last = points.last()?;
    trace!(start_hour = first.local_hour, hours, average_price, "best window found");

    Some(ConsecutiveWindow {
        local_date: first.local_date,
        start_hour: first.local_hour,
        end_hour: last.local_hour,
        average_price,
        points,
    })
}

/// The `count` cheapest hours starting after `now`, so the hour in progress
/// is excluded.
///
/// Compared on UTC instants: on the autumn fall-back day the second 03:00 is
/// still upcoming while the first one runs. This is a ranking, not a window:
/// the returned hours need not be adjacent. Ordered by price, earliest first
/// among equal prices.
pub fn cheapest_upcoming(series: &[LocalHourBucket], now: DateTime<Utc>, count: usize) -> Vec<LocalHourBucket> {
    let mut upcoming: Vec<LocalHourBucket> = series
        .iter()
        .filter(|b| b.instant_utc() > now)
        .cloned()
        .collect();
    upcoming.sort_by_key(|b| (OrderedFloat(b.point.price_without_tax), b.instant_utc()));
    upcoming.truncate(count);
    upcoming
}
