//! Date-ranged VAT rates.
//!
//! Electricity VAT has changed several times (the temporary 10 % rate of the
//! 2022-2023 winter, the 25.5 % general rate from September 2024), so a rate
//! is always looked up for the local date a price applies to.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Granularity, PriceArea, PricePoint};

/// A VAT rate in effect from `from` (inclusive) until the next period starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VatPeriod {
    pub from: NaiveDate,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<VatPeriod>", into = "Vec<VatPeriod>")]
pub struct VatSchedule {
    periods: Vec<VatPeriod>,
}

impl VatSchedule {
    /// Build a schedule; periods are sorted by start date.
    pub fn new(mut periods: Vec<VatPeriod>) -> Self {
        periods.sort_by_key(|p| p.from);
        Self { periods }
    }

    /// Finnish VAT on electricity since 2010.
    pub fn finland() -> Self {
        let period = |y, m, d, rate| VatPeriod {
            from: NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN),
            rate,
        };
        Self::new(vec![
            period(2010, 7, 1, 0.23),
            period(2013, 1, 1, 0.24),
            period(2022, 12, 1, 0.10),
            period(2023, 5, 1, 0.24),
            period(2024, 9, 1, 0.255),
        ])
    }

    pub fn periods(&self) -> &[VatPeriod] {
        &self.periods
    }

    /// Rate in effect on a local calendar date. Dates before the first period
    /// fall back to the first period's rate; an empty schedule means no VAT.
    pub fn rate_on(&self, date: NaiveDate) -> f64 {
        self.periods
            .iter()
            .rev()
            .find(|p| p.from <= date)
            .or_else(|| self.periods.first())
            .map(|p| p.rate)
            .unwrap_or(0.0)
    }

    /// Stamp a raw tax-exclusive quote with the rate in effect on its local date.
    pub fn stamp(
        &self,
        region: PriceArea,
        instant_utc: DateTime<Utc>,
        granularity: Granularity,
        price_without_tax: f64,
        local_date: NaiveDate,
    ) -> PricePoint {
        PricePoint::new(
            region,
            instant_utc,
            granularity,
            price_without_tax,
            self.rate_on(local_date),
        )
    }
}

impl From<Vec<VatPeriod>> for VatSchedule {
    fn from(periods: Vec<VatPeriod>) -> Self {
        Self::new(periods)
    }
}

impl From<VatSchedule> for Vec<VatPeriod> {
    fn from(schedule: VatSchedule) -> Self {
        schedule.periods
    }
}

impl Default for VatSchedule {
    fn default() -> Self {
        Self::finland()
    }
}
