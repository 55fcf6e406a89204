use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::AnalyticsError;

// ============================================================================
// Market Regions
// ============================================================================

/// Nord Pool bidding zone a price series is quoted for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum PriceArea {
    FI,
    EE,
    LV,
    LT,
    SE1,
    SE2,
    SE3,
    SE4,
    NO1,
    NO2,
    NO3,
    NO4,
    NO5,
    DK1,
    DK2,
}

impl PriceArea {
    /// Parse a region code, failing loudly on anything unknown.
    pub fn parse(code: &str) -> Result<Self, AnalyticsError> {
        code.trim()
            .parse()
            .map_err(|_| AnalyticsError::InvalidRegion(code.to_string()))
    }
}

impl Default for PriceArea {
    fn default() -> Self {
        Self::FI
    }
}

// ============================================================================
// Series Granularity
// ============================================================================

/// Market time unit of a price series. Hourly and quarter-hourly quotes are
/// stored as separate series.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Granularity {
    Hourly,
    QuarterHourly,
}

impl Granularity {
    /// Length of one delivery period
    pub fn duration(&self) -> Duration {
        match self {
            Self::Hourly => Duration::hours(1),
            Self::QuarterHourly => Duration::minutes(15),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, AnalyticsError> {
        raw.trim()
            .parse()
            .map_err(|_| AnalyticsError::InvalidGranularity(raw.to_string()))
    }
}

impl Default for Granularity {
    fn default() -> Self {
        Self::Hourly
    }
}

// ============================================================================
// Price Points
// ============================================================================

/// One quoted spot price for one region and one delivery period.
///
/// Prices are in cents per kWh and may be negative. The tax-inclusive price is
/// always derived from `price_without_tax` and `vat_rate`, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub region: PriceArea,
    pub instant_utc: DateTime<Utc>,
    pub granularity: Granularity,
    /// c/kWh, VAT excluded
    pub price_without_tax: f64,
    /// Fraction, e.g. 0.255
    pub vat_rate: f64,
}

impl PricePoint {
    pub fn new(
        region: PriceArea,
        instant_utc: DateTime<Utc>,
        granularity: Granularity,
        price_without_tax: f64,
        vat_rate: f64,
    ) -> Self {
        Self {
            region,
            instant_utc,
            granularity,
            price_without_tax,
            vat_rate,
        }
    }

    /// Shorthand for an hourly quote
    pub fn hourly(region: PriceArea, instant_utc: DateTime<Utc>, price_without_tax: f64, vat_rate: f64) -> Self {
        Self::new(region, instant_utc, Granularity::Hourly, price_without_tax, vat_rate)
    }

    pub fn price_with_tax(&self) -> f64 {
        self.price_without_tax * (1.0 + self.vat_rate)
    }

    /// VAT expressed in percent (0.255 -> 25.5)
    pub fn vat_percent(&self) -> f64 {
        self.vat_rate * 100.0
    }

    /// End of the delivery period (exclusive)
    pub fn time_end(&self) -> DateTime<Utc> {
        self.instant_utc + self.granularity.duration()
    }

    /// Check whether the delivery period contains `instant`
    pub fn covers(&self, instant: DateTime<Utc>) -> bool {
        self.instant_utc <= instant && instant < self.time_end()
    }
}

/// Anything carrying a tax-exclusive spot price. Lets the statistics work on
/// raw points and on local-time buckets alike.
pub trait Priced {
    fn price_without_tax(&self) -> f64;

    fn price_with_tax(&self) -> f64;
}

impl Priced for PricePoint {
    fn price_without_tax(&self) -> f64 {
        self.price_without_tax
    }

    fn price_with_tax(&self) -> f64 {
        PricePoint::price_with_tax(self)
    }
}

/// Which side of the VAT a presentation should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PriceBasis {
    #[default]
    ExclTax,
    InclTax,
}

impl PriceBasis {
    pub fn price_of<P: Priced>(&self, point: &P) -> f64 {
        match self {
            Self::ExclTax => point.price_without_tax(),
            Self::InclTax => point.price_with_tax(),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_price_area_parsing() {
        assert_eq!(PriceArea::from_str("FI").unwrap(), PriceArea::FI);
        assert_eq!(PriceArea::parse("se3").unwrap(), PriceArea::SE3);
        assert_eq!(PriceArea::parse(" dk1 ").unwrap(), PriceArea::DK1);
        assert_eq!(
            PriceArea::parse("XX"),
            Err(AnalyticsError::InvalidRegion("XX".to_string()))
        );
        assert_eq!(PriceArea::FI.to_string(), "FI");
    }

    #[test]
    fn test_granularity() {
        assert_eq!(Granularity::Hourly.duration(), Duration::hours(1));
        assert_eq!(Granularity::QuarterHourly.duration(), Duration::minutes(15));
        assert_eq!(Granularity::parse("quarter_hourly").unwrap(), Granularity::QuarterHourly);
        assert_eq!(Granularity::QuarterHourly.to_string(), "quarter_hourly");
        assert!(Granularity::parse("daily").is_err());
    }

    #[test]
    fn test_price_with_tax() {
        let point = PricePoint::hourly(PriceArea::FI, instant(), 10.0, 0.255);
        assert!((point.price_with_tax() - 12.55).abs() < 1e-12);
        assert!((point.vat_percent() - 25.5).abs() < 1e-12);
    }

    #[test]
    fn test_covers_delivery_period() {
        let point = PricePoint::new(PriceArea::FI, instant(), Granularity::QuarterHourly, 1.0, 0.24);
        assert!(point.covers(instant()));
        assert!(point.covers(instant() + Duration::minutes(14)));
        assert!(!point.covers(instant() + Duration::minutes(15)));
        assert!(!point.covers(instant() - Duration::seconds(1)));
    }

    #[test]
    fn test_price_basis() {
        let point = PricePoint::hourly(PriceArea::FI, instant(), 4.0, 0.24);
        assert_eq!(PriceBasis::ExclTax.price_of(&point), 4.0);
        assert_eq!(PriceBasis::InclTax.price_of(&point), 4.0 * 1.24);
    }

    proptest! {
        #[test]
        fn prop_tax_inclusive_price_is_derived(price in -500.0f64..500.0, vat in 0.0f64..0.5) {
            let point = PricePoint::hourly(PriceArea::FI, instant(), price, vat);
            prop_assert_eq!(point.price_with_tax(), price * (1.0 + vat));
            if price < 0.0 {
                prop_assert!(point.price_with_tax() <= 0.0);
            }
        }
    }
}
