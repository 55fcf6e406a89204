//! Price records read from a JSON file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::calendar::TimeZoneBucketer;
use crate::domain::{Granularity, PriceArea, PricePoint, VatSchedule};

/// One quote as it appears in the input file. The VAT rate is optional; when
/// absent it is looked up from the schedule for the quote's local date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPriceRecord {
    pub region: String,
    /// RFC 3339, or a naive timestamp taken as UTC
    pub instant: String,
    #[serde(default)]
    pub granularity: Option<String>,
    /// c/kWh, VAT excluded
    pub price: f64,
    #[serde(default)]
    pub vat_rate: Option<f64>,
}

impl RawPriceRecord {
    pub fn into_point(self, vat: &VatSchedule, bucketer: &TimeZoneBucketer) -> Result<PricePoint> {
        let region = PriceArea::parse(&self.region)?;
        let instant = TimeZoneBucketer::parse_instant(&self.instant)?;
        let granularity = match self.granularity.as_deref() {
            Some(raw) => Granularity::parse(raw)?,
            None => Granularity::Hourly,
        };
        Ok(match self.vat_rate {
            Some(rate) => PricePoint::new(region, instant, granularity, self.price, rate),
            None => vat.stamp(region, instant, granularity, self.price, bucketer.local_date(instant)),
        })
    }
}

pub fn parse_price_json(text: &str, vat: &VatSchedule, bucketer: &TimeZoneBucketer) -> Result<Vec<PricePoint>> {
    let records: Vec<RawPriceRecord> = serde_json::from_str(text).context("Price file is not a JSON array of records")?;
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            record
                .into_point(vat, bucketer)
                .with_context(|| format!("Invalid price record #{index}"))
        })
        .collect()
}

pub async fn load_price_file(path: &Path, vat: &VatSchedule, bucketer: &TimeZoneBucketer) -> Result<Vec<PricePoint>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let points = parse_price_json(&text, vat, bucketer)?;
    info!(path = %path.display(), points = points.len(), "loaded price file");
    Ok(points)
}
