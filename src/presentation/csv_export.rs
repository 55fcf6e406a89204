//! Semicolon-separated price export.
//!
//! The decimal separator is a locale choice made here only; the analytic
//! values themselves are plain `f64`.

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};

use crate::calendar::LocalHourBucket;

pub const CSV_HEADER: [&str; 5] = ["Date", "Hour", "PriceExclTax", "PriceInclTax", "VATPercent"];

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecimalSeparator {
    /// `12,55` as written in Finland
    #[default]
    Comma,
    Point,
}

impl DecimalSeparator {
    pub fn format(&self, value: f64) -> String {
        let plain = value.to_string();
        match self {
            Self::Comma => plain.replace('.', ","),
            Self::Point => plain,
        }
    }

    pub fn parse(&self, raw: &str) -> Result<f64> {
        let normalized = match self {
            Self::Comma => raw.trim().replace(',', "."),
            Self::Point => raw.trim().to_string(),
        };
        normalized
            .parse()
            .with_context(|| format!("Invalid decimal value: {raw}"))
    }
}

/// One exported price row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvRow {
    pub date: NaiveDate,
    pub hour: u32,
    pub minute: u32,
    pub price_without_tax: f64,
    pub price_with_tax: f64,
    pub vat_rate: f64,
}

impl From<&LocalHourBucket> for CsvRow {
    fn from(bucket: &LocalHourBucket) -> Self {
        Self {
            date: bucket.local_date,
            hour: bucket.local_hour,
            minute: bucket.local_minute,
            price_without_tax: bucket.point.price_without_tax,
            price_with_tax: bucket.point.price_with_tax(),
            vat_rate: bucket.point.vat_rate,
        }
    }
}

/// VAT percent rounded so that `percent / 100` reproduces the stored rate
fn vat_percent(rate: f64) -> f64 {
    (rate * 100.0 * 10_000.0).round() / 10_000.0
}

/// Serialize buckets (any number of days) into CSV text, oldest first
pub fn write_csv(buckets: &[LocalHourBucket], separator: DecimalSeparator) -> Result<String> {
    let mut sorted: Vec<&LocalHourBucket> = buckets.iter().collect();
    sorted.sort_by_key(|b| b.instant_utc());

    let mut writer = WriterBuilder::new().delimiter(b';').from_writer(Vec::new());
    writer.write_record(CSV_HEADER).context("Failed to write CSV header")?;

    for bucket in sorted {
        let row = CsvRow::from(bucket);
        writer
            .write_record([
                row.date.format(DATE_FORMAT).to_string(),
                format!("{:02}:{:02}", row.hour, row.minute),
                separator.format(row.price_without_tax),
                separator.format(row.price_with_tax),
                separator.format(vat_percent(row.vat_rate)),
            ])
            .context("Failed to write CSV row")?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow!("Failed to flush CSV writer: {}", err.error()))?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

/// Parse text produced by [`write_csv`]
pub fn parse_csv(text: &str, separator: DecimalSeparator) -> Result<Vec<CsvRow>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers().context("Failed to read CSV header")?;
    if headers.iter().ne(CSV_HEADER.iter().copied()) {
        bail!("Unexpected CSV header: {:?}", headers);
    }

    reader
        .records()
        .enumerate()
        .map(|(index, record)| -> Result<CsvRow> {
            let record = record.with_context(|| format!("Failed to read CSV row {}", index + 1))?;
            let field = |i: usize| {
                record
                    .get(i)
                    .ok_or_else(|| anyhow!("CSV row {} has no column {}", index + 1, CSV_HEADER[i]))
            };

            let date = NaiveDate::parse_from_str(field(0)?, DATE_FORMAT)
                .with_context(|| format!("Invalid date in CSV row {}", index + 1))?;
            let (hour, minute) = parse_clock(field(1)?)?;

            Ok(CsvRow {
                date,
                hour,
                minute,
                price_without_tax: separator.parse(field(2)?)?,
                price_with_tax: separator.parse(field(3)?)?,
                vat_rate: separator.parse(field(4)?)? / 100.0,
            })
        })
        .collect()
}

fn parse_clock(raw: &str) -> Result<(u32, u32)> {
    let (hour, minute) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("Invalid hour: {raw}"))?;
    let hour: u32 = hour.parse().with_context(|| format!("Invalid hour: {raw}"))?;
    let minute: u32 = minute.parse().with_context(|| format!("Invalid hour: {raw}"))?;
    if hour > 23 || minute > 59 {
        bail!("Invalid hour: {raw}");
    }
    Ok((hour, minute))
}
