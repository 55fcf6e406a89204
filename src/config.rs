use anyhow::{Context, Result};
use figment::{providers::{Env, Format, Serialized, Toml}, Figment};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

use crate::calendar::{TimeZoneBucketer, DEFAULT_ZONE};
use crate::domain::{PriceArea, PriceBasis, VatSchedule};
use crate::presentation::DecimalSeparator;

pub const CONFIG_FILE: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "SPOT__";

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct Config {
    #[serde(default)]
    #[validate(nested)]
    pub analytics: AnalyticsConfig,
    /// Overrides the built-in Finnish VAT schedule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vat: Option<VatSchedule>,
    #[serde(default)]
    #[validate(nested)]
    pub export: ExportConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AnalyticsConfig {
    #[validate(length(min = 2, max = 3))]
    pub region: String,
    #[validate(length(min = 1))]
    pub timezone: String,
    /// Duration of the scheduled load (EV charging, washing, ...) in hours
    #[validate(range(min = 1, max = 24))]
    pub scheduled_load_hours: usize,
    #[validate(range(min = 0.0, max = 1000.0))]
    pub scheduled_load_kw: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub sauna_power_kw: f64,
    #[validate(range(min = 1, max = 96))]
    pub cheapest_hours_count: usize,
    pub chart_basis: PriceBasis,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            region: PriceArea::FI.to_string(),
            timezone: DEFAULT_ZONE.to_string(),
            scheduled_load_hours: 3,
            scheduled_load_kw: 11.0,
            sauna_power_kw: 8.0,
            cheapest_hours_count: 5,
            chart_basis: PriceBasis::ExclTax,
        }
    }
}

impl AnalyticsConfig {
    pub fn area(&self) -> Result<PriceArea> {
        Ok(PriceArea::parse(&self.region)?)
    }

    pub fn bucketer(&self) -> Result<TimeZoneBucketer> {
        Ok(TimeZoneBucketer::new(&self.timezone)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ExportConfig {
    pub decimal_separator: DecimalSeparator,
    /// Local days covered by the report's CSV, ending today
    #[validate(range(min = 1, max = 366))]
    pub days: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { decimal_separator: DecimalSeparator::Comma, days: 7 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub prices_path: PathBuf,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { prices_path: PathBuf::from("data/prices.json") }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub csv: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().context("Failed to read configuration")?;
        config.check()?;
        Ok(config)
    }

    /// Range checks plus region and time zone resolution
    pub fn check(&self) -> Result<()> {
        self.validate().context("Invalid configuration")?;
        self.analytics.area()?;
        self.analytics.bucketer()?;
        Ok(())
    }

    pub fn vat_schedule(&self) -> VatSchedule {
        self.vat.clone().unwrap_or_default()
    }
}
