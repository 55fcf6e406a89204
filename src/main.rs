use anyhow::Result;
use chrono::Utc;
use spot_price_analytics::{analytics, config, repo, telemetry};
use analytics::AnalyticsEngine;
use config::Config;
use repo::{load_price_file, InMemoryPriceStore};
use telemetry::init_tracing;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = Config::load()?;
    let bucketer = cfg.analytics.bucketer()?;
    let vat = cfg.vat_schedule();

    let points = load_price_file(&cfg.input.prices_path, &vat, &bucketer).await?;
    if points.is_empty() {
        warn!(path = %cfg.input.prices_path.display(), "price file contains no records");
    }

    let engine = AnalyticsEngine::new(InMemoryPriceStore::from_points(points), cfg.analytics.clone())?;

    // One instant for every figure in the report
    let now = Utc::now();
    info!(region = %engine.region(), %now, "building report");

    let snapshot = engine.snapshot(now).await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    if cfg.report.csv {
        let csv = engine
            .export_recent_csv(now, cfg.export.days, cfg.export.decimal_separator)
            .await?;
        println!("{csv}");
    }

    Ok(())
}
