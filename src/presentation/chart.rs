use serde::{Deserialize, Serialize};

use crate::calendar::LocalHourBucket;
use crate::domain::PriceBasis;

/// Normalized prices below this are cheap
pub const CHEAP_THRESHOLD: f64 = 1.0 / 3.0;
/// Normalized prices above this are expensive
pub const EXPENSIVE_THRESHOLD: f64 = 2.0 / 3.0;

/// Relative price level within one day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceTier {
    Cheap,
    Moderate,
    Expensive,
}

impl PriceTier {
    pub fn classify(normalized: f64) -> Self {
        if normalized < CHEAP_THRESHOLD {
            Self::Cheap
        } else if normalized > EXPENSIVE_THRESHOLD {
            Self::Expensive
        } else {
            Self::Moderate
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::Cheap => "#22c55e",
            Self::Moderate => "#eab308",
            Self::Expensive => "#ef4444",
        }
    }
}

impl std::fmt::Display for PriceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Cheap => "cheap",
            Self::Moderate => "moderate",
            Self::Expensive => "expensive",
        };
        write!(f, "{s}")
    }
}

/// Scale `price` into [0, 1] against the day's range. A flat day maps to the
/// midpoint; a spread within rounding error of the prices counts as flat.
pub fn normalize(price: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    let scale = min.abs().max(max.abs()).max(1.0);
    if span.abs() <= 4.0 * f64::EPSILON * scale {
        return 0.5;
    }
    ((price - min) / span).clamp(0.0, 1.0)
}

/// Parallel label/value/color series for one day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceChart {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub colors: Vec<String>,
    pub tiers: Vec<PriceTier>,
}

impl PriceChart {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Chart series for a day's buckets, ordered by instant
pub fn day_chart(day: &[LocalHourBucket], basis: PriceBasis) -> PriceChart {
    let mut sorted: Vec<&LocalHourBucket> = day.iter().collect();
    sorted.sort_by_key(|b| b.instant_utc());

    let values: Vec<f64> = sorted.iter().map(|b| basis.price_of(*b)).collect();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let tiers: Vec<PriceTier> = values
        .iter()
        .map(|v| PriceTier::classify(normalize(*v, min, max)))
        .collect();

    PriceChart {
        labels: sorted.iter().map(|b| b.label()).collect(),
        colors: tiers.iter().map(|t| t.color().to_string()).collect(),
        values,
        tiers,
    }
}
