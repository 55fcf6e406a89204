//! Same-day price statistics.
//!
//! Every function is pure over the points it is handed; callers restrict the
//! input to one local day. Empty input yields `None`, never an error.

use itertools::{Itertools, MinMaxResult};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::domain::Priced;

/// Aggregates over one local day's tax-exclusive prices
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayStatistics {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub average: Option<f64>,
    pub median: Option<f64>,
    /// Population variance
    pub variance: Option<f64>,
    pub std_deviation: Option<f64>,
    /// max - min
    pub range: Option<f64>,
    pub count: usize,
}

impl DayStatistics {
    pub fn from_points<P: Priced>(points: &[P]) -> Self {
        let (min, max) = match min_max(points) {
            Some((min, max)) => (Some(min), Some(max)),
            None => (None, None),
        };
        Self {
            min,
            max,
            average: average(points),
            median: median(points),
            variance: variance(points),
            std_deviation: std_deviation(points),
            range: price_range(points),
            count: points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

fn prices<P: Priced>(points: &[P]) -> impl Iterator<Item = f64> + '_ {
    points.iter().map(Priced::price_without_tax)
}

/// `(min, max)` of the tax-exclusive prices
pub fn min_max<P: Priced>(points: &[P]) -> Option<(f64, f64)> {
    match prices(points).minmax() {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(price) => Some((price, price)),
        MinMaxResult::MinMax(min, max) => Some((min, max)),
    }
}

/// Arithmetic mean
pub fn average<P: Priced>(points: &[P]) -> Option<f64> {
    mean(prices(points))
}

/// Middle value; the mean of the two central values for an even count
pub fn median<P: Priced>(points: &[P]) -> Option<f64> {
    let sorted: Vec<f64> = prices(points).sorted_by_key(|p| OrderedFloat(*p)).collect();
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let mid = n / 2;
    if n % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Population variance (divides by N)
pub fn variance<P: Priced>(points: &[P]) -> Option<f64> {
    let mean = average(points)?;
    let squared = prices(points).map(|p| (p - mean).powi(2)).sum::<f64>();
    Some(squared / points.len() as f64)
}

pub fn std_deviation<P: Priced>(points: &[P]) -> Option<f64> {
    variance(points).map(f64::sqrt)
}

pub fn price_range<P: Priced>(points: &[P]) -> Option<f64> {
    min_max(points).map(|(min, max)| max - min)
}

/// Cheapest point; the earliest one wins a tie
pub fn cheapest<P: Priced>(points: &[P]) -> Option<&P> {
    points.iter().min_by_key(|p| OrderedFloat(p.price_without_tax()))
}

/// Most expensive point; the earliest one wins a tie
pub fn most_expensive<P: Priced>(points: &[P]) -> Option<&P> {
    points
        .iter()
        .rev()
        .max_by_key(|p| OrderedFloat(p.price_without_tax()))
}

/// Mean of any sequence of values, `None` when empty
pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}
