//! Money saved by moving consumption to cheap hours.
//!
//! Prices are c/kWh, loads are kW and durations are whole hours, so every cost
//! below is in cents. Too little data gives `None`, never a zero estimate.

use serde::{Deserialize, Serialize};

use super::statistics::{average, cheapest, most_expensive};
use super::window::{best_consecutive_window, ConsecutiveWindow};
use crate::calendar::LocalHourBucket;

pub const CENTS_PER_EURO: f64 = 100.0;

/// Points a day needs before peak and trough can be told apart
pub const MIN_PEAK_TROUGH_POINTS: usize = 2;

/// Running a fixed load in the cheapest window instead of at the day's average price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledLoadSavings {
    pub window: ConsecutiveWindow,
    pub duration_hours: usize,
    pub load_kw: f64,
    pub overall_average: f64,
    pub window_cost_cents: f64,
    pub average_cost_cents: f64,
    pub savings_cents: f64,
    /// Relative to the day's average price; absent when that average is zero
    pub savings_percent: Option<f64>,
}

impl ScheduledLoadSavings {
    pub fn savings_euros(&self) -> f64 {
        self.savings_cents / CENTS_PER_EURO
    }
}

/// Estimate savings for a load of `load_kw` running `duration_hours` (e.g. EV charging).
pub fn scheduled_load_savings(day: &[LocalHourBucket], duration_hours: usize, load_kw: f64) -> Option<ScheduledLoadSavings> {
    let window = best_consecutive_window(day, duration_hours)?;
    let overall_average = average(day)?;

    let energy_kwh = duration_hours as f64 * load_kw;
    let savings_percent = (overall_average != 0.0)
        .then(|| (overall_average - window.average_price) / overall_average * 100.0);

    Some(ScheduledLoadSavings {
        duration_hours,
        load_kw,
        overall_average,
        window_cost_cents: window.average_price * energy_kwh,
        average_cost_cents: overall_average * energy_kwh,
        savings_cents: (overall_average - window.average_price) * energy_kwh,
        savings_percent,
        window,
    })
}

/// One hour of a fixed draw at the day's cheapest vs. its most expensive hour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakTroughCost {
    pub cheapest: LocalHourBucket,
    pub most_expensive: LocalHourBucket,
    pub power_kw: f64,
    pub cheapest_cost_cents: f64,
    pub most_expensive_cost_cents: f64,
    pub difference_cents: f64,
    pub difference_euros: f64,
}

/// Cost spread of one hour at `power_kw` (e.g. heating a sauna).
pub fn peak_trough_cost(day: &[LocalHourBucket], power_kw: f64) -> Option<PeakTroughCost> {
    if day.len() < MIN_PEAK_TROUGH_POINTS {
        return None;
    }
    let cheapest = cheapest(day)?.clone();
    let most_expensive = most_expensive(day)?.clone();

    let cheapest_cost_cents = cheapest.point.price_without_tax * power_kw;
    let most_expensive_cost_cents = most_expensive.point.price_without_tax * power_kw;
    let difference_cents = most_expensive_cost_cents - cheapest_cost_cents;

    Some(PeakTroughCost {
        cheapest,
        most_expensive,
        power_kw,
        cheapest_cost_cents,
        most_expensive_cost_cents,
        difference_cents,
        difference_euros: difference_cents / CENTS_PER_EURO,
    })
}
