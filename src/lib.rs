//! Spot price analytics: local-day statistics, cheapest windows, savings
//! estimates and historical comparisons for day-ahead electricity prices.

pub mod analytics;
pub mod calendar;
pub mod config;
pub mod domain;
pub mod presentation;
pub mod repo;
pub mod telemetry;
