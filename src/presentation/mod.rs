//! Display formats for the analytics results. Nothing in here feeds back
//! into the computations.

pub mod chart;
pub mod csv_export;

pub use chart::*;
pub use csv_export::*;
