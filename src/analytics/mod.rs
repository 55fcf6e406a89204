//! Price analytics over local-time buckets.
//!
//! The submodules are pure functions over already-bucketed prices; only
//! [`engine`] talks to a store.

pub mod engine;
pub mod historical;
pub mod savings;
pub mod statistics;
pub mod window;

pub use engine::{AnalyticsEngine, AnalyticsSnapshot};
pub use historical::*;
pub use savings::*;
pub use statistics::*;
pub use window::*;
