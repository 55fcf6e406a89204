use thiserror::Error;

/// Misuse of the analytics API.
///
/// Missing or partial price data is never reported through this type: those
/// cases surface as `None` fields in the result structures instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalyticsError {
    #[error("Invalid instant: {0}")]
    InvalidInstant(String),

    #[error("Unknown time zone: {0}")]
    InvalidZone(String),

    #[error("Unknown price region: {0}")]
    InvalidRegion(String),

    #[error("Invalid local date: {0}")]
    InvalidDate(String),

    #[error("Unknown series granularity: {0}")]
    InvalidGranularity(String),
}
