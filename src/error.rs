//! Error types for the report pipeline

use chrono::NaiveDate;
use thiserror::Error;

/// Date range validation failures, raised before any network call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateRangeError {
    #[error("Invalid range: start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Range too large: {days} days requested, at most {max} allowed")]
    RangeTooLarge { days: i64, max: i64 },
}

/// Failure of a single (customer, date) fetch
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Report request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Report API returned HTTP {0}")]
    Status(u16),

    #[error("Report API request timed out after {0}s")]
    Timeout(u64),

    #[error("Failed to decode report payload: {0}")]
    Decode(String),
}

impl FetchError {
    /// Whether the failure says the service could not be reached at all,
    /// as opposed to the service answering with an error
    pub fn is_unreachable(&self) -> bool {
        match self {
            FetchError::Transport(e) => e.is_connect() || e.is_timeout(),
            FetchError::Timeout(_) => true,
            FetchError::Status(_) | FetchError::Decode(_) => false,
        }
    }
}

/// Whole-batch aggregation failure
#[derive(Error, Debug)]
pub enum AggregateError {
    #[error(transparent)]
    Range(#[from] DateRangeError),

    #[error("Report batch failed: none of {requested} requests succeeded ({reason})")]
    BatchFailed { requested: usize, reason: String },
}

/// Working duration could not be derived from an activity log
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DurationError {
    #[error("Insufficient data: {0}")]
    InsufficientData(&'static str),
}

/// Raw coordinate string could not be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinateError {
    #[error("Invalid location format: {0:?}")]
    InvalidFormat(String),

    #[error("Invalid coordinates: {0:?}")]
    InvalidNumber(String),
}

/// Reverse-geocoding lookup failure; always absorbed by the resolver
#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("Geocoding service temporarily unavailable (circuit breaker open)")]
    CircuitOpen,

    #[error("Geocoding request timed out after {0}s")]
    Timeout(u64),

    #[error("Geocoding service unavailable: {0}")]
    Unavailable(#[from] anyhow::Error),
}

/// Export-time failures
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Nothing to export: the report batch is empty")]
    EmptyBatch,

    #[error("No rendered report document is available to export")]
    RenderTargetMissing,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to encode activities: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Report template failed: {0}")]
    Template(#[from] tera::Error),

    #[error("PDF rendering failed: {0}")]
    Render(String),
}
