//! Error types for mirror-core.

use chrono::NaiveDate;
use thiserror::Error;

/// Input rejected before any network or repository access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A date string that is not a valid `YYYY-MM-DD` calendar date.
    #[error("invalid date '{input}': expected YYYY-MM-DD")]
    InvalidDate { input: String },

    /// Range whose start falls after its end.
    #[error("invalid date range: start {start} is after end {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },

    #[error("chunk size must be at least one day")]
    ZeroChunk,
}
