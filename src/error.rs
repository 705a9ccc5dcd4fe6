//! Error types for a3s-recurrence

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur while resolving a recurrence
#[derive(Debug, Error)]
pub enum RecurrenceError {
    /// Interval string is not a valid cron expression
    #[error("Invalid cron expression: {0}")]
    InvalidCron(String),

    /// Interval string is not a valid human-readable duration
    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    /// Month-step tag carries an unusable step count
    #[error("Invalid month step: {0}")]
    InvalidMonthStep(String),

    /// No valid calendar date found within the month-step bound
    #[error("No valid month-step date found after {attempts} attempts")]
    MonthStepExhausted { attempts: u32 },

    /// Anchor string could not be read as a time of day
    #[error("Invalid repeatAt anchor: {0}")]
    InvalidAnchor(String),

    /// Unknown IANA timezone name
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// Resolution produced a timestamp that does not move past the last run
    #[error("Next run {next} does not advance past {reference}")]
    NonAdvancing {
        next: DateTime<Utc>,
        reference: DateTime<Utc>,
    },

    /// Date arithmetic left the representable range
    #[error("Date out of range: {0}")]
    OutOfRange(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for recurrence operations
pub type Result<T> = std::result::Result<T, RecurrenceError>;
