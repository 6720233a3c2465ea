//! Error types for the scheduler module

use std::fmt;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler-specific errors
#[derive(Debug)]
pub enum SchedulerError {
    /// Cron descriptor could not be parsed
    InvalidCron {
        expr: String,
        reason: String,
    },

    /// Daily slot is not a valid "HH:MM" time
    InvalidTimeOfDay {
        value: String,
        reason: String,
    },

    /// Required configuration is unavailable for this run
    ConfigMissing {
        what: String,
        reason: String,
    },

    /// Persisted scheduler state could not be written or read
    PersistFailed {
        operation: String,
        reason: String,
    },

    /// Plan window is empty or inverted
    InvalidWindow {
        from: String,
        to: String,
    },

    /// Serialization/deserialization error
    SerializationError {
        reason: String,
    },

    /// IO error
    IoError {
        operation: String,
        reason: String,
    },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCron { expr, reason } => {
                write!(f, "Invalid cron descriptor '{}': {}", expr, reason)
            }
            Self::InvalidTimeOfDay { value, reason } => {
                write!(f, "Invalid time of day '{}': {}", value, reason)
            }
            Self::ConfigMissing { what, reason } => {
                write!(f, "Missing configuration '{}': {}", what, reason)
            }
            Self::PersistFailed { operation, reason } => {
                write!(f, "Failed to persist scheduler state during '{}': {}", operation, reason)
            }
            Self::InvalidWindow { from, to } => {
                write!(f, "Invalid plan window [{}, {}): end must be after start", from, to)
            }
            Self::SerializationError { reason } => {
                write!(f, "Serialization error: {}", reason)
            }
            Self::IoError { operation, reason } => {
                write!(f, "IO error during '{}': {}", operation, reason)
            }
        }
    }
}

impl std::error::Error for SchedulerError {}

impl From<serde_json::Error> for SchedulerError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError {
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for SchedulerError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError {
            operation: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl SchedulerError {
    /// Create an invalid cron error
    pub fn invalid_cron(expr: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCron {
            expr: expr.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid time-of-day error
    pub fn invalid_time_of_day(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTimeOfDay {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a missing configuration error
    pub fn config_missing(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigMissing {
            what: what.into(),
            reason: reason.into(),
        }
    }

    /// Create a persistence error with context
    pub fn persist_failed(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PersistFailed {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid window error
    pub fn invalid_window(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::InvalidWindow {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Create an IO error with context
    pub fn io_error(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::IoError {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PersistFailed { .. } | Self::SerializationError { .. } | Self::IoError { .. }
        )
    }
}
