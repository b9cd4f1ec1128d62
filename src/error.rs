//! Unified error hierarchy for dosewise
//!
//! Boundary validation failures, upstream provider failures and configuration
//! problems. The scheduling components themselves never fail: ambiguous
//! configurations resolve to empty windows or an inactive phase.

use crate::models::Prayer;
use thiserror::Error;

/// Top-level error type for all dosewise operations
#[derive(Debug, Error)]
pub enum DoseWiseError {
    /// Medication entry rejected at the input boundary
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Prayer-time or festival provider failed
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Input errors for a raw medication entry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Required field absent or blank
    #[error("Entry {entry}: missing required field '{field}'")]
    MissingField { entry: String, field: String },

    /// Dose time not in strict HH:MM form
    #[error("Entry {entry}: malformed dose time {value:?} (expected HH:MM)")]
    MalformedTime { entry: String, value: String },

    /// Meal relation not recognised
    #[error("Entry {entry}: unknown meal relation {value:?}")]
    UnknownMealRelation { entry: String, value: String },

    /// No dose times listed
    #[error("Entry {entry}: schedule has no dose times")]
    EmptySchedule { entry: String },

    /// Prayer instants not in chronological order; `entry` is the date
    #[error("Prayer times for {entry}: {prayer} is out of chronological order")]
    OutOfOrderPrayer { entry: String, prayer: Prayer },
}

impl ValidationError {
    /// Identifier of the entry that was rejected
    pub fn entry(&self) -> &str {
        match self {
            ValidationError::MissingField { entry, .. }
            | ValidationError::MalformedTime { entry, .. }
            | ValidationError::UnknownMealRelation { entry, .. }
            | ValidationError::EmptySchedule { entry }
            | ValidationError::OutOfOrderPrayer { entry, .. } => entry,
        }
    }
}

/// Provider fetch failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    /// Provider reported a failure
    #[error("{source_name} unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },

    /// Provider did not answer in time
    #[error("{source_name} timed out after {after_ms}ms")]
    Timeout { source_name: String, after_ms: u64 },

    /// Provider answered with data the engine cannot use
    #[error("{source_name} returned invalid data: {reason}")]
    InvalidData { source_name: String, reason: String },
}

impl UpstreamError {
    pub fn unavailable(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        UpstreamError::Unavailable {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for dosewise operations
pub type Result<T> = std::result::Result<T, DoseWiseError>;

impl DoseWiseError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DoseWiseError::Upstream(UpstreamError::Unavailable { .. } | UpstreamError::Timeout { .. })
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            DoseWiseError::Validation(_) => ErrorSeverity::Warning,
            DoseWiseError::Upstream(UpstreamError::Timeout { .. }) => ErrorSeverity::Warning,
            DoseWiseError::Upstream(_) => ErrorSeverity::Error,
            DoseWiseError::Configuration(_) => ErrorSeverity::Critical,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            DoseWiseError::Validation(ValidationError::MalformedTime { entry, value }) => {
                format!(
                    "Medication '{}' has an invalid dose time '{}'. Use 24-hour HH:MM.",
                    entry, value
                )
            }
            DoseWiseError::Upstream(UpstreamError::Timeout { source_name, .. }) => {
                format!(
                    "{} is taking too long to respond. Showing schedules without cultural adjustments.",
                    source_name
                )
            }
            DoseWiseError::Upstream(UpstreamError::Unavailable { source_name, .. }) => {
                format!(
                    "{} is unavailable. Showing schedules without cultural adjustments.",
                    source_name
                )
            }
            DoseWiseError::Upstream(UpstreamError::InvalidData { source_name, .. }) => {
                format!(
                    "{} returned unusable data. Showing schedules without cultural adjustments.",
                    source_name
                )
            }
            DoseWiseError::Validation(ValidationError::OutOfOrderPrayer { entry, prayer }) => {
                format!(
                    "Prayer times for {} list {} out of order. Check the prayer time source.",
                    entry, prayer
                )
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        let err = DoseWiseError::Validation(ValidationError::EmptySchedule {
            entry: "med-1".to_string(),
        });
        assert_eq!(err.severity(), ErrorSeverity::Warning);

        let err = DoseWiseError::Configuration("bad buffer".to_string());
        assert_eq!(err.severity(), ErrorSeverity::Critical);

        let err: DoseWiseError = UpstreamError::InvalidData {
            source_name: "prayer times".to_string(),
            reason: "unordered".to_string(),
        }
        .into();
        assert_eq!(err.severity(), ErrorSeverity::Error);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_error_retryable() {
        let err = DoseWiseError::Upstream(UpstreamError::Timeout {
            source_name: "prayer times".to_string(),
            after_ms: 5000,
        });
        assert!(err.is_retryable());

        let err = DoseWiseError::Configuration("test".to_string());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_user_messages() {
        let err = DoseWiseError::Validation(ValidationError::MalformedTime {
            entry: "metformin".to_string(),
            value: "8am".to_string(),
        });
        assert!(err.user_message().contains("HH:MM"));

        let err: DoseWiseError = UpstreamError::unavailable("Festival calendar", "503").into();
        assert!(err.user_message().starts_with("Festival calendar is unavailable"));
    }

    #[test]
    fn test_validation_entry_accessor() {
        let err = ValidationError::UnknownMealRelation {
            entry: "med-7".to_string(),
            value: "often".to_string(),
        };
        assert_eq!(err.entry(), "med-7");
    }
}
