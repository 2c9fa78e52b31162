//! Error types for auto-lock interval operations.

use autolock_store::StoreError;
use thiserror::Error;

use crate::defaults::{MAX_MINUTES, MIN_MINUTES};

/// Reasons a proposed interval is refused. The first failing rule wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No value was supplied.
    #[error("Auto-lock timer is a required field")]
    Missing,
    /// The value is not a whole number.
    #[error("Auto-lock timer must be an integer")]
    NotInteger,
    /// The value lies outside the accepted bounds.
    #[error("Auto-lock timer must be between {min} and {max} minutes")]
    OutOfRange {
        /// Lower bound, inclusive.
        min: u32,
        /// Upper bound, inclusive.
        max: u32,
    },
}

impl ValidationError {
    pub(crate) const fn out_of_range() -> Self {
        Self::OutOfRange {
            min: MIN_MINUTES,
            max: MAX_MINUTES,
        }
    }

    /// Stable identifier for logs and machine-readable output.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::NotInteger => "not_integer",
            Self::OutOfRange { .. } => "out_of_range",
        }
    }
}

/// Errors raised while reading, updating, or observing the interval.
#[derive(Debug, Error)]
pub enum IntervalError {
    /// The submitted value failed validation; nothing was written.
    #[error("invalid auto-lock interval")]
    Validation {
        /// Rule that rejected the value.
        #[from]
        source: ValidationError,
    },
    /// Reading the stored interval failed.
    #[error("failed to read auto-lock interval")]
    StorageRead {
        /// Underlying store error.
        source: StoreError,
    },
    /// Persisting the interval failed; the previous value is still in place.
    #[error("failed to save auto-lock interval")]
    StorageWrite {
        /// Underlying store error.
        source: StoreError,
    },
    /// The store holds a value that is not a valid interval.
    #[error("stored auto-lock interval is invalid")]
    CorruptStoredValue {
        /// Rule the stored value violates.
        source: ValidationError,
    },
    /// Another submission has not resolved yet.
    #[error("an auto-lock interval update is already in progress")]
    SubmissionInFlight,
    /// The accessor could not load a value.
    #[error("auto-lock interval is unavailable")]
    Unavailable {
        /// Description of the load failure.
        detail: String,
    },
    /// The accessor is not active.
    #[error("auto-lock interval accessor is not active")]
    Inactive,
}

impl IntervalError {
    /// Stable identifier for logs and machine-readable output.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::StorageRead { .. } => "storage_read",
            Self::StorageWrite { .. } => "storage_write",
            Self::CorruptStoredValue { .. } => "corrupt_stored_value",
            Self::SubmissionInFlight => "submission_in_flight",
            Self::Unavailable { .. } => "unavailable",
            Self::Inactive => "inactive",
        }
    }

    /// Whether the user can fix the failure by changing their input.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

/// Convenience alias for interval results.
pub type IntervalResult<T> = Result<T, IntervalError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn validation_messages_carry_bounds() {
        assert_eq!(
            ValidationError::out_of_range().to_string(),
            "Auto-lock timer must be between 1 and 30 minutes"
        );
        assert_eq!(ValidationError::Missing.kind(), "missing");
    }

    #[test]
    fn interval_error_chains_validation_source() {
        let err = IntervalError::from(ValidationError::NotInteger);
        assert_eq!(err.kind(), "validation");
        assert!(err.is_user_error());
        assert_eq!(
            err.source().map(ToString::to_string).as_deref(),
            Some("Auto-lock timer must be an integer")
        );

        let write = IntervalError::StorageWrite {
            source: StoreError::Rejected {
                operation: "set",
                key: "k".into(),
                reason: "quota_exceeded",
            },
        };
        assert!(!write.is_user_error());
        assert_eq!(write.to_string(), "failed to save auto-lock interval");
    }
}
