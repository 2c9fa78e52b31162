//! # Design
//!
//! - Constant error messages; context travels in structured fields.
//! - Source errors are preserved rather than interpolated.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by key/value store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("store io failure")]
    Io {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Encoding or decoding the stored document failed.
    #[error("store document encoding failure")]
    Json {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path of the document, when file-backed.
        path: Option<PathBuf>,
        /// Underlying serde error.
        source: serde_json::Error,
    },
    /// The stored document does not have the expected shape.
    #[error("store document is malformed")]
    InvalidDocument {
        /// Path of the malformed document.
        path: PathBuf,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// The backend refused the operation (quota, injected fault, ...).
    #[error("store rejected the operation")]
    Rejected {
        /// Operation that was refused.
        operation: &'static str,
        /// Key targeted by the operation.
        key: String,
        /// Machine-readable reason for the refusal.
        reason: &'static str,
    },
}

impl StoreError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(
        operation: &'static str,
        path: Option<PathBuf>,
        source: serde_json::Error,
    ) -> Self {
        Self::Json {
            operation,
            path,
            source,
        }
    }

    /// Stable identifier for logs and machine-readable output.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Io { .. } => "io",
            Self::Json { .. } => "json",
            Self::InvalidDocument { .. } => "invalid_document",
            Self::Rejected { .. } => "rejected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn messages_are_constant_and_sources_preserved() {
        let err = StoreError::io("document.read", "store.json", io::Error::other("disk"));
        assert_eq!(err.to_string(), "store io failure");
        assert_eq!(err.kind(), "io");
        assert!(err.source().is_some());

        let rejected = StoreError::Rejected {
            operation: "set",
            key: "auto-lock-timer".to_string(),
            reason: "quota_exceeded",
        };
        assert_eq!(rejected.to_string(), "store rejected the operation");
        assert!(rejected.source().is_none());
    }
}
