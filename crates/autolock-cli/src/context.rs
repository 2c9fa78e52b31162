//! Shared store context and error types for the CLI.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use autolock_config::IntervalError;
use autolock_store::FileStore;

use crate::cli::OutputFormat;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl From<IntervalError> for CliError {
    fn from(err: IntervalError) -> Self {
        match err {
            IntervalError::Validation { source } => Self::validation(source.to_string()),
            IntervalError::SubmissionInFlight => Self::validation(err.to_string()),
            other => Self::failure(other),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

/// Store location and rendering options shared by every command.
#[derive(Debug, Clone)]
pub(crate) struct AppContext {
    pub(crate) store_path: PathBuf,
    pub(crate) output: OutputFormat,
}

impl AppContext {
    pub(crate) async fn open_store(&self) -> CliResult<Arc<FileStore>> {
        let store = FileStore::open(&self.store_path)
            .await
            .with_context(|| format!("failed to open store {}", self.store_path.display()))
            .map_err(CliError::failure)?;
        Ok(Arc::new(store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use autolock_config::ValidationError;

    #[test]
    fn exit_codes_separate_user_and_operational_errors() {
        let validation = CliError::validation("bad input");
        assert_eq!(validation.exit_code(), 2);
        assert_eq!(validation.display_message(), "bad input");

        let failure = CliError::failure(anyhow!("inner").context("outer"));
        assert_eq!(failure.exit_code(), 3);
        assert_eq!(failure.display_message(), "outer: inner");
        assert_eq!(failure.to_string(), "cli error");
    }

    #[test]
    fn interval_errors_map_to_exit_classes() {
        let invalid: CliError = IntervalError::from(ValidationError::NotInteger).into();
        assert_eq!(invalid.exit_code(), 2);
        assert_eq!(invalid.display_message(), "Auto-lock timer must be an integer");

        let inactive: CliError = IntervalError::Inactive.into();
        assert_eq!(inactive.exit_code(), 3);
    }
}
