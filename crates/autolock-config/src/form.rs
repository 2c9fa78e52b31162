//! Input state for the auto-lock settings field.
//!
//! Tracks what a settings screen needs to render the interval input: whether
//! it is still loading, the entered text, whether it differs from the stored
//! value, which validation message to show, and whether saving is allowed.
//! Validation always goes through [`validate`].

use crate::command::UpdateCommand;
use crate::defaults::{FIELD_DESCRIPTION, FIELD_LABEL};
use crate::error::{IntervalResult, ValidationError};
use crate::model::AutoLockInterval;
use crate::validate::{parse_input, validate};

/// Editable state of the auto-lock interval field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoLockForm {
    initial: Option<AutoLockInterval>,
    input: String,
    touched: bool,
}

impl AutoLockForm {
    /// Form with no loaded value.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the field to a freshly observed stored value, discarding edits.
    pub fn reinitialize(&mut self, value: Option<AutoLockInterval>) {
        self.initial = value;
        self.input = value.map(|interval| interval.to_string()).unwrap_or_default();
        self.touched = false;
    }

    /// Whether the stored value is still unknown.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.initial.is_none()
    }

    /// Label shown next to the field.
    #[must_use]
    pub const fn label() -> &'static str {
        FIELD_LABEL
    }

    /// Help text shown under the field.
    #[must_use]
    pub const fn description() -> &'static str {
        FIELD_DESCRIPTION
    }

    /// Stored value the form was initialised with.
    #[must_use]
    pub const fn initial(&self) -> Option<AutoLockInterval> {
        self.initial
    }

    /// Current field text.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Replace the field text and mark it as touched.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
        self.touched = true;
    }

    /// Whether the field text differs from the stored value.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        let initial = self.initial.map(|interval| interval.to_string()).unwrap_or_default();
        self.input.trim() != initial
    }

    /// Result of validating the current text.
    ///
    /// # Errors
    ///
    /// Returns the first rule the current text breaks.
    pub fn validation(&self) -> Result<AutoLockInterval, ValidationError> {
        validate(parse_input(&self.input).as_ref())
    }

    /// Validation message to display; hidden until the field was touched.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        if !self.touched {
            return None;
        }
        self.validation().err().map(|err| err.to_string())
    }

    /// Whether the save action should be enabled.
    #[must_use]
    pub fn can_submit(&self, in_flight: bool) -> bool {
        !self.is_loading() && self.is_dirty() && !in_flight && self.validation().is_ok()
    }

    /// Submit the current text through `command`.
    ///
    /// On success the form treats the saved value as its new baseline.
    ///
    /// # Errors
    ///
    /// Propagates every [`UpdateCommand::submit`] failure.
    pub async fn submit(&mut self, command: &UpdateCommand) -> IntervalResult<AutoLockInterval> {
        self.touched = true;
        let candidate = parse_input(&self.input);
        let saved = command.submit(candidate.as_ref()).await?;
        self.reinitialize(Some(saved));
        Ok(saved)
    }
}
