//! Typed interval value and accessor state.

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::defaults::{DEFAULT_MINUTES, MAX_MINUTES, MIN_MINUTES};
use crate::error::ValidationError;
use crate::validate::{validate, validate_minutes};

/// Idle time, in whole minutes, before the wallet locks.
///
/// Always within `MIN_MINUTES..=MAX_MINUTES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "u32")]
pub struct AutoLockInterval(u32);

impl AutoLockInterval {
    /// Shortest allowed interval.
    pub const MIN: Self = Self(MIN_MINUTES);
    /// Longest allowed interval.
    pub const MAX: Self = Self(MAX_MINUTES);
    /// Interval used while nothing has been stored.
    pub const DEFAULT: Self = Self(DEFAULT_MINUTES);

    pub(crate) const fn new_unchecked(minutes: u32) -> Self {
        Self(minutes)
    }

    /// Interval length in minutes.
    #[must_use]
    pub const fn minutes(self) -> u32 {
        self.0
    }

    /// Interval length as a [`Duration`].
    #[must_use]
    pub fn as_duration(self) -> Duration {
        Duration::from_secs(u64::from(self.0) * 60)
    }
}

impl Default for AutoLockInterval {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for AutoLockInterval {
    type Error = ValidationError;

    fn try_from(minutes: i64) -> Result<Self, Self::Error> {
        validate_minutes(minutes)
    }
}

impl<'de> Deserialize<'de> for AutoLockInterval {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let candidate = Value::deserialize(deserializer)?;
        validate(Some(&candidate)).map_err(D::Error::custom)
    }
}

impl From<AutoLockInterval> for u32 {
    fn from(interval: AutoLockInterval) -> Self {
        interval.0
    }
}

impl From<AutoLockInterval> for Value {
    fn from(interval: AutoLockInterval) -> Self {
        Self::from(interval.0)
    }
}

impl Display for AutoLockInterval {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Lifecycle of an [`IntervalAccessor`](crate::IntervalAccessor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessorState {
    /// Not yet activated.
    Uninitialized,
    /// Initial read in progress; no value to show yet.
    Loading,
    /// Last value read from the store.
    Ready(AutoLockInterval),
    /// The initial read failed.
    Failed {
        /// Description of the failure.
        detail: String,
    },
    /// Deactivated; no further updates will arrive.
    Deactivated,
}

impl AccessorState {
    /// Interval to display, if one is known.
    #[must_use]
    pub const fn value(&self) -> Option<AutoLockInterval> {
        match self {
            Self::Ready(interval) => Some(*interval),
            _ => None,
        }
    }

    /// Whether the state will not change without new input.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        !matches!(self, Self::Loading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serde_round_trip_enforces_bounds() {
        let interval: AutoLockInterval = serde_json::from_value(json!(12)).unwrap();
        assert_eq!(interval.minutes(), 12);
        assert_eq!(serde_json::to_value(interval).unwrap(), json!(12));

        assert!(serde_json::from_value::<AutoLockInterval>(json!(0)).is_err());
        assert!(serde_json::from_value::<AutoLockInterval>(json!(31)).is_err());
    }

    #[test]
    fn deserialize_applies_the_validator_rules() {
        let whole: AutoLockInterval = serde_json::from_value(json!(12.0)).unwrap();
        assert_eq!(whole.minutes(), 12);

        for (candidate, expected) in [
            (json!(2.5), ValidationError::NotInteger),
            (json!("10"), ValidationError::NotInteger),
            (Value::Null, ValidationError::Missing),
            (json!(45), ValidationError::out_of_range()),
        ] {
            let err = serde_json::from_value::<AutoLockInterval>(candidate.clone()).unwrap_err();
            assert!(
                err.to_string().contains(&expected.to_string()),
                "{candidate}: {err}"
            );
        }
    }

    #[test]
    fn duration_is_whole_minutes() {
        assert_eq!(AutoLockInterval::MAX.as_duration(), Duration::from_secs(1_800));
        assert_eq!(AutoLockInterval::default(), AutoLockInterval::DEFAULT);
    }

    #[test]
    fn only_ready_state_exposes_value() {
        assert_eq!(AccessorState::Loading.value(), None);
        assert!(!AccessorState::Loading.is_settled());
        assert_eq!(
            AccessorState::Ready(AutoLockInterval::MIN).value(),
            Some(AutoLockInterval::MIN)
        );
        assert!(AccessorState::Deactivated.is_settled());
    }
}
