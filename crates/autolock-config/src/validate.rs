//! Bounds validation for proposed intervals.
//!
//! Every input boundary (form, CLI, stored document) funnels through
//! [`validate`]; no other code re-implements the rules.

use serde_json::{Number, Value};

use crate::defaults::{MAX_MINUTES, MIN_MINUTES};
use crate::error::ValidationError;
use crate::model::AutoLockInterval;

/// Validate a candidate interval.
///
/// Rules run in order and the first failure is reported: absent (`None` or
/// `null`), not a whole number, outside `MIN_MINUTES..=MAX_MINUTES`.
///
/// # Errors
///
/// Returns the [`ValidationError`] for the first rule the candidate breaks.
pub fn validate(candidate: Option<&Value>) -> Result<AutoLockInterval, ValidationError> {
    match candidate {
        None | Some(Value::Null) => Err(ValidationError::Missing),
        Some(Value::Number(number)) => validate_number(number),
        Some(_) => Err(ValidationError::NotInteger),
    }
}

/// Turn raw form text into a candidate for [`validate`].
///
/// Blank text is absent; anything that parses as a JSON number becomes a
/// number; everything else is kept as a string (and will fail as
/// [`ValidationError::NotInteger`]).
#[must_use]
pub fn parse_input(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<Number>(trimmed) {
        Ok(number) => Some(Value::Number(number)),
        Err(_) => Some(Value::String(trimmed.to_string())),
    }
}

pub(crate) fn validate_minutes(minutes: i64) -> Result<AutoLockInterval, ValidationError> {
    if minutes < i64::from(MIN_MINUTES) || minutes > i64::from(MAX_MINUTES) {
        return Err(ValidationError::out_of_range());
    }
    u32::try_from(minutes)
        .map(AutoLockInterval::new_unchecked)
        .map_err(|_| ValidationError::out_of_range())
}

fn validate_number(number: &Number) -> Result<AutoLockInterval, ValidationError> {
    if let Some(minutes) = number.as_i64() {
        return validate_minutes(minutes);
    }
    if number.is_u64() {
        // Larger than i64::MAX.
        return Err(ValidationError::out_of_range());
    }

    match number.as_f64() {
        Some(value) if value.is_finite() && value.fract() == 0.0 => {
            if value < f64::from(MIN_MINUTES) || value > f64::from(MAX_MINUTES) {
                Err(ValidationError::out_of_range())
            } else {
                #[allow(clippy::cast_possible_truncation)]
                let minutes = value as i64;
                validate_minutes(minutes)
            }
        }
        _ => Err(ValidationError::NotInteger),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_every_value_inside_bounds() {
        for minutes in MIN_MINUTES..=MAX_MINUTES {
            let interval = validate(Some(&json!(minutes))).expect("in-range value");
            assert_eq!(interval.minutes(), minutes);
        }
    }

    #[test]
    fn rejects_values_outside_bounds() {
        for candidate in [json!(0), json!(-1), json!(31), json!(i64::MAX), json!(u64::MAX)] {
            assert!(
                matches!(
                    validate(Some(&candidate)),
                    Err(ValidationError::OutOfRange { min: 1, max: 30 })
                ),
                "{candidate} should be out of range"
            );
        }
    }

    #[test]
    fn rejects_non_integers() {
        for candidate in [json!(1.5), json!("10"), json!(true), json!([5]), json!({"m": 5})] {
            assert_eq!(
                validate(Some(&candidate)),
                Err(ValidationError::NotInteger),
                "{candidate} should not be an integer"
            );
        }
    }

    #[test]
    fn whole_floats_count_as_integers() {
        assert_eq!(validate(Some(&json!(12.0))).map(AutoLockInterval::minutes), Ok(12));
        assert_eq!(
            validate(Some(&json!(45.0))),
            Err(ValidationError::out_of_range())
        );
    }

    #[test]
    fn absent_wins_over_other_rules() {
        assert_eq!(validate(None), Err(ValidationError::Missing));
        assert_eq!(validate(Some(&Value::Null)), Err(ValidationError::Missing));
    }

    #[test]
    fn fractional_out_of_range_reports_not_integer_first() {
        assert_eq!(validate(Some(&json!(99.5))), Err(ValidationError::NotInteger));
    }

    #[test]
    fn parse_input_classifies_text() {
        assert_eq!(parse_input("   "), None);
        assert_eq!(parse_input(" 15 "), Some(json!(15)));
        assert_eq!(parse_input("2.5"), Some(json!(2.5)));
        assert_eq!(parse_input("ten"), Some(json!("ten")));

        assert_eq!(
            validate(parse_input("abc").as_ref()),
            Err(ValidationError::NotInteger)
        );
        assert_eq!(validate(parse_input("").as_ref()), Err(ValidationError::Missing));
    }

    #[test]
    fn validation_is_deterministic() {
        let candidate = json!(17);
        assert_eq!(validate(Some(&candidate)), validate(Some(&candidate)));
    }
}
