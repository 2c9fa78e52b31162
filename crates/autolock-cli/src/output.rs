//! Output renderers for CLI commands.

use anyhow::anyhow;
use autolock_config::{AccessorState, AutoLockInterval, LockState};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::context::{CliError, CliResult};

#[derive(Debug, Serialize)]
pub(crate) struct IntervalView<'a> {
    pub(crate) key: &'a str,
    pub(crate) minutes: u32,
    pub(crate) is_default: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct BoundsView<'a> {
    pub(crate) key: &'a str,
    pub(crate) min_minutes: u32,
    pub(crate) max_minutes: u32,
    pub(crate) default_minutes: u32,
    pub(crate) label: &'a str,
    pub(crate) description: &'a str,
}

#[derive(Debug, Serialize)]
struct StateView<'a> {
    state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct LockView {
    lock: LockState,
}

pub(crate) fn render_interval(view: &IntervalView<'_>, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(view),
        OutputFormat::Table => {
            let suffix = if view.is_default { " (default)" } else { "" };
            Ok(format!("{:<18} {} min{suffix}", view.key, view.minutes))
        }
    }
}

pub(crate) fn render_saved(interval: AutoLockInterval, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(&serde_json::json!({ "saved": interval })),
        OutputFormat::Table => Ok(format!("auto-lock interval set to {interval} min")),
    }
}

pub(crate) fn render_bounds(view: &BoundsView<'_>, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(view),
        OutputFormat::Table => Ok(format!(
            "{}\n{}\n\n{:<10} {}\n{:<10} {}\n{:<10} {}\n{:<10} {}",
            view.label,
            view.description,
            "key",
            view.key,
            "min",
            view.min_minutes,
            "max",
            view.max_minutes,
            "default",
            view.default_minutes
        )),
    }
}

pub(crate) fn render_state(state: &AccessorState, format: OutputFormat) -> CliResult<String> {
    let view = match state {
        AccessorState::Uninitialized => StateView {
            state: "uninitialized",
            minutes: None,
            detail: None,
        },
        AccessorState::Loading => StateView {
            state: "loading",
            minutes: None,
            detail: None,
        },
        AccessorState::Ready(interval) => StateView {
            state: "ready",
            minutes: Some(interval.minutes()),
            detail: None,
        },
        AccessorState::Failed { detail } => StateView {
            state: "failed",
            minutes: None,
            detail: Some(detail),
        },
        AccessorState::Deactivated => StateView {
            state: "deactivated",
            minutes: None,
            detail: None,
        },
    };

    match format {
        OutputFormat::Json => to_json_line(&view),
        OutputFormat::Table => Ok(match (view.minutes, view.detail) {
            (Some(minutes), _) => format!("{:<13} {minutes} min", view.state),
            (None, Some(detail)) => format!("{:<13} {detail}", view.state),
            (None, None) => view.state.to_string(),
        }),
    }
}

pub(crate) fn render_lock(lock: LockState, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json_line(&LockView { lock }),
        OutputFormat::Table => Ok(match lock {
            LockState::Locked => "wallet locked".to_string(),
            LockState::Unlocked => "wallet unlocked".to_string(),
        }),
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> CliResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))
}

fn to_json_line<T: Serialize + ?Sized>(value: &T) -> CliResult<String> {
    serde_json::to_string(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn parse(text: &str) -> Value {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn interval_renders_in_both_formats() {
        let view = IntervalView {
            key: "auto-lock-timer",
            minutes: 5,
            is_default: true,
        };
        assert_eq!(
            render_interval(&view, OutputFormat::Table).unwrap(),
            "auto-lock-timer    5 min (default)"
        );
        assert_eq!(
            parse(&render_interval(&view, OutputFormat::Json).unwrap()),
            json!({"key": "auto-lock-timer", "minutes": 5, "is_default": true})
        );
    }

    #[test]
    fn states_render_compact_json_lines() {
        let ready = render_state(
            &AccessorState::Ready(AutoLockInterval::MAX),
            OutputFormat::Json,
        )
        .unwrap();
        assert_eq!(parse(&ready), json!({"state": "ready", "minutes": 30}));
        assert!(!ready.contains('\n'));

        let failed = render_state(
            &AccessorState::Failed {
                detail: "disk gone".into(),
            },
            OutputFormat::Table,
        )
        .unwrap();
        assert!(failed.starts_with("failed"));
        assert!(failed.ends_with("disk gone"));
        assert_eq!(
            render_state(&AccessorState::Loading, OutputFormat::Table).unwrap(),
            "loading"
        );
    }

    #[test]
    fn lock_and_saved_messages() {
        assert_eq!(
            render_lock(LockState::Locked, OutputFormat::Table).unwrap(),
            "wallet locked"
        );
        assert_eq!(
            parse(&render_lock(LockState::Unlocked, OutputFormat::Json).unwrap()),
            json!({"lock": "unlocked"})
        );
        assert_eq!(
            parse(&render_saved(AutoLockInterval::MIN, OutputFormat::Json).unwrap()),
            json!({"saved": 1})
        );
    }
}
