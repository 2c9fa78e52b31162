//! Storage key and fixed bounds for the auto-lock interval.
//!
//! # Design
//! - Bounds are process-wide constants; nothing at runtime can widen them.
//! - The default applies only while the key has never been written.

/// Key under which the interval (whole minutes) is stored.
pub const AUTO_LOCK_KEY: &str = "auto-lock-timer";
/// Smallest accepted interval, in minutes.
pub const MIN_MINUTES: u32 = 1;
/// Largest accepted interval, in minutes.
pub const MAX_MINUTES: u32 = 30;
/// Interval reported when the store holds no value.
pub const DEFAULT_MINUTES: u32 = 5;

/// Field label shown next to the interval input.
pub const FIELD_LABEL: &str = "Auto-lock timer (minutes)";
/// Help text shown under the interval label.
pub const FIELD_DESCRIPTION: &str = "Set the idle time in minutes before the wallet locks itself.";
