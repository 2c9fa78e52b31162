//! `get`, `set`, and `bounds` handlers.

use std::sync::Arc;

use autolock_config::defaults::{FIELD_DESCRIPTION, FIELD_LABEL};
use autolock_config::{
    AUTO_LOCK_KEY, DEFAULT_MINUTES, MAX_MINUTES, MIN_MINUTES, UpdateCommand,
    load_stored_interval, parse_input,
};
use autolock_store::KeyValueStore;
use tracing::info;

use crate::cli::SetArgs;
use crate::context::{AppContext, CliResult};
use crate::output::{BoundsView, IntervalView, render_bounds, render_interval, render_saved};

pub(crate) async fn handle_get(ctx: &AppContext) -> CliResult<String> {
    let store = ctx.open_store().await?;
    let stored = load_stored_interval(store.as_ref()).await?;
    let is_default = stored.is_none();
    let interval = stored.unwrap_or_default();

    render_interval(
        &IntervalView {
            key: AUTO_LOCK_KEY,
            minutes: interval.minutes(),
            is_default,
        },
        ctx.output,
    )
}

pub(crate) async fn handle_set(ctx: &AppContext, args: &SetArgs) -> CliResult<String> {
    let candidate = parse_input(&args.minutes);
    let store = ctx.open_store().await?;
    let saved = UpdateCommand::new(store as Arc<dyn KeyValueStore>)
        .submit(candidate.as_ref())
        .await?;
    info!(minutes = saved.minutes(), "auto-lock interval updated from cli");
    render_saved(saved, ctx.output)
}

pub(crate) fn handle_bounds(ctx: &AppContext) -> CliResult<String> {
    render_bounds(
        &BoundsView {
            key: AUTO_LOCK_KEY,
            min_minutes: MIN_MINUTES,
            max_minutes: MAX_MINUTES,
            default_minutes: DEFAULT_MINUTES,
            label: FIELD_LABEL,
            description: FIELD_DESCRIPTION,
        },
        ctx.output,
    )
}
