//! `watch` handler: stream interval (and optionally lock) changes.

use std::future::Future;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, anyhow};
use autolock_config::{AccessorState, IdleLock, IntervalAccessor, LockState};
use autolock_store::KeyValueStore;
use tokio::sync::watch;
use tracing::info;

use crate::cli::{OutputFormat, WatchArgs};
use crate::context::{AppContext, CliError, CliResult};
use crate::output::{render_lock, render_state};

pub(crate) async fn handle_watch(ctx: &AppContext, args: &WatchArgs) -> CliResult<()> {
    if args.poll_ms == 0 {
        return Err(CliError::validation("--poll-ms must be greater than zero"));
    }

    let store = ctx.open_store().await?;
    let _external = store.watch_external(Duration::from_millis(args.poll_ms));
    let accessor = IntervalAccessor::activated(store as Arc<dyn KeyValueStore>);
    let idle = args.lock_timer.then(|| IdleLock::spawn(accessor.watch()));

    let shutdown = async {
        tokio::signal::ctrl_c().await?;
        info!("watch interrupted");
        Ok::<(), io::Error>(())
    };
    stream_changes(
        accessor.watch(),
        idle.as_ref().map(IdleLock::watch_state),
        ctx.output,
        shutdown,
        &mut io::stdout(),
    )
    .await
}

/// Print the current state, then every change, until `shutdown` resolves or
/// the accessor goes away.
async fn stream_changes<W, F>(
    mut states: watch::Receiver<AccessorState>,
    mut locks: Option<watch::Receiver<LockState>>,
    output: OutputFormat,
    shutdown: F,
    out: &mut W,
) -> CliResult<()>
where
    W: Write,
    F: Future<Output = io::Result<()>>,
{
    let initial = states.borrow_and_update().clone();
    emit(out, &render_state(&initial, output)?)?;

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            result = &mut shutdown => {
                return result
                    .context("failed to listen for interrupt")
                    .map_err(CliError::failure);
            }
            changed = states.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let state = states.borrow_and_update().clone();
                emit(out, &render_state(&state, output)?)?;
            }
            Some(lock) = next_lock(locks.as_mut()) => {
                emit(out, &render_lock(lock, output)?)?;
            }
        }
    }
}

async fn next_lock(locks: Option<&mut watch::Receiver<LockState>>) -> Option<LockState> {
    let locks = locks?;
    locks.changed().await.ok()?;
    Some(*locks.borrow_and_update())
}

fn emit<W: Write>(out: &mut W, line: &str) -> CliResult<()> {
    writeln!(out, "{line}")
        .and_then(|()| out.flush())
        .map_err(|err| CliError::failure(anyhow!("failed to write output: {err}")))
}
