//! Idle lock timer driven by the observed auto-lock interval.
//!
//! A monitor task sleeps until `last_activity + interval` and then flips the
//! lock state. Activity, unlocks, and interval changes wake it so the deadline
//! is recomputed; there is no polling.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info};

use crate::model::{AccessorState, AutoLockInterval};

/// Whether the wallet is currently usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    /// Unlocked and counting down.
    Unlocked,
    /// Locked until [`IdleLock::unlock`] is called.
    Locked,
}

/// Locks the wallet after the configured interval without activity.
///
/// Until the accessor reports a value the default interval applies; after
/// that the last reported value is kept, even if a later read fails.
pub struct IdleLock {
    shared: Arc<IdleShared>,
    task: JoinHandle<()>,
}

struct IdleShared {
    state: watch::Sender<LockState>,
    timing: Mutex<Timing>,
    wake: Notify,
}

#[derive(Clone, Copy)]
struct Timing {
    last_activity: Instant,
    interval: AutoLockInterval,
}

impl IdleLock {
    /// Start an unlocked timer fed by an accessor's state channel.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    #[must_use]
    pub fn spawn(mut intervals: watch::Receiver<AccessorState>) -> Self {
        let interval = intervals.borrow_and_update().value().unwrap_or_default();
        let (state, _) = watch::channel(LockState::Unlocked);
        let shared = Arc::new(IdleShared {
            state,
            timing: Mutex::new(Timing {
                last_activity: Instant::now(),
                interval,
            }),
            wake: Notify::new(),
        });
        let task = tokio::spawn(monitor(Arc::clone(&shared), intervals));
        Self { shared, task }
    }

    /// Current lock state.
    #[must_use]
    pub fn state(&self) -> LockState {
        *self.shared.state.borrow()
    }

    /// Receiver notified on every lock state change.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<LockState> {
        self.shared.state.subscribe()
    }

    /// Interval currently applied to the countdown.
    #[must_use]
    pub fn interval(&self) -> AutoLockInterval {
        self.shared.lock_timing().interval
    }

    /// Reset the countdown. Ignored while locked.
    pub fn record_activity(&self) {
        if self.state() == LockState::Locked {
            return;
        }
        self.shared.lock_timing().last_activity = Instant::now();
        self.shared.wake.notify_one();
    }

    /// Unlock and restart the countdown.
    pub fn unlock(&self) {
        self.shared.lock_timing().last_activity = Instant::now();
        if self.shared.state.send_replace(LockState::Unlocked) == LockState::Locked {
            info!("wallet unlocked");
        }
        self.shared.wake.notify_one();
    }

    /// Lock immediately.
    pub fn lock_now(&self) {
        self.shared.lock("manual");
        self.shared.wake.notify_one();
    }

    /// Time left before the wallet locks; `None` while already locked.
    #[must_use]
    pub fn time_until_lock(&self) -> Option<Duration> {
        if self.state() == LockState::Locked {
            return None;
        }
        let timing = *self.shared.lock_timing();
        Some(timing.deadline().saturating_duration_since(Instant::now()))
    }
}

impl Drop for IdleLock {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl IdleShared {
    fn lock_timing(&self) -> MutexGuard<'_, Timing> {
        self.timing.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self, reason: &'static str) {
        if self.state.send_replace(LockState::Locked) == LockState::Unlocked {
            info!(reason, "wallet locked");
        }
    }

    fn deadline(&self) -> Option<Instant> {
        if *self.state.borrow() == LockState::Locked {
            return None;
        }
        Some(self.lock_timing().deadline())
    }
}

impl Timing {
    fn deadline(self) -> Instant {
        self.last_activity + self.interval.as_duration()
    }
}

async fn monitor(shared: Arc<IdleShared>, mut intervals: watch::Receiver<AccessorState>) {
    let mut intervals_open = true;
    loop {
        let deadline = shared.deadline();
        tokio::select! {
            () = wait_until(deadline) => {
                if shared.deadline().is_some_and(|due| due <= Instant::now()) {
                    shared.lock("idle");
                }
            }
            changed = intervals.changed(), if intervals_open => {
                if changed.is_err() {
                    intervals_open = false;
                    continue;
                }
                let observed = intervals.borrow_and_update().value();
                if let Some(interval) = observed {
                    debug!(minutes = interval.minutes(), "idle lock interval updated");
                    shared.lock_timing().interval = interval;
                }
            }
            () = shared.wake.notified() => {}
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
