//! Read-through view of the stored interval for presentation code.
//!
//! # Design
//! - The store is the source of truth; the accessor only caches the last read.
//! - Every change notification triggers a fresh read. Notifications that
//!   arrive while a read is running schedule exactly one follow-up read.
//! - Each activation gets a new generation number. Reads and callbacks from an
//!   older generation are discarded, so nothing mutates a deactivated accessor.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use autolock_store::{ChangeListener, KeyValueStore, StoreChange, Subscription};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::defaults::AUTO_LOCK_KEY;
use crate::error::{IntervalError, IntervalResult};
use crate::model::{AccessorState, AutoLockInterval};
use crate::validate::validate;

/// Read the stored interval, falling back to the default when unset.
///
/// # Errors
///
/// Returns [`IntervalError::StorageRead`] when the store fails and
/// [`IntervalError::CorruptStoredValue`] when the stored value is not a valid
/// interval.
pub async fn load_interval(store: &dyn KeyValueStore) -> IntervalResult<AutoLockInterval> {
    Ok(load_stored_interval(store).await?.unwrap_or_default())
}

/// Read the stored interval with a single store read; `None` when unset.
///
/// # Errors
///
/// Same as [`load_interval`].
pub async fn load_stored_interval(
    store: &dyn KeyValueStore,
) -> IntervalResult<Option<AutoLockInterval>> {
    let Some(stored) = store
        .get(AUTO_LOCK_KEY)
        .await
        .map_err(|source| IntervalError::StorageRead { source })?
    else {
        return Ok(None);
    };
    validate(Some(&stored))
        .map(Some)
        .map_err(|source| IntervalError::CorruptStoredValue { source })
}

/// Observes the stored interval and keeps the last known value.
pub struct IntervalAccessor {
    inner: Arc<AccessorInner>,
    subscription: Option<Subscription>,
}

struct AccessorInner {
    store: Arc<dyn KeyValueStore>,
    control: Mutex<LoadControl>,
    updates: watch::Sender<AccessorState>,
}

#[derive(Default)]
struct LoadControl {
    active: bool,
    generation: u64,
    loading: bool,
    reload_pending: bool,
    last_error: Option<String>,
}

impl IntervalAccessor {
    /// Create an inactive accessor over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let (updates, _) = watch::channel(AccessorState::Uninitialized);
        Self {
            inner: Arc::new(AccessorInner {
                store,
                control: Mutex::new(LoadControl::default()),
                updates,
            }),
            subscription: None,
        }
    }

    /// Create an accessor over `store` and activate it.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    #[must_use]
    pub fn activated(store: Arc<dyn KeyValueStore>) -> Self {
        let mut accessor = Self::new(store);
        accessor.activate();
        accessor
    }

    /// Subscribe to store changes and start the initial read. No-op when
    /// already active.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn activate(&mut self) {
        let generation = {
            let mut control = self.inner.lock_control();
            if control.active {
                return;
            }
            control.active = true;
            control.generation += 1;
            control.loading = false;
            control.reload_pending = false;
            control.last_error = None;
            control.generation
        };

        self.inner.updates.send_replace(AccessorState::Loading);
        self.subscription = Some(self.inner.store.subscribe(change_listener(
            Arc::downgrade(&self.inner),
            generation,
        )));
        debug!(generation, "interval accessor activated");
        AccessorInner::request_load(&self.inner, generation);
    }

    /// Stop observing the store. Reads still in flight are discarded when
    /// they resolve.
    pub fn deactivate(&mut self) {
        {
            let mut control = self.inner.lock_control();
            if !control.active {
                return;
            }
            control.active = false;
            control.generation += 1;
            control.loading = false;
            control.reload_pending = false;
        }
        self.subscription = None;
        self.inner.updates.send_replace(AccessorState::Deactivated);
        debug!("interval accessor deactivated");
    }

    /// Whether the accessor is observing the store.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.lock_control().active
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> AccessorState {
        self.inner.updates.borrow().clone()
    }

    /// Last known interval; `None` until the first read completes.
    #[must_use]
    pub fn current_value(&self) -> Option<AutoLockInterval> {
        self.inner.updates.borrow().value()
    }

    /// Most recent read failure, cleared by the next successful read.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.inner.lock_control().last_error.clone()
    }

    /// Receiver that observes every state transition.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<AccessorState> {
        self.inner.updates.subscribe()
    }

    /// Wait until a value is available.
    ///
    /// # Errors
    ///
    /// Returns [`IntervalError::Unavailable`] when the initial read failed and
    /// [`IntervalError::Inactive`] when the accessor is not active.
    pub async fn ready(&self) -> IntervalResult<AutoLockInterval> {
        let mut updates = self.watch();
        loop {
            let state = updates.borrow_and_update().clone();
            match state {
                AccessorState::Ready(interval) => return Ok(interval),
                AccessorState::Failed { detail } => {
                    return Err(IntervalError::Unavailable { detail });
                }
                AccessorState::Uninitialized | AccessorState::Deactivated => {
                    return Err(IntervalError::Inactive);
                }
                AccessorState::Loading => {}
            }
            updates
                .changed()
                .await
                .map_err(|_| IntervalError::Inactive)?;
        }
    }
}

impl Drop for IntervalAccessor {
    fn drop(&mut self) {
        self.deactivate();
    }
}

impl AccessorInner {
    fn lock_control(&self) -> MutexGuard<'_, LoadControl> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn request_load(inner: &Arc<Self>, generation: u64) {
        {
            let mut control = inner.lock_control();
            if !control.active || control.generation != generation {
                return;
            }
            if control.loading {
                control.reload_pending = true;
                return;
            }
            control.loading = true;
        }

        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            loop {
                let result = load_interval(inner.store.as_ref()).await;
                if !inner.finish_load(generation, result) {
                    break;
                }
            }
        });
    }

    /// Apply a completed read. Returns `true` when another read is owed.
    fn finish_load(&self, generation: u64, result: IntervalResult<AutoLockInterval>) -> bool {
        let mut control = self.lock_control();
        if !control.active || control.generation != generation {
            debug!(generation, "discarding read for inactive accessor");
            return false;
        }

        match result {
            Ok(interval) => {
                control.last_error = None;
                self.updates.send_if_modified(|state| {
                    if state.value() == Some(interval) {
                        false
                    } else {
                        *state = AccessorState::Ready(interval);
                        true
                    }
                });
                debug!(minutes = interval.minutes(), "auto-lock interval loaded");
            }
            Err(err) => {
                let detail = describe(&err);
                warn!(error = %detail, kind = err.kind(), "failed to load auto-lock interval");
                control.last_error = Some(detail.clone());
                self.updates.send_if_modified(|state| {
                    if state.value().is_some() {
                        false
                    } else {
                        *state = AccessorState::Failed { detail };
                        true
                    }
                });
            }
        }

        if control.reload_pending {
            control.reload_pending = false;
            true
        } else {
            control.loading = false;
            false
        }
    }
}

fn change_listener(inner: std::sync::Weak<AccessorInner>, generation: u64) -> ChangeListener {
    Arc::new(move |change: &StoreChange| {
        if !change.scope.affects(AUTO_LOCK_KEY) {
            return;
        }
        if let Some(inner) = inner.upgrade() {
            debug!(change_id = change.id, "auto-lock interval changed; re-reading");
            AccessorInner::request_load(&inner, generation);
        }
    })
}

fn describe(err: &IntervalError) -> String {
    let mut detail = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        detail.push_str(": ");
        detail.push_str(&cause.to_string());
        source = cause.source();
    }
    detail
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::DEFAULT_MINUTES;
    use autolock_store::MemoryStore;
    use autolock_test_support::mocks::RecordingStore;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(2);

    async fn wait_for_value(
        updates: &mut watch::Receiver<AccessorState>,
        expected: u32,
    ) -> AccessorState {
        timeout(WAIT, async {
            loop {
                let state = updates.borrow_and_update().clone();
                if state.value().map(AutoLockInterval::minutes) == Some(expected) {
                    return state;
                }
                updates.changed().await.expect("accessor alive");
            }
        })
        .await
        .expect("value should arrive")
    }

    #[tokio::test]
    async fn reports_default_when_store_is_empty() {
        let accessor = IntervalAccessor::activated(Arc::new(MemoryStore::new()));
        let interval = accessor.ready().await.unwrap();
        assert_eq!(interval.minutes(), DEFAULT_MINUTES);
        assert_eq!(accessor.current_value(), Some(interval));
    }

    #[tokio::test]
    async fn exposes_no_value_before_activation() {
        let accessor = IntervalAccessor::new(Arc::new(MemoryStore::new()));
        assert_eq!(accessor.state(), AccessorState::Uninitialized);
        assert_eq!(accessor.current_value(), None);
        assert!(matches!(accessor.ready().await, Err(IntervalError::Inactive)));
    }

    #[tokio::test]
    async fn notification_triggers_fresh_read() {
        let store = MemoryStore::with_entries([(AUTO_LOCK_KEY, json!(10))]);
        let accessor = IntervalAccessor::activated(Arc::new(store.clone()));
        assert_eq!(accessor.ready().await.unwrap().minutes(), 10);

        let mut updates = accessor.watch();
        store.context().set(AUTO_LOCK_KEY, json!(25)).await.unwrap();
        wait_for_value(&mut updates, 25).await;
        assert_eq!(accessor.current_value().map(AutoLockInterval::minutes), Some(25));
    }

    #[tokio::test]
    async fn unrelated_keys_do_not_trigger_reads() {
        let store = RecordingStore::new();
        let accessor = IntervalAccessor::activated(Arc::new(store.clone()));
        accessor.ready().await.unwrap();
        let reads = store.read_count();

        store.set("theme", json!("dark")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.read_count(), reads);
    }

    #[tokio::test]
    async fn notification_during_initial_read_schedules_one_reload() {
        let store = RecordingStore::new();
        store.pause_reads();
        let accessor = IntervalAccessor::activated(Arc::new(store.clone()));
        store.wait_for_pending_read().await;

        store.inner().context().set(AUTO_LOCK_KEY, json!(20)).await.unwrap();
        store.inner().context().set(AUTO_LOCK_KEY, json!(21)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        store.resume_reads();

        let mut updates = accessor.watch();
        wait_for_value(&mut updates, 21).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.read_count(), 2);
    }

    #[tokio::test]
    async fn deactivated_accessor_ignores_notifications_and_late_reads() {
        let store = RecordingStore::new();
        let mut accessor = IntervalAccessor::activated(Arc::new(store.clone()));
        accessor.ready().await.unwrap();

        store.pause_reads();
        store.inner().context().set(AUTO_LOCK_KEY, json!(8)).await.unwrap();
        store.wait_for_pending_read().await;
        accessor.deactivate();
        assert!(!accessor.is_active());
        store.resume_reads();

        let reads = store.read_count();
        store.inner().context().set(AUTO_LOCK_KEY, json!(9)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(accessor.state(), AccessorState::Deactivated);
        assert_eq!(store.read_count(), reads);
    }

    #[tokio::test]
    async fn read_failure_without_value_marks_failed() {
        let store = RecordingStore::new();
        store.fail_reads(true);
        let accessor = IntervalAccessor::activated(Arc::new(store.clone()));

        let err = accessor.ready().await.unwrap_err();
        assert!(matches!(err, IntervalError::Unavailable { .. }));
        assert!(accessor.last_error().is_some());
    }

    #[tokio::test]
    async fn reload_failure_keeps_last_good_value() {
        let store = RecordingStore::new();
        let accessor = IntervalAccessor::activated(Arc::new(store.clone()));
        accessor.ready().await.unwrap();

        store.fail_reads(true);
        store.inner().context().set(AUTO_LOCK_KEY, json!(12)).await.unwrap();
        timeout(WAIT, async {
            while accessor.last_error().is_none() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("reload failure recorded");

        assert_eq!(
            accessor.current_value().map(AutoLockInterval::minutes),
            Some(DEFAULT_MINUTES)
        );
    }

    #[tokio::test]
    async fn corrupt_stored_value_is_reported() {
        let store = MemoryStore::with_entries([(AUTO_LOCK_KEY, json!("soon"))]);
        let err = load_interval(&store).await.unwrap_err();
        assert!(matches!(err, IntervalError::CorruptStoredValue { .. }));

        let accessor = IntervalAccessor::activated(Arc::new(store));
        let err = accessor.ready().await.unwrap_err();
        match err {
            IntervalError::Unavailable { detail } => {
                assert!(detail.contains("must be an integer"), "{detail}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn stored_load_distinguishes_unset_from_default_value() {
        let store = RecordingStore::new();
        assert_eq!(load_stored_interval(&store).await.unwrap(), None);
        assert_eq!(load_interval(&store).await.unwrap(), AutoLockInterval::DEFAULT);

        store.set(AUTO_LOCK_KEY, json!(DEFAULT_MINUTES)).await.unwrap();
        let reads = store.read_count();
        assert_eq!(
            load_stored_interval(&store).await.unwrap(),
            Some(AutoLockInterval::DEFAULT)
        );
        assert_eq!(store.read_count(), reads + 1);
    }

    #[tokio::test]
    async fn reactivation_reads_again() {
        let store = MemoryStore::new();
        let mut accessor = IntervalAccessor::activated(Arc::new(store.clone()));
        accessor.ready().await.unwrap();
        accessor.deactivate();

        store.set(AUTO_LOCK_KEY, json!(30)).await.unwrap();
        accessor.activate();
        assert_eq!(accessor.ready().await.unwrap().minutes(), 30);
    }
}
