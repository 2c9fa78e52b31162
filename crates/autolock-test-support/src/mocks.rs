//! Store doubles that count, fail, and hold operations on demand.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use autolock_store::{ChangeStream, KeyValueStore, MemoryStore, StoreError, StoreResult};
use serde_json::Value;
use tokio::sync::{Notify, watch};

/// Reason reported by injected failures.
pub const INJECTED_FAILURE: &str = "injected_failure";

/// [`MemoryStore`] wrapper that records traffic and can inject failures or
/// hold reads and writes until released.
///
/// Counters include every attempted call, even ones that later fail or stay
/// held. Clones share counters, switches, and data.
#[derive(Clone, Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    recorder: Arc<Recorder>,
}

#[derive(Default)]
struct Recorder {
    reads: AtomicUsize,
    writes: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    read_gate: Gate,
    write_gate: Gate,
}

impl RecordingStore {
    /// Empty store with all operations passing straight through.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing memory store.
    #[must_use]
    pub fn wrapping(inner: MemoryStore) -> Self {
        Self {
            inner,
            recorder: Arc::default(),
        }
    }

    /// Underlying store, bypassing counters and switches.
    #[must_use]
    pub const fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    /// Number of `get` calls issued so far.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.recorder.reads.load(Ordering::SeqCst)
    }

    /// Number of `set` calls issued so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.recorder.writes.load(Ordering::SeqCst)
    }

    /// Make subsequent reads fail (or succeed again).
    pub fn fail_reads(&self, fail: bool) {
        self.recorder.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.recorder.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Hold reads until [`RecordingStore::resume_reads`].
    pub fn pause_reads(&self) {
        self.recorder.read_gate.close();
    }

    /// Release held reads.
    pub fn resume_reads(&self) {
        self.recorder.read_gate.open();
    }

    /// Hold writes until [`RecordingStore::resume_writes`].
    pub fn pause_writes(&self) {
        self.recorder.write_gate.close();
    }

    /// Release held writes.
    pub fn resume_writes(&self) {
        self.recorder.write_gate.open();
    }

    /// Wait until at least one read is being held.
    pub async fn wait_for_pending_read(&self) {
        self.recorder.read_gate.wait_for_waiter().await;
    }

    /// Wait until at least one write is being held.
    pub async fn wait_for_pending_write(&self) {
        self.recorder.write_gate.wait_for_waiter().await;
    }
}

#[async_trait]
impl KeyValueStore for RecordingStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        self.recorder.reads.fetch_add(1, Ordering::SeqCst);
        self.recorder.read_gate.pass().await;
        if self.recorder.fail_reads.load(Ordering::SeqCst) {
            return Err(injected("get", key));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        self.recorder.writes.fetch_add(1, Ordering::SeqCst);
        self.recorder.write_gate.pass().await;
        if self.recorder.fail_writes.load(Ordering::SeqCst) {
            return Err(injected("set", key));
        }
        self.inner.set(key, value).await
    }

    fn changes(&self) -> ChangeStream {
        self.inner.changes()
    }
}

fn injected(operation: &'static str, key: &str) -> StoreError {
    StoreError::Rejected {
        operation,
        key: key.to_string(),
        reason: INJECTED_FAILURE,
    }
}

/// Open/closed barrier that tracks how many callers it is holding.
struct Gate {
    open: watch::Sender<bool>,
    waiting: AtomicUsize,
    arrived: Notify,
}

impl Default for Gate {
    fn default() -> Self {
        let (open, _) = watch::channel(true);
        Self {
            open,
            waiting: AtomicUsize::new(0),
            arrived: Notify::new(),
        }
    }
}

impl Gate {
    fn close(&self) {
        self.open.send_replace(false);
    }

    fn open(&self) {
        self.open.send_replace(true);
    }

    async fn pass(&self) {
        let mut open = self.open.subscribe();
        if *open.borrow_and_update() {
            return;
        }
        let _held = HeldCaller::enter(self);
        let _ = open.wait_for(|open| *open).await;
    }

    async fn wait_for_waiter(&self) {
        loop {
            let arrived = self.arrived.notified();
            if self.waiting.load(Ordering::SeqCst) > 0 {
                return;
            }
            arrived.await;
        }
    }
}

/// Keeps the held-caller count accurate when a held future is dropped.
struct HeldCaller<'a> {
    gate: &'a Gate,
}

impl<'a> HeldCaller<'a> {
    fn enter(gate: &'a Gate) -> Self {
        gate.waiting.fetch_add(1, Ordering::SeqCst);
        gate.arrived.notify_waiters();
        Self { gate }
    }
}

impl Drop for HeldCaller<'_> {
    fn drop(&mut self) {
        self.gate.waiting.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn counts_calls_and_injects_failures() {
        let store = RecordingStore::new();
        store.set("k", json!(1)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!(1)));

        store.fail_writes(true);
        let err = store.set("k", json!(2)).await.unwrap_err();
        assert_eq!(err.kind(), "rejected");
        store.fail_reads(true);
        assert!(store.get("k").await.is_err());

        assert_eq!(store.write_count(), 2);
        assert_eq!(store.read_count(), 2);
        assert_eq!(store.inner().get("k").await.unwrap(), Some(json!(1)));
    }

    #[tokio::test]
    async fn paused_writes_wait_for_release() {
        let store = RecordingStore::new();
        store.pause_writes();

        let pending = {
            let store = store.clone();
            tokio::spawn(async move { store.set("k", json!(3)).await })
        };
        store.wait_for_pending_write().await;
        assert_eq!(store.inner().get("k").await.unwrap(), None);

        store.resume_writes();
        tokio::time::timeout(Duration::from_secs(2), pending)
            .await
            .expect("write released")
            .unwrap()
            .unwrap();
        assert_eq!(store.inner().get("k").await.unwrap(), Some(json!(3)));
    }
}
