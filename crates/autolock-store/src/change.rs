//! Change notifications shared by every store backend.
//!
//! Writers publish a [`StoreChange`] on a bounded `tokio::broadcast` channel.
//! A notification only says *that* something changed; consumers re-read the
//! store to learn the new value. When a receiver falls behind, the missed
//! notifications are coalesced into a single [`ChangeScope::All`] signal so no
//! change goes unobserved.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, Receiver, Sender};
use tokio::task::JoinHandle;
use tracing::warn;
use uuid::Uuid;

/// Identifier assigned to each published change.
pub type ChangeId = u64;

/// Default broadcast buffer size.
const DEFAULT_CHANGE_CAPACITY: usize = 64;

/// Callback invoked for every change delivered to a [`Subscription`].
pub type ChangeListener = Arc<dyn Fn(&StoreChange) + Send + Sync>;

/// Portion of the store affected by a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "key", rename_all = "snake_case")]
pub enum ChangeScope {
    /// A single key was written.
    Key(String),
    /// Any key may have changed; re-read everything of interest.
    All,
}

impl ChangeScope {
    /// Whether a consumer interested in `key` must re-read it.
    #[must_use]
    pub fn affects(&self, key: &str) -> bool {
        match self {
            Self::Key(changed) => changed == key,
            Self::All => true,
        }
    }
}

/// Notification that the store changed, without the new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreChange {
    /// Sequential identifier within the originating bus.
    pub id: ChangeId,
    /// Emission timestamp.
    pub timestamp: DateTime<Utc>,
    /// Identifier of the store handle that made the change.
    pub origin: Uuid,
    /// Keys affected by the change.
    pub scope: ChangeScope,
}

/// Broadcast bus carrying [`StoreChange`] notifications.
#[derive(Clone)]
pub struct ChangeBus {
    sender: Sender<StoreChange>,
    next_id: Arc<AtomicU64>,
}

impl ChangeBus {
    /// Construct a bus with the provided broadcast capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "change bus capacity must be positive");
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Construct a bus with the default buffer size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANGE_CAPACITY)
    }

    /// Publish a change and return its identifier.
    pub fn publish(&self, origin: Uuid, scope: ChangeScope) -> ChangeId {
        let change = StoreChange {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            timestamp: Utc::now(),
            origin,
            scope,
        };
        let id = change.id;
        // No receivers is not an error: nobody is listening yet.
        let _ = self.sender.send(change);
        id
    }

    /// Open a stream that observes every change published from now on.
    #[must_use]
    pub fn subscribe(&self) -> ChangeStream {
        ChangeStream {
            receiver: self.sender.subscribe(),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of a [`ChangeBus`].
pub struct ChangeStream {
    receiver: Receiver<StoreChange>,
    next_id: Arc<AtomicU64>,
}

impl ChangeStream {
    /// Receive the next change. Returns `None` once every publisher is gone.
    pub async fn next(&mut self) -> Option<StoreChange> {
        match self.receiver.recv().await {
            Ok(change) => Some(change),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!(missed, "change stream lagged; coalescing into a full resync");
                Some(StoreChange {
                    id: self.next_id.fetch_add(1, Ordering::Relaxed),
                    timestamp: Utc::now(),
                    origin: Uuid::nil(),
                    scope: ChangeScope::All,
                })
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}

/// Registration of a [`ChangeListener`].
///
/// Delivery stops as soon as the handle is cancelled or dropped, including for
/// a change that is already queued but not yet handed to the listener.
pub struct Subscription {
    active: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Forward every change from `stream` to `listener` on a background task.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    #[must_use]
    pub fn spawn(mut stream: ChangeStream, listener: ChangeListener) -> Self {
        let active = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&active);
        let task = tokio::spawn(async move {
            while let Some(change) = stream.next().await {
                if !flag.load(Ordering::Acquire) {
                    break;
                }
                listener(&change);
            }
        });
        Self { active, task }
    }

    /// Whether the listener may still be invoked.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire) && !self.task.is_finished()
    }

    /// Stop delivery. Equivalent to dropping the handle.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
        self.task.abort();
    }
}
