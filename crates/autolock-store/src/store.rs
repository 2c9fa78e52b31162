//! Capability interface implemented by every persistence backend.

use async_trait::async_trait;
use serde_json::Value;

use crate::change::{ChangeListener, ChangeStream, Subscription};
use crate::error::StoreResult;

#[async_trait]
/// Durable key/value storage with change notifications.
///
/// A `set` that resolves successfully is visible to any `get` issued after it.
/// Each key is updated atomically; a failed `set` leaves the previous value in
/// place.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Durably store `value` under `key`.
    async fn set(&self, key: &str, value: Value) -> StoreResult<()>;

    /// Open a raw stream of change notifications.
    fn changes(&self) -> ChangeStream;

    /// Read the value stored under `key`, falling back to `default` when unset.
    async fn get_or(&self, key: &str, default: Value) -> StoreResult<Value> {
        Ok(self.get(key).await?.unwrap_or(default))
    }

    /// Register `listener` for change notifications until the returned handle
    /// is released.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    fn subscribe(&self, listener: ChangeListener) -> Subscription {
        Subscription::spawn(self.changes(), listener)
    }
}
