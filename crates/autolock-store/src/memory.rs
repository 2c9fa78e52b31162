//! In-process store backend.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::change::{ChangeBus, ChangeScope, ChangeStream};
use crate::error::StoreResult;
use crate::store::KeyValueStore;

/// Map-backed store shared between handles.
///
/// Cloning yields a handle onto the same entries and change bus. Use
/// [`MemoryStore::context`] to obtain a handle that reports a distinct origin,
/// the way a second application context would.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, Value>>>,
    bus: ChangeBus,
    origin: Uuid,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            bus: ChangeBus::new(),
            origin: Uuid::new_v4(),
        }
    }

    /// Create a store seeded with `entries`. Seeding publishes no changes.
    #[must_use]
    pub fn with_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let store = Self::new();
        {
            let mut map = store
                .entries
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            map.extend(entries.into_iter().map(|(key, value)| (key.into(), value)));
        }
        store
    }

    /// Handle onto the same data with its own origin identifier.
    #[must_use]
    pub fn context(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            bus: self.bus.clone(),
            origin: Uuid::new_v4(),
        }
    }

    /// Origin identifier stamped on changes made through this handle.
    #[must_use]
    pub const fn origin(&self) -> Uuid {
        self.origin
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        let changed = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            if entries.get(key) == Some(&value) {
                false
            } else {
                entries.insert(key.to_string(), value);
                true
            }
        };

        if changed {
            let id = self.bus.publish(self.origin, ChangeScope::Key(key.to_string()));
            debug!(key, change_id = id, "memory store value changed");
        }
        Ok(())
    }

    fn changes(&self) -> ChangeStream {
        self.bus.subscribe()
    }
}
