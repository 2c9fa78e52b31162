//! JSON document store persisted to a single file.
//!
//! # Design
//! - The whole store is one JSON object; each `set` rewrites it through a
//!   uniquely named temporary sibling that is renamed into place.
//! - `get` always reads from disk so writers in other processes are visible.
//! - Changes made by other processes are discovered by polling
//!   ([`FileStore::watch_external`]) and published on the local change bus.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::fs;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::change::{ChangeBus, ChangeScope, ChangeStream};
use crate::error::{StoreError, StoreResult};
use crate::store::KeyValueStore;

type Document = Map<String, Value>;

/// File-backed store holding a single JSON object.
pub struct FileStore {
    path: PathBuf,
    bus: ChangeBus,
    origin: Uuid,
    quota_bytes: Option<usize>,
    // Serialises writers in this process and holds the last document seen on disk.
    snapshot: Mutex<Document>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or an
    /// existing document cannot be read or parsed.
    #[instrument(name = "file_store.open", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::io("document.create_dir", parent, source))?;
        }

        let snapshot = load_document(&path).await?;
        info!(keys = snapshot.len(), "file store opened");
        Ok(Self {
            path,
            bus: ChangeBus::new(),
            origin: Uuid::new_v4(),
            quota_bytes: None,
            snapshot: Mutex::new(snapshot),
        })
    }

    /// Reject writes whose serialised document would exceed `quota_bytes`.
    #[must_use]
    pub fn with_quota_bytes(mut self, quota_bytes: usize) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    /// Location of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Origin identifier stamped on changes made through this handle.
    #[must_use]
    pub const fn origin(&self) -> Uuid {
        self.origin
    }

    /// Re-read the document and publish a change for every key that differs
    /// from the last snapshot. Returns the changed keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or parsed.
    pub async fn reload(&self) -> StoreResult<Vec<String>> {
        let current = load_document(&self.path).await?;
        let mut snapshot = self.snapshot.lock().await;
        let changed = diff_keys(&snapshot, &current);
        *snapshot = current;
        drop(snapshot);

        self.publish_external(&changed);
        Ok(changed)
    }

    fn publish_external(&self, keys: &[String]) {
        for key in keys {
            let id = self.bus.publish(Uuid::nil(), ChangeScope::Key(key.clone()));
            debug!(key = %key, change_id = id, "external change detected");
        }
    }

    /// Poll the document every `poll_interval` for changes made by other
    /// processes. Polling stops when the returned guard is dropped.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime or when `poll_interval` is
    /// zero.
    #[must_use]
    pub fn watch_external(self: &Arc<Self>, poll_interval: Duration) -> ExternalWatch {
        let store = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut ticker = interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(err) = store.reload().await {
                    warn!(error = %err, kind = err.kind(), "failed to poll file store");
                }
            }
        });
        ExternalWatch { task }
    }

    async fn persist(&self, key: &str, document: &Document) -> StoreResult<()> {
        let serialised = serde_json::to_vec_pretty(document)
            .map_err(|source| StoreError::json("document.serialize", Some(self.path.clone()), source))?;

        if let Some(quota) = self.quota_bytes
            && serialised.len() > quota
        {
            return Err(StoreError::Rejected {
                operation: "set",
                key: key.to_string(),
                reason: "quota_exceeded",
            });
        }

        let staging = staging_path(&self.path);
        if let Err(source) = fs::write(&staging, &serialised).await {
            let _ = fs::remove_file(&staging).await;
            return Err(StoreError::io("document.write", staging, source));
        }
        if let Err(source) = fs::rename(&staging, &self.path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(StoreError::io("document.rename", &self.path, source));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let mut document = load_document(&self.path).await?;
        Ok(document.remove(key))
    }

    #[instrument(name = "file_store.set", skip(self, value))]
    async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        let mut snapshot = self.snapshot.lock().await;
        let mut document = load_document(&self.path).await?;
        // Keys other writers changed since the last poll are published here,
        // since the snapshot is about to move past them.
        let mut external = diff_keys(&snapshot, &document);

        if document.get(key) == Some(&value) {
            *snapshot = document;
            drop(snapshot);
            self.publish_external(&external);
            return Ok(());
        }

        document.insert(key.to_string(), value);
        self.persist(key, &document).await?;
        *snapshot = document;
        drop(snapshot);

        external.retain(|changed| changed != key);
        self.publish_external(&external);
        let id = self.bus.publish(self.origin, ChangeScope::Key(key.to_string()));
        debug!(change_id = id, "file store value changed");
        Ok(())
    }

    fn changes(&self) -> ChangeStream {
        self.bus.subscribe()
    }
}

/// Guard for the polling task started by [`FileStore::watch_external`].
pub struct ExternalWatch {
    task: JoinHandle<()>,
}

impl Drop for ExternalWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn load_document(path: &Path) -> StoreResult<Document> {
    let raw = match fs::read(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Document::new()),
        Err(source) => return Err(StoreError::io("document.read", path, source)),
    };
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Document::new());
    }

    match serde_json::from_slice(&raw)
        .map_err(|source| StoreError::json("document.parse", Some(path.to_path_buf()), source))?
    {
        Value::Object(document) => Ok(document),
        _ => Err(StoreError::InvalidDocument {
            path: path.to_path_buf(),
            reason: "root_not_object",
        }),
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "store".into(), |name| name.to_string_lossy());
    path.with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4().simple()))
}

fn diff_keys(before: &Document, after: &Document) -> Vec<String> {
    let mut changed: Vec<String> = after
        .iter()
        .filter(|(key, value)| before.get(*key) != Some(*value))
        .map(|(key, _)| key.clone())
        .collect();
    changed.extend(
        before
            .keys()
            .filter(|key| !after.contains_key(*key))
            .cloned(),
    );
    changed.sort();
    changed
}
