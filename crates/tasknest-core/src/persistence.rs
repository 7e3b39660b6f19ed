//! Snapshot persistence for the client-side stores.
//!
//! Each store owns a [`PersistHook`] and calls it after every mutation. The
//! hook writes a flat, versionless JSON snapshot under a fixed key through a
//! [`SnapshotStore`]. Saving is best-effort: a failed write is logged and
//! otherwise indistinguishable from success.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;

/// Storage key for the session snapshot.
pub const AUTH_SNAPSHOT_KEY: &str = "auth-storage";

/// Storage key for the task list + filter snapshot.
pub const TASK_SNAPSHOT_KEY: &str = "task-storage";

/// Durable key/value storage for store snapshots.
///
/// Implementations are synchronous: stores persist inline with the mutation.
pub trait SnapshotStore: Send + Sync {
    /// Loads the snapshot stored under `key`, or `None` when nothing was saved.
    fn load(&self, key: &str) -> Result<Option<serde_json::Value>>;

    /// Replaces the snapshot stored under `key`.
    fn save(&self, key: &str, snapshot: &serde_json::Value) -> Result<()>;

    /// Removes the snapshot stored under `key`. Missing keys are not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Save-on-mutation hook owned by a store.
///
/// A hook without a backing store does nothing, which is what tests and
/// purely in-memory setups use.
#[derive(Clone)]
pub struct PersistHook {
    key: &'static str,
    store: Option<Arc<dyn SnapshotStore>>,
}

impl PersistHook {
    /// Creates a hook that persists under `key` into `store`.
    pub fn new(key: &'static str, store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            key,
            store: Some(store),
        }
    }

    /// Creates a hook that never persists anything.
    pub fn detached(key: &'static str) -> Self {
        Self { key, store: None }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Loads the last snapshot, falling back to `T::default()` when the
    /// snapshot is missing or unreadable.
    ///
    /// Field-level tolerance for legacy snapshots is expected to come from
    /// `#[serde(default)]` on `T`.
    pub fn restore<T>(&self) -> T
    where
        T: DeserializeOwned + Default,
    {
        let Some(store) = &self.store else {
            return T::default();
        };

        match store.load(self.key) {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!("Ignoring unreadable snapshot '{}': {}", self.key, e);
                    T::default()
                }
            },
            Ok(None) => T::default(),
            Err(e) => {
                tracing::warn!("Failed to load snapshot '{}': {}", self.key, e);
                T::default()
            }
        }
    }

    /// Removes the stored snapshot so the next restore starts from
    /// `T::default()`. Failures are logged and swallowed.
    pub fn clear(&self) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.remove(self.key) {
            tracing::warn!("Failed to remove snapshot '{}': {}", self.key, e);
        }
    }

    /// Writes `snapshot`. Failures are logged and swallowed.
    pub fn persist<T>(&self, snapshot: &T)
    where
        T: Serialize,
    {
        let Some(store) = &self.store else {
            return;
        };

        let result = serde_json::to_value(snapshot)
            .map_err(Into::into)
            .and_then(|value| store.save(self.key, &value));

        if let Err(e) = result {
            tracing::warn!("Failed to persist snapshot '{}': {}", self.key, e);
        }
    }
}

impl fmt::Debug for PersistHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistHook")
            .field("key", &self.key)
            .field("attached", &self.store.is_some())
            .finish()
    }
}
