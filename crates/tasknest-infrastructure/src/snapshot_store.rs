//! [`SnapshotStore`] implementations.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use tasknest_core::error::{Result, TasknestError};
use tasknest_core::persistence::SnapshotStore;

use crate::storage::AtomicFile;

/// Stores each snapshot as `<key>.json` in one directory.
///
/// ```text
/// state_dir/
/// ├── auth-storage.json
/// └── task-storage.json
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileSnapshotStore {
    dir: PathBuf,
}

impl JsonFileSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file(&self, key: &str) -> Result<AtomicFile<serde_json::Value>> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(TasknestError::io(format!("Invalid snapshot key '{}'", key)));
        }
        Ok(AtomicFile::json(self.dir.join(format!("{}.json", key))))
    }
}

impl SnapshotStore for JsonFileSnapshotStore {
    fn load(&self, key: &str) -> Result<Option<serde_json::Value>> {
        self.file(key)?.load()
    }

    fn save(&self, key: &str, snapshot: &serde_json::Value) -> Result<()> {
        self.file(key)?.save(snapshot)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.file(key)?.remove()
    }
}

/// Keeps snapshots in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    entries: Mutex<HashMap<String, serde_json::Value>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn load(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, snapshot: &serde_json::Value) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), snapshot.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::TasknestPaths;
    use std::sync::Arc;
    use tasknest_core::persistence::{AUTH_SNAPSHOT_KEY, TASK_SNAPSHOT_KEY};
    use tasknest_core::session::AuthState;
    use tasknest_core::task::{Task, TaskFilter, TaskState, TaskStatus};
    use tempfile::TempDir;

    #[test]
    fn test_file_store_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileSnapshotStore::new(temp_dir.path());

        assert_eq!(store.load("auth-storage").unwrap(), None);

        let value = serde_json::json!({ "userId": "u1" });
        store.save("auth-storage", &value).unwrap();

        assert!(temp_dir.path().join("auth-storage.json").exists());
        assert_eq!(store.load("auth-storage").unwrap(), Some(value));

        store.remove("auth-storage").unwrap();
        assert_eq!(store.load("auth-storage").unwrap(), None);
    }

    #[test]
    fn test_file_store_rejects_path_like_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileSnapshotStore::new(temp_dir.path());
        assert!(store.save("../escape", &serde_json::json!({})).is_err());
        assert!(store.load("").is_err());
    }

    #[test]
    fn test_stores_survive_reload_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        let paths = TasknestPaths::new(Some(temp_dir.path()));
        let store: Arc<dyn SnapshotStore> =
            Arc::new(JsonFileSnapshotStore::new(paths.state_dir().unwrap()));

        {
            let mut auth = AuthState::restore(store.clone());
            auth.set_auth("u1", "u1@example.com", true);

            let mut tasks = TaskState::restore(store.clone());
            tasks.add_task(Task {
                id: Some("t1".into()),
                name: "Buy milk".into(),
                status: TaskStatus::Completed,
                user_id: "u1".into(),
                ..Task::default()
            });
            tasks.set_filter(TaskFilter::Completed);
        }

        let state_dir = temp_dir.path().join("state");
        assert!(state_dir.join(format!("{AUTH_SNAPSHOT_KEY}.json")).exists());
        assert!(state_dir.join(format!("{TASK_SNAPSHOT_KEY}.json")).exists());

        let auth = AuthState::restore(store.clone());
        assert_eq!(auth.user_id(), Some("u1"));
        assert!(auth.is_email_verified());

        let tasks = TaskState::restore(store);
        assert_eq!(tasks.filter(), TaskFilter::Completed);
        assert_eq!(tasks.filtered_tasks().len(), 1);
    }

    #[test]
    fn test_corrupt_snapshot_restores_defaults() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("auth-storage.json"), "{ nope").unwrap();
        let store: Arc<dyn SnapshotStore> = Arc::new(JsonFileSnapshotStore::new(temp_dir.path()));

        let auth = AuthState::restore(store);
        assert!(!auth.is_authenticated());
    }

    #[test]
    fn test_in_memory_store() {
        let store = InMemorySnapshotStore::new();
        store.save("b", &serde_json::json!(2)).unwrap();
        store.save("a", &serde_json::json!(1)).unwrap();
        store.remove("a").unwrap();
        assert_eq!(store.load("a").unwrap(), None);
        assert_eq!(store.load("b").unwrap(), Some(serde_json::json!(2)));
    }
}
