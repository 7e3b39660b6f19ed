//! Remote document store boundary for tasks.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;

use super::model::{Task, TaskDraft, TaskStatus, TaskUpdate};
use super::store::TaskState;

/// Contract for the remote task collection.
///
/// Every failure is reported as [`TasknestError::Storage`]. Ids are never
/// checked against local state before a call; a stale id simply fails
/// remotely.
///
/// [`TasknestError::Storage`]: crate::TasknestError::Storage
#[async_trait]
pub trait TaskGateway: Send + Sync {
    /// Stores a new task for `owner_id` and returns the stored record
    /// (remote id assigned, status `Pending`).
    async fn create(&self, draft: &TaskDraft, owner_id: &str) -> Result<Task>;

    /// Every task owned by `owner_id`, newest first by creation time.
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Task>>;

    /// Merges `update` into the stored task and refreshes `updatedAt`.
    async fn update(&self, task_id: &str, update: &TaskUpdate) -> Result<()>;

    /// Sets only the status of the stored task.
    async fn update_status(&self, task_id: &str, status: TaskStatus) -> Result<()> {
        self.update(task_id, &TaskUpdate::status_only(status)).await
    }

    /// Removes the stored task. Fails when it does not exist.
    async fn delete(&self, task_id: &str) -> Result<()>;

    /// Replaces `state`'s list with the remote list for `owner_id`.
    ///
    /// This is a full overwrite, not a merge: anything held only locally is
    /// gone afterwards. On failure `state` is left untouched. Returns the
    /// number of tasks now held.
    async fn sync(&self, owner_id: &str, state: &RwLock<TaskState>) -> Result<usize> {
        let tasks = self.list_by_owner(owner_id).await?;
        let count = tasks.len();
        state.write().await.set_tasks(tasks);
        Ok(count)
    }
}
