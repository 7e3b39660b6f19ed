use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tasknest_core::error::{Result, TasknestError};
use tasknest_core::task::{Task, TaskDraft, TaskGateway, TaskUpdate};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Inner {
    /// Insertion order.
    tasks: Vec<Task>,
    fail_next: Option<TasknestError>,
}

/// [`TaskGateway`] keeping tasks in memory.
#[derive(Debug, Default)]
pub struct InMemoryTaskGateway {
    inner: Mutex<Inner>,
    calls: AtomicUsize,
}

impl InMemoryTaskGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next gateway call fail with `err`.
    pub fn fail_next(&self, err: TasknestError) {
        self.lock().fail_next = Some(err);
    }

    /// Stores `task` as-is, as if written by another client.
    pub fn insert(&self, task: Task) {
        self.lock().tasks.push(task);
    }

    /// Every stored task regardless of owner, in insertion order.
    pub fn all(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    /// Number of gateway calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> Result<MutexGuard<'_, Inner>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.lock();
        match inner.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(inner),
        }
    }
}

fn missing(task_id: &str) -> TasknestError {
    TasknestError::storage(format!(
        "No document to update or delete: task '{}' does not exist",
        task_id
    ))
}

#[async_trait]
impl TaskGateway for InMemoryTaskGateway {
    async fn create(&self, draft: &TaskDraft, owner_id: &str) -> Result<Task> {
        let mut inner = self.begin()?;
        let id = Uuid::new_v4().simple().to_string();
        let task = draft.clone().into_task(id, owner_id, Utc::now());
        inner.tasks.push(task.clone());
        Ok(task)
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Task>> {
        let inner = self.begin()?;
        let mut owned: Vec<Task> = inner
            .tasks
            .iter()
            .rev()
            .filter(|task| task.user_id == owner_id)
            .cloned()
            .collect();
        // Stable: equal timestamps keep the latest insert first.
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn update(&self, task_id: &str, update: &TaskUpdate) -> Result<()> {
        let mut inner = self.begin()?;
        let task = inner
            .tasks
            .iter_mut()
            .find(|task| task.has_id(task_id))
            .ok_or_else(|| missing(task_id))?;
        update.apply_to(task);
        task.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, task_id: &str) -> Result<()> {
        let mut inner = self.begin()?;
        let position = inner
            .tasks
            .iter()
            .position(|task| task.has_id(task_id))
            .ok_or_else(|| missing(task_id))?;
        inner.tasks.remove(position);
        Ok(())
    }
}
