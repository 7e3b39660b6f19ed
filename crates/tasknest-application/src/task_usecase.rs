//! Task use cases.
//!
//! Input is validated before any remote call. The local store is only
//! touched after the gateway confirmed the change, so a failed call leaves
//! [`TaskState`] as it was.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tasknest_core::error::{Result, TasknestError};
use tasknest_core::session::AuthState;
use tasknest_core::task::{
    Task, TaskDraft, TaskFilter, TaskGateway, TaskQuery, TaskState, TaskStats, TaskStatus,
    TaskUpdate,
};
use tokio::sync::RwLock;

use crate::outcome::ActionOutcome;

type Today = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

pub struct TaskUseCase {
    gateway: Arc<dyn TaskGateway>,
    auth: Arc<RwLock<AuthState>>,
    tasks: Arc<RwLock<TaskState>>,
    today: Today,
}

impl TaskUseCase {
    pub fn new(
        gateway: Arc<dyn TaskGateway>,
        auth: Arc<RwLock<AuthState>>,
        tasks: Arc<RwLock<TaskState>>,
    ) -> Self {
        Self {
            gateway,
            auth,
            tasks,
            today: Arc::new(|| Local::now().date_naive()),
        }
    }

    /// Replaces the clock used for deadline checks and overdue counts.
    pub fn with_today(mut self, today: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.today = Arc::new(today);
        self
    }

    pub fn today(&self) -> NaiveDate {
        (self.today)()
    }

    async fn owner_id(&self) -> Result<String> {
        self.auth
            .read()
            .await
            .user_id()
            .map(str::to_string)
            .ok_or(TasknestError::NotAuthenticated)
    }

    /// Creates a task for the signed-in user and appends it locally.
    pub async fn add_task(&self, draft: TaskDraft) -> ActionOutcome<Task> {
        let result: Result<Task> = async {
            let owner_id = self.owner_id().await?;
            let draft = draft.normalized();
            draft.validate(self.today())?;

            let task = self.gateway.create(&draft, &owner_id).await?;
            self.tasks.write().await.add_task(task.clone());
            tracing::info!("Added task {:?}", task.id);
            Ok(task)
        }
        .await;
        Self::report("add task", result)
    }

    /// Changes any subset of a task's fields.
    pub async fn edit_task(&self, task_id: &str, update: TaskUpdate) -> ActionOutcome<()> {
        let result: Result<()> = async {
            self.owner_id().await?;
            let update = update.normalized();
            if update.is_empty() {
                return Err(TasknestError::validation("task", "Nothing to update"));
            }
            update.validate(self.today())?;

            self.gateway.update(task_id, &update).await?;
            self.tasks.write().await.update_task(task_id, &update);
            Ok(())
        }
        .await;
        Self::report("edit task", result)
    }

    pub async fn set_status(&self, task_id: &str, status: TaskStatus) -> ActionOutcome<()> {
        let result = self.apply_status(task_id, status).await;
        Self::report("update status", result)
    }

    /// Flips Pending and Completed for a task held locally.
    pub async fn toggle_status(&self, task_id: &str) -> ActionOutcome<TaskStatus> {
        let result: Result<TaskStatus> = async {
            let current = self
                .tasks
                .read()
                .await
                .task_by_id(task_id)
                .map(|task| task.status)
                .ok_or_else(|| {
                    TasknestError::validation("task", format!("Task '{}' is not in the list", task_id))
                })?;
            let next = current.toggled();
            self.apply_status(task_id, next).await?;
            Ok(next)
        }
        .await;
        Self::report("toggle status", result)
    }

    async fn apply_status(&self, task_id: &str, status: TaskStatus) -> Result<()> {
        self.owner_id().await?;
        self.gateway.update_status(task_id, status).await?;
        self.tasks
            .write()
            .await
            .update_task(task_id, &TaskUpdate::status_only(status));
        Ok(())
    }

    pub async fn delete_task(&self, task_id: &str) -> ActionOutcome<()> {
        let result: Result<()> = async {
            self.owner_id().await?;
            self.gateway.delete(task_id).await?;
            self.tasks.write().await.delete_task(task_id);
            Ok(())
        }
        .await;
        Self::report("delete task", result)
    }

    /// Replaces the local list with the remote one. Returns the task count.
    ///
    /// Tasks held only locally are discarded.
    pub async fn sync(&self) -> ActionOutcome<usize> {
        let result: Result<usize> = async {
            let owner_id = self.owner_id().await?;
            let count = self.gateway.sync(&owner_id, &self.tasks).await?;
            tracing::info!("Synced {} task(s) for {}", count, owner_id);
            Ok(count)
        }
        .await;
        Self::report("sync", result)
    }

    pub async fn set_filter(&self, filter: impl Into<TaskFilter>) {
        self.tasks.write().await.set_filter(filter);
    }

    pub async fn filter(&self) -> TaskFilter {
        self.tasks.read().await.filter()
    }

    /// Tasks under the stored filter, narrowed by `search` when given.
    pub async fn visible_tasks(&self, search: Option<&str>) -> Vec<Task> {
        let tasks = self.tasks.read().await;
        let mut query = TaskQuery::new(tasks.filter());
        if let Some(term) = search {
            query = query.with_search(term);
        }
        query.apply(tasks.tasks()).into_iter().cloned().collect()
    }

    pub async fn stats(&self) -> TaskStats {
        self.tasks.read().await.stats(self.today())
    }

    fn report<T>(action: &str, result: Result<T>) -> ActionOutcome<T> {
        if let Err(e) = &result {
            tracing::warn!("{} failed: {}", action, e);
        }
        result.into()
    }
}
