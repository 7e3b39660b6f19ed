//! Local task store.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::persistence::{PersistHook, SnapshotStore, TASK_SNAPSHOT_KEY};

use super::model::{Task, TaskUpdate};
use super::view::{TaskFilter, TaskQuery, TaskStats};

/// Persisted form of [`TaskState`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskSnapshot {
    pub tasks: Vec<Task>,
    pub filter: TaskFilter,
}

/// Client-side ordered task list plus the active filter.
///
/// Operations never fail: unknown ids are ignored and duplicates are not
/// checked. Every mutation is written through the store's [`PersistHook`].
#[derive(Debug)]
pub struct TaskState {
    snapshot: TaskSnapshot,
    hook: PersistHook,
}

impl TaskState {
    /// Creates an empty store that is not backed by durable storage.
    pub fn in_memory() -> Self {
        Self {
            snapshot: TaskSnapshot::default(),
            hook: PersistHook::detached(TASK_SNAPSHOT_KEY),
        }
    }

    /// Restores the last persisted task list and filter from `store`.
    pub fn restore(store: Arc<dyn SnapshotStore>) -> Self {
        let hook = PersistHook::new(TASK_SNAPSHOT_KEY, store);
        let snapshot: TaskSnapshot = hook.restore();
        Self { snapshot, hook }
    }

    /// Replaces the whole list.
    pub fn set_tasks(&mut self, tasks: Vec<Task>) {
        self.snapshot.tasks = tasks;
        self.save();
    }

    /// Appends `task` to the end of the list.
    pub fn add_task(&mut self, task: Task) {
        self.snapshot.tasks.push(task);
        self.save();
    }

    /// Merges `update` into every task carrying `task_id`. No-op when absent.
    pub fn update_task(&mut self, task_id: &str, update: &TaskUpdate) {
        self.snapshot
            .tasks
            .iter_mut()
            .filter(|task| task.has_id(task_id))
            .for_each(|task| update.apply_to(task));
        self.save();
    }

    /// Removes every task carrying `task_id`. No-op when absent.
    pub fn delete_task(&mut self, task_id: &str) {
        self.snapshot.tasks.retain(|task| !task.has_id(task_id));
        self.save();
    }

    /// Empties the list, keeping the filter.
    pub fn clear_tasks(&mut self) {
        self.snapshot.tasks.clear();
        self.save();
    }

    pub fn set_filter(&mut self, filter: impl Into<TaskFilter>) {
        self.snapshot.filter = filter.into();
        self.save();
    }

    pub fn filter(&self) -> TaskFilter {
        self.snapshot.filter
    }

    pub fn tasks(&self) -> &[Task] {
        &self.snapshot.tasks
    }

    pub fn task_by_id(&self, task_id: &str) -> Option<&Task> {
        self.snapshot.tasks.iter().find(|task| task.has_id(task_id))
    }

    /// Tasks matching the current filter, in insertion order.
    pub fn filtered_tasks(&self) -> Vec<&Task> {
        TaskQuery::new(self.snapshot.filter).apply(&self.snapshot.tasks)
    }

    /// Tasks matching the current filter and `term`.
    pub fn search(&self, term: &str) -> Vec<&Task> {
        TaskQuery::new(self.snapshot.filter)
            .with_search(term)
            .apply(&self.snapshot.tasks)
    }

    pub fn stats(&self, today: NaiveDate) -> TaskStats {
        TaskStats::compute(&self.snapshot.tasks, today)
    }

    pub fn snapshot(&self) -> &TaskSnapshot {
        &self.snapshot
    }

    fn save(&self) {
        self.hook.persist(&self.snapshot);
    }
}

impl Default for TaskState {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::test_support::MapSnapshotStore;
    use crate::task::TaskStatus;

    fn task(id: &str, status: TaskStatus) -> Task {
        Task {
            id: Some(id.to_string()),
            name: format!("Task {id}"),
            description: "desc".to_string(),
            status,
            user_id: "u1".to_string(),
            ..Task::default()
        }
    }

    fn ids(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().filter_map(|t| t.id.clone()).collect()
    }

    #[test]
    fn test_completed_filter_scenario() {
        let mut state = TaskState::in_memory();
        state.set_tasks(vec![
            task("1", TaskStatus::Pending),
            task("2", TaskStatus::Completed),
        ]);
        state.set_filter("completed");

        assert_eq!(ids(&state.filtered_tasks()), vec!["2"]);
    }

    #[test]
    fn test_all_filter_keeps_surviving_tasks_in_insertion_order() {
        let mut state = TaskState::in_memory();
        state.add_task(task("a", TaskStatus::Pending));
        state.add_task(task("b", TaskStatus::Pending));
        state.add_task(task("c", TaskStatus::Completed));
        state.update_task("b", &TaskUpdate::status_only(TaskStatus::Completed));
        state.delete_task("a");
        state.add_task(task("d", TaskStatus::Pending));

        assert_eq!(state.filter(), TaskFilter::All);
        assert_eq!(ids(&state.filtered_tasks()), vec!["b", "c", "d"]);
        assert_eq!(state.task_by_id("b").unwrap().status, TaskStatus::Completed);
    }

    #[test]
    fn test_add_does_not_reject_duplicates() {
        let mut state = TaskState::in_memory();
        state.add_task(task("1", TaskStatus::Pending));
        state.add_task(task("1", TaskStatus::Completed));
        assert_eq!(state.tasks().len(), 2);
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let mut state = TaskState::in_memory();
        state.add_task(task("1", TaskStatus::Pending));
        let before = state.snapshot().clone();

        state.update_task("missing", &TaskUpdate::status_only(TaskStatus::Completed));

        assert_eq!(state.snapshot(), &before);
    }

    #[test]
    fn test_delete_twice_is_noop() {
        let mut state = TaskState::in_memory();
        state.add_task(task("1", TaskStatus::Pending));
        state.add_task(task("2", TaskStatus::Pending));

        state.delete_task("1");
        let after_first = state.snapshot().clone();
        state.delete_task("1");

        assert_eq!(state.snapshot(), &after_first);
        assert_eq!(ids(&state.filtered_tasks()), vec!["2"]);
    }

    #[test]
    fn test_unknown_filter_behaves_like_all() {
        let mut state = TaskState::in_memory();
        state.set_tasks(vec![
            task("1", TaskStatus::Pending),
            task("2", TaskStatus::Completed),
        ]);
        state.set_filter("overdue");

        assert_eq!(state.filter(), TaskFilter::All);
        assert_eq!(state.filtered_tasks().len(), 2);
    }

    #[test]
    fn test_set_tasks_discards_local_only_tasks() {
        let mut state = TaskState::in_memory();
        state.add_task(Task {
            id: None,
            name: "Unsynced".into(),
            ..Task::default()
        });

        state.set_tasks(vec![task("r1", TaskStatus::Pending)]);

        assert_eq!(state.tasks().len(), 1);
        assert!(state.tasks().iter().all(|t| t.id.is_some()));
    }

    #[test]
    fn test_clear_keeps_filter() {
        let mut state = TaskState::in_memory();
        state.add_task(task("1", TaskStatus::Pending));
        state.set_filter(TaskFilter::Pending);
        state.clear_tasks();

        assert!(state.tasks().is_empty());
        assert_eq!(state.filter(), TaskFilter::Pending);
    }

    #[test]
    fn test_persisted_and_restored() {
        let store = Arc::new(MapSnapshotStore::default());
        {
            let mut state = TaskState::restore(store.clone());
            state.add_task(task("1", TaskStatus::Completed));
            state.set_filter("completed");
        }

        let saved = store.get(TASK_SNAPSHOT_KEY).unwrap();
        assert_eq!(saved["filter"], serde_json::json!("completed"));
        assert_eq!(saved["tasks"][0]["status"], serde_json::json!("Completed"));

        let restored = TaskState::restore(store);
        assert_eq!(restored.filter(), TaskFilter::Completed);
        assert_eq!(ids(&restored.filtered_tasks()), vec!["1"]);
    }

    #[test]
    fn test_search_respects_filter() {
        let mut state = TaskState::in_memory();
        state.set_tasks(vec![
            task("1", TaskStatus::Pending),
            task("2", TaskStatus::Completed),
        ]);
        state.set_filter("pending");

        assert_eq!(ids(&state.search("task")), vec!["1"]);
    }
}
