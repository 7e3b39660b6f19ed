//! Derived projections over a task list.
//!
//! Nothing here is stored remotely. The filter is persisted locally together
//! with the task list; search terms and statistics are recomputed on demand.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::model::{Task, TaskStatus};

/// Status filter applied to the task list.
///
/// Any unrecognized value maps to [`TaskFilter::All`], both from callers and
/// from stored snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskFilter {
    #[default]
    All,
    Pending,
    Completed,
}

impl TaskFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }

    pub fn matches(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Pending => task.status == TaskStatus::Pending,
            Self::Completed => task.status == TaskStatus::Completed,
        }
    }
}

impl From<&str> for TaskFilter {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "completed" => Self::Completed,
            _ => Self::All,
        }
    }
}

impl From<String> for TaskFilter {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<TaskFilter> for String {
    fn from(filter: TaskFilter) -> Self {
        filter.as_str().to_string()
    }
}

impl fmt::Display for TaskFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter plus optional free-text search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub filter: TaskFilter,
    pub search: Option<String>,
}

impl TaskQuery {
    pub fn new(filter: TaskFilter) -> Self {
        Self {
            filter,
            search: None,
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Applies the filter, then the search, keeping input order.
    /// A blank search term matches everything.
    pub fn apply<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        let needle = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase);

        tasks
            .iter()
            .filter(|task| self.filter.matches(task))
            .filter(|task| match &needle {
                Some(needle) => task.matches_lowercase(needle),
                None => true,
            })
            .collect()
    }
}

/// Dashboard counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub overdue: usize,
}

impl TaskStats {
    pub fn compute(tasks: &[Task], today: NaiveDate) -> Self {
        tasks.iter().fold(Self::default(), |mut stats, task| {
            stats.total += 1;
            match task.status {
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Pending => stats.pending += 1,
            }
            if task.is_overdue(today) {
                stats.overdue += 1;
            }
            stats
        })
    }
}
