//! Task domain model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TasknestError};

pub const NAME_MIN_LEN: usize = 3;
pub const NAME_MAX_LEN: usize = 100;
pub const DESCRIPTION_MAX_LEN: usize = 500;

/// Completion state of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
}

impl TaskStatus {
    /// Pending becomes Completed and vice versa.
    pub fn toggled(self) -> Self {
        match self {
            Self::Pending => Self::Completed,
            Self::Completed => Self::Pending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Completed => "Completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TasknestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "completed" | "done" => Ok(Self::Completed),
            other => Err(TasknestError::validation(
                "status",
                format!("Unknown task status '{}'", other),
            )),
        }
    }
}

/// A task owned by exactly one user.
///
/// `id` is assigned by the remote store and is `None` only for a task that
/// never made it there. Missing fields in stored snapshots fall back to
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Task {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub deadline: NaiveDate,
    pub status: TaskStatus,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// True when this task carries the given remote id.
    pub fn has_id(&self, task_id: &str) -> bool {
        self.id.as_deref() == Some(task_id)
    }

    /// Overdue means the deadline is strictly before `today`, whatever the status.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.deadline < today
    }

    /// Case-insensitive substring match on name or description.
    /// `needle` must already be lowercase.
    pub(crate) fn matches_lowercase(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
    }
}

/// User input for a new task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub name: String,
    pub description: String,
    pub deadline: NaiveDate,
}

impl TaskDraft {
    pub fn new(name: impl Into<String>, description: impl Into<String>, deadline: NaiveDate) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            deadline,
        }
    }

    /// Returns a copy with name and description trimmed.
    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            deadline: self.deadline,
        }
    }

    /// Checks the task field rules against `today`.
    pub fn validate(&self, today: NaiveDate) -> Result<()> {
        validate_name(&self.name)?;
        validate_description(&self.description)?;
        validate_deadline(self.deadline, today)
    }

    /// Builds the stored record for this draft.
    pub fn into_task(self, id: impl Into<String>, owner_id: impl Into<String>, now: DateTime<Utc>) -> Task {
        Task {
            id: Some(id.into()),
            name: self.name,
            description: self.description,
            deadline: self.deadline,
            status: TaskStatus::Pending,
            user_id: owner_id.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A partial set of task fields to merge into an existing task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}

impl TaskUpdate {
    pub fn status_only(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.deadline.is_none()
            && self.status.is_none()
    }

    /// Returns a copy with provided text fields trimmed.
    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.as_ref().map(|n| n.trim().to_string()),
            description: self.description.as_ref().map(|d| d.trim().to_string()),
            deadline: self.deadline,
            status: self.status,
        }
    }

    /// Checks the rules for every field that is present.
    pub fn validate(&self, today: NaiveDate) -> Result<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        if let Some(deadline) = self.deadline {
            validate_deadline(deadline, today)?;
        }
        Ok(())
    }

    /// camelCase names of the fields this update touches.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.description.is_some() {
            fields.push("description");
        }
        if self.deadline.is_some() {
            fields.push("deadline");
        }
        if self.status.is_some() {
            fields.push("status");
        }
        fields
    }

    /// Merges the present fields into `task`. Timestamps are left alone.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(name) = &self.name {
            task.name = name.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(deadline) = self.deadline {
            task.deadline = deadline;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
    }
}

fn validate_name(name: &str) -> Result<()> {
    let len = name.trim().chars().count();
    if len == 0 {
        return Err(TasknestError::validation("name", "Task name is required"));
    }
    if len < NAME_MIN_LEN {
        return Err(TasknestError::validation(
            "name",
            format!("Task name must be at least {} characters", NAME_MIN_LEN),
        ));
    }
    if len > NAME_MAX_LEN {
        return Err(TasknestError::validation(
            "name",
            format!("Task name must be at most {} characters", NAME_MAX_LEN),
        ));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<()> {
    let len = description.trim().chars().count();
    if len == 0 {
        return Err(TasknestError::validation(
            "description",
            "Description is required",
        ));
    }
    if len > DESCRIPTION_MAX_LEN {
        return Err(TasknestError::validation(
            "description",
            format!("Description must be at most {} characters", DESCRIPTION_MAX_LEN),
        ));
    }
    Ok(())
}

fn validate_deadline(deadline: NaiveDate, today: NaiveDate) -> Result<()> {
    if deadline < today {
        return Err(TasknestError::validation(
            "deadline",
            "Deadline must be today or in the future",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_status_toggle_and_parse() {
        assert_eq!(TaskStatus::Pending.toggled(), TaskStatus::Completed);
        assert_eq!(TaskStatus::Completed.toggled(), TaskStatus::Pending);
        assert_eq!("completed".parse::<TaskStatus>().unwrap(), TaskStatus::Completed);
        assert_eq!(" Pending ".parse::<TaskStatus>().unwrap(), TaskStatus::Pending);
        assert!("archived".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_capitalized() {
        assert_eq!(
            serde_json::to_value(TaskStatus::Completed).unwrap(),
            serde_json::json!("Completed")
        );
    }

    #[test]
    fn test_draft_validation_rules() {
        let today = date("2030-01-01");
        let ok = TaskDraft::new("Buy milk", "2%", today);
        assert!(ok.validate(today).is_ok());

        let short = TaskDraft::new("ab", "desc", today);
        assert!(matches!(
            short.validate(today),
            Err(TasknestError::Validation { ref field, .. }) if field == "name"
        ));

        let long = TaskDraft::new("x".repeat(NAME_MAX_LEN + 1), "desc", today);
        assert!(long.validate(today).is_err());

        let exact = TaskDraft::new("x".repeat(NAME_MAX_LEN), "desc", today);
        assert!(exact.validate(today).is_ok());

        let blank_description = TaskDraft::new("Name", "   ", today);
        assert!(blank_description.validate(today).is_err());

        let long_description = TaskDraft::new("Name", "d".repeat(DESCRIPTION_MAX_LEN + 1), today);
        assert!(long_description.validate(today).is_err());

        let past = TaskDraft::new("Name", "desc", date("2029-12-31"));
        assert!(matches!(
            past.validate(today),
            Err(TasknestError::Validation { ref field, .. }) if field == "deadline"
        ));
    }

    #[test]
    fn test_draft_normalization_trims() {
        let draft = TaskDraft::new("  Buy milk ", " 2% \n", date("2030-01-01")).normalized();
        assert_eq!(draft.name, "Buy milk");
        assert_eq!(draft.description, "2%");
    }

    #[test]
    fn test_into_task_defaults_to_pending() {
        let now = Utc::now();
        let task = TaskDraft::new("Buy milk", "2%", date("2030-01-01")).into_task("t1", "u1", now);
        assert_eq!(task.id.as_deref(), Some("t1"));
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.user_id, "u1");
        assert_eq!(task.created_at, now);
        assert_eq!(task.updated_at, now);
    }

    #[test]
    fn test_update_merges_only_present_fields() {
        let mut task = TaskDraft::new("Buy milk", "2%", date("2030-01-01")).into_task("t1", "u1", Utc::now());
        let update = TaskUpdate {
            description: Some("whole".into()),
            status: Some(TaskStatus::Completed),
            ..TaskUpdate::default()
        };

        update.apply_to(&mut task);

        assert_eq!(task.name, "Buy milk");
        assert_eq!(task.description, "whole");
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(update.field_names(), vec!["description", "status"]);
    }

    #[test]
    fn test_update_validates_present_fields_only() {
        let today = date("2030-01-01");
        assert!(TaskUpdate::status_only(TaskStatus::Completed).validate(today).is_ok());
        let bad = TaskUpdate {
            name: Some("no".into()),
            ..TaskUpdate::default()
        };
        assert!(bad.validate(today).is_err());
        assert!(TaskUpdate::default().is_empty());
    }

    #[test]
    fn test_task_snapshot_tolerates_legacy_fields() {
        let task: Task = serde_json::from_value(serde_json::json!({
            "name": "Old",
            "deadline": "2030-01-01",
            "status": "Completed"
        }))
        .unwrap();
        assert_eq!(task.id, None);
        assert_eq!(task.description, "");
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.deadline, date("2030-01-01"));
    }

    #[test]
    fn test_overdue_ignores_status() {
        let mut task = Task {
            deadline: date("2030-01-01"),
            ..Task::default()
        };
        assert!(task.is_overdue(date("2030-01-02")));
        assert!(!task.is_overdue(date("2030-01-01")));
        task.status = TaskStatus::Completed;
        assert!(task.is_overdue(date("2030-01-02")));
    }
}
