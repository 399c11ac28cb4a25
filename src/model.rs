//! Board data model: tasks, columns, the archive, and the persisted state.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ColumnsConfig;
use crate::error::Error;

/// Current `schemaVersion` written by [`PersistedState`]
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Idle,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Idle => "idle",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }

    /// Status after one click on a task in this status.
    ///
    /// Only `idle` advances to `in_progress`; anything else lands on `done`,
    /// so clicking a done task is a repeat of `done`.
    pub fn after_click(self) -> TaskStatus {
        match self {
            TaskStatus::Idle => TaskStatus::InProgress,
            TaskStatus::InProgress | TaskStatus::Done => TaskStatus::Done,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "idle" => Ok(TaskStatus::Idle),
            "in_progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            _ => Err(Error::InvalidArgument(format!(
                "invalid status '{s}': must be idle, in_progress, or done"
            ))),
        }
    }
}

/// Bucket a column holds. `Medium` and `Long` carry no rules of their own;
/// only `Daily` is treated differently (fixed deadline, reset at rollover).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Short,
    Medium,
    Long,
    Daily,
}

impl ColumnType {
    pub const ALL: [ColumnType; 4] = [
        ColumnType::Short,
        ColumnType::Medium,
        ColumnType::Long,
        ColumnType::Daily,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Short => "short",
            ColumnType::Medium => "medium",
            ColumnType::Long => "long",
            ColumnType::Daily => "daily",
        }
    }

    pub fn is_daily(&self) -> bool {
        matches!(self, ColumnType::Daily)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "short" => Ok(ColumnType::Short),
            "medium" => Ok(ColumnType::Medium),
            "long" => Ok(ColumnType::Long),
            "daily" => Ok(ColumnType::Daily),
            _ => Err(Error::InvalidArgument(format!(
                "invalid column '{s}': must be short, medium, long, or daily"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub text: String,
    pub status: TaskStatus,
    pub deadline: DateTime<Utc>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ColumnType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskColumn {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ColumnType,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl TaskColumn {
    pub fn completed(&self) -> usize {
        self.tasks
            .iter()
            .filter(|task| task.status == TaskStatus::Done)
            .count()
    }
}

/// Archive entry captured at delete time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedTask {
    pub id: String,
    pub text: String,
    pub column_type: ColumnType,
    pub deleted_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
}

/// Columns every fresh board starts with, in display order.
pub fn default_columns(titles: &ColumnsConfig) -> Vec<TaskColumn> {
    [
        ("4", ColumnType::Daily),
        ("1", ColumnType::Short),
        ("2", ColumnType::Medium),
        ("3", ColumnType::Long),
    ]
    .into_iter()
    .map(|(id, kind)| TaskColumn {
        id: id.to_string(),
        title: titles.title_for(kind).to_string(),
        kind,
        tasks: Vec::new(),
    })
    .collect()
}

/// Everything the board persists, written as one blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub schema_version: u32,
    pub columns: Vec<TaskColumn>,
    #[serde(default)]
    pub deleted_tasks: Vec<DeletedTask>,
    /// Last computed deadline progress per live task id
    #[serde(default)]
    pub tasks_progress: BTreeMap<String, f64>,
    /// Start of each live task's deadline window
    #[serde(default)]
    pub created_at: BTreeMap<String, DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_check_date: Option<DateTime<Utc>>,
}

impl PersistedState {
    pub fn with_columns(columns: Vec<TaskColumn>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            columns,
            deleted_tasks: Vec::new(),
            tasks_progress: BTreeMap::new(),
            created_at: BTreeMap::new(),
            last_check_date: None,
        }
    }

    pub fn default_board(titles: &ColumnsConfig) -> Self {
        Self::with_columns(default_columns(titles))
    }

    pub fn all_tasks(&self) -> impl Iterator<Item = (&TaskColumn, &Task)> {
        self.columns
            .iter()
            .flat_map(|column| column.tasks.iter().map(move |task| (column, task)))
    }

    pub fn task_count(&self) -> usize {
        self.columns.iter().map(|column| column.tasks.len()).sum()
    }

    pub fn column(&self, column_id: &str) -> Option<&TaskColumn> {
        self.columns.iter().find(|column| column.id == column_id)
    }

    pub fn column_of_type(&self, kind: ColumnType) -> Option<&TaskColumn> {
        self.columns.iter().find(|column| column.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_walks_idle_in_progress_done() {
        let first = TaskStatus::Idle.after_click();
        let second = first.after_click();
        let third = second.after_click();
        assert_eq!(
            [first, second, third],
            [TaskStatus::InProgress, TaskStatus::Done, TaskStatus::Done]
        );
    }

    #[test]
    fn status_and_column_parse_loosely() {
        assert_eq!("In-Progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!(" DAILY ".parse::<ColumnType>().unwrap(), ColumnType::Daily);
        assert!("later".parse::<ColumnType>().is_err());
    }

    #[test]
    fn default_columns_follow_board_order() {
        let columns = default_columns(&ColumnsConfig::default());
        let order: Vec<_> = columns.iter().map(|c| (c.id.as_str(), c.kind)).collect();
        assert_eq!(
            order,
            vec![
                ("4", ColumnType::Daily),
                ("1", ColumnType::Short),
                ("2", ColumnType::Medium),
                ("3", ColumnType::Long),
            ]
        );
        assert!(columns.iter().all(|c| c.tasks.is_empty()));
    }

    #[test]
    fn task_serializes_with_wire_names() {
        let task = Task {
            id: "t1".to_string(),
            text: "Buy groceries".to_string(),
            status: TaskStatus::InProgress,
            deadline: "2026-10-17T12:00:00Z".parse().unwrap(),
            kind: Some(ColumnType::Short),
        };
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["status"], "in_progress");
        assert_eq!(value["type"], "short");

        let legacy: Task = serde_json::from_str(
            r#"{"id":"x","text":"hello","status":"idle","deadline":"2026-12-15T00:00:00.000Z"}"#,
        )
        .unwrap();
        assert_eq!(legacy.kind, None);
    }
}
