//! Core domain types for the task manager.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Task lifecycle status.
///
/// The wire codes (`nao_iniciado`, `em_andamento`, `concluida`) are the ones
/// existing CSV files and consumer scripts already use, so they are kept
/// verbatim in storage, JSON and CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "nao_iniciado")]
    NotStarted,
    #[serde(rename = "em_andamento")]
    InProgress,
    #[serde(rename = "concluida")]
    Done,
}

impl TaskStatus {
    /// Machine-readable status code.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "nao_iniciado",
            TaskStatus::InProgress => "em_andamento",
            TaskStatus::Done => "concluida",
        }
    }

    /// Parse a status code. Returns `None` for anything that is not one of
    /// the three valid codes.
    pub fn from_code(s: &str) -> Option<Self> {
        match s {
            "nao_iniciado" => Some(TaskStatus::NotStarted),
            "em_andamento" => Some(TaskStatus::InProgress),
            "concluida" => Some(TaskStatus::Done),
            _ => None,
        }
    }

    /// Human-readable label shown in the UI.
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "Não Iniciado",
            TaskStatus::InProgress => "Em Andamento",
            TaskStatus::Done => "Concluída",
        }
    }
}

/// A registered account. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_admin: bool,
    pub created_at: i64,
}

/// An authenticated session backing bearer-token auth.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub created_at: i64,
    pub expires_at: i64,
}

/// User-scoped task grouping with a display color.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub user_id: i64,
    pub created_at: i64,
}

/// A user-owned unit of work with optional dates, category and checklist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub status: TaskStatus,
    pub is_current_focus: bool,
    pub archived: bool,
    pub user_id: i64,
    pub category_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One ordered checklist item belonging to a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub id: i64,
    pub description: String,
    pub completed: bool,
    pub position: i32,
    pub task_id: i64,
}

/// A markdown note in the personal knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeNote {
    pub id: i64,
    pub title: String,
    pub content_markdown: String,
    pub user_id: i64,
}

/// A task together with its checklist and linked note ids.
#[derive(Debug, Clone, Serialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    pub steps: Vec<Step>,
    pub note_ids: Vec<i64>,
    pub progress: TaskProgress,
}

/// Checklist completion summary for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskProgress {
    pub total: usize,
    pub done: usize,
    pub percent: i32,
}

impl TaskProgress {
    /// Compute progress from a set of step completion flags.
    pub fn from_flags(flags: &[bool]) -> Self {
        let total = flags.len();
        if total == 0 {
            return Self {
                total: 0,
                done: 0,
                percent: 0,
            };
        }
        let done = flags.iter().filter(|&&c| c).count();
        Self {
            total,
            done,
            percent: ((done * 100) / total) as i32,
        }
    }
}

/// Result of toggling one checklist step.
#[derive(Debug, Clone, Serialize)]
pub struct ToggleOutcome {
    pub step_completed: bool,
    pub task_status: TaskStatus,
    pub task_id: i64,
}

/// Input for creating or replacing a task.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub is_current_focus: bool,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub steps: Vec<StepInput>,
    #[serde(default)]
    pub note_ids: Vec<i64>,
}

/// One checklist entry in a [`TaskInput`].
#[derive(Debug, Clone, Deserialize)]
pub struct StepInput {
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

/// Counters and task lists for the dashboard view. Archived tasks are
/// excluded everywhere.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total: i64,
    pub due_today: Vec<TaskDetail>,
    pub focus: Vec<TaskDetail>,
    pub overdue: Vec<TaskDetail>,
    pub done: Vec<TaskDetail>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_round_trip() {
        for status in [
            TaskStatus::NotStarted,
            TaskStatus::InProgress,
            TaskStatus::Done,
        ] {
            assert_eq!(TaskStatus::from_code(status.as_str()), Some(status));
        }
    }

    #[test]
    fn invalid_status_code_is_rejected() {
        assert_eq!(TaskStatus::from_code("done"), None);
        assert_eq!(TaskStatus::from_code(""), None);
        assert_eq!(TaskStatus::from_code("Concluida"), None);
    }

    #[test]
    fn status_serializes_as_wire_code() {
        let json = serde_json::to_string(&TaskStatus::Done).unwrap();
        assert_eq!(json, "\"concluida\"");
    }

    #[test]
    fn progress_empty_checklist() {
        let p = TaskProgress::from_flags(&[]);
        assert_eq!(p.total, 0);
        assert_eq!(p.done, 0);
        assert_eq!(p.percent, 0);
    }

    #[test]
    fn progress_partial_checklist() {
        let p = TaskProgress::from_flags(&[true, false]);
        assert_eq!(p.total, 2);
        assert_eq!(p.done, 1);
        assert_eq!(p.percent, 50);
    }

    #[test]
    fn progress_truncates_percent() {
        let p = TaskProgress::from_flags(&[true, false, false]);
        assert_eq!(p.percent, 33);
    }
}
