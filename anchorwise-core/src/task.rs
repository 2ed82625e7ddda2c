//! Task record as the core sees it.
//!
//! Tasks are created by the upstream planning pipeline and owned by the task
//! store. The core only reads them and updates the schedule fields
//! (`scheduled_at`, `scheduled_text`, `was_rescheduled`, `reminder_sent`).

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::time::{EventTime, parse_timestamp};

/// Duration assumed when a task carries no estimate.
pub const DEFAULT_TASK_MINUTES: i64 = 15;

/// Anchor assumed when a task carries none.
pub const DEFAULT_ANCHOR: &str = "After Lunch";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Skipped,
    Missed,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub goal_id: Option<String>,
    #[serde(default)]
    pub task_name: Option<String>,

    /// Raw timestamp exactly as stored; may be malformed.
    #[serde(default)]
    pub scheduled_at: Option<String>,
    /// Anchor label shown to the user.
    #[serde(default)]
    pub scheduled_text: Option<String>,
    #[serde(default)]
    pub assigned_anchor: Option<String>,
    /// Minutes.
    #[serde(default)]
    pub estimated_minutes: Option<i64>,

    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub was_rescheduled: bool,
    #[serde(default)]
    pub reminder_sent: bool,
    #[serde(default)]
    pub completed_on_time: bool,
}

impl TaskRecord {
    pub fn new(id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.task_name = Some(name.into());
        self
    }

    pub fn with_goal(mut self, goal_id: impl Into<String>) -> Self {
        self.goal_id = Some(goal_id.into());
        self
    }

    pub fn with_scheduled_at(mut self, raw: impl Into<String>) -> Self {
        self.scheduled_at = Some(raw.into());
        self
    }

    pub fn with_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.assigned_anchor = Some(anchor.into());
        self
    }

    pub fn with_minutes(mut self, minutes: i64) -> Self {
        self.estimated_minutes = Some(minutes);
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn duration_minutes(&self) -> i64 {
        self.estimated_minutes.unwrap_or(DEFAULT_TASK_MINUTES)
    }

    pub fn anchor(&self) -> &str {
        self.assigned_anchor.as_deref().unwrap_or(DEFAULT_ANCHOR)
    }

    pub fn name(&self) -> &str {
        self.task_name.as_deref().unwrap_or("Unknown Task")
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Parsed `scheduled_at`, or `None` when absent or unparseable.
    pub fn scheduled_time(&self) -> Option<EventTime> {
        self.scheduled_at.as_deref().and_then(parse_timestamp)
    }

    /// `scheduled_at` as a UTC instant, floating values read in `tz`.
    pub fn scheduled_utc(&self, tz: Tz) -> Option<DateTime<Utc>> {
        self.scheduled_time().map(|t| t.to_utc(tz))
    }
}

/// Filter passed to [`crate::sources::TaskStore::query_tasks`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub task_id: Option<String>,
    pub exclude_status: Option<TaskStatus>,
}

impl TaskQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(task_id: impl Into<String>) -> Self {
        Self {
            task_id: Some(task_id.into()),
            exclude_status: None,
        }
    }

    pub fn not_completed() -> Self {
        Self {
            task_id: None,
            exclude_status: Some(TaskStatus::Completed),
        }
    }

    pub fn matches(&self, task: &TaskRecord) -> bool {
        if let Some(id) = &self.task_id {
            if &task.id != id {
                return false;
            }
        }
        if let Some(excluded) = self.exclude_status {
            if task.status == excluded {
                return false;
            }
        }
        true
    }
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub scheduled_at: Option<String>,
    pub scheduled_text: Option<String>,
    pub was_rescheduled: Option<bool>,
    pub reminder_sent: Option<bool>,
}

impl TaskUpdate {
    pub fn apply(&self, task: &mut TaskRecord) {
        if let Some(at) = &self.scheduled_at {
            task.scheduled_at = Some(at.clone());
        }
        if let Some(text) = &self.scheduled_text {
            task.scheduled_text = Some(text.clone());
        }
        if let Some(flag) = self.was_rescheduled {
            task.was_rescheduled = flag;
        }
        if let Some(flag) = self.reminder_sent {
            task.reminder_sent = flag;
        }
    }
}
