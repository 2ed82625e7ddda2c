//! Reschedule coordinator + missed-task sweeper.
//!
//! Rescheduling is best-effort: failures are logged and reported as `false`
//! (or omitted from a sweep's result), never raised to the caller.

use chrono::Duration;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::RescheduleError;
use crate::scheduler::AnchorScheduler;
use crate::slot_finder::Slot;
use crate::task::{TaskQuery, TaskUpdate};
use crate::time::format_minute;

/// Tasks scheduled more than this many minutes ago are considered missed.
pub const OVERDUE_GRACE_MINUTES: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescheduleReason {
    #[default]
    UserRequested,
    AutoMissedDeadline,
}

impl RescheduleReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RescheduleReason::UserRequested => "user_requested",
            RescheduleReason::AutoMissedDeadline => "auto_missed_deadline",
        }
    }
}

impl std::fmt::Display for RescheduleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit record emitted for every successful reschedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RescheduleEvent {
    pub task_id: String,
    pub task_name: String,
    pub user_id: String,
    pub goal_id: Option<String>,
    /// Prior `scheduled_at` as stored, or "unknown".
    pub original_date: String,
    /// `YYYY-MM-DD HH:MM` in the user's timezone.
    pub new_date: String,
    pub reason: RescheduleReason,
}

/// What a successful reschedule did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RescheduleOutcome {
    pub slot: Slot,
    pub event: RescheduleEvent,
}

impl AnchorScheduler {
    /// Move a task to the next available slot for its anchor.
    ///
    /// Returns `true` once the new schedule is persisted. Audit emission
    /// failures do not affect the result.
    pub async fn reschedule_task(&self, task_id: &str, user_id: &str, reason: RescheduleReason, tz: Tz) -> bool {
        match self.try_reschedule_task(task_id, user_id, reason, tz).await {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(task_id, user_id, error = %err, "reschedule failed");
                false
            }
        }
    }

    /// Fallible form of [`Self::reschedule_task`].
    pub async fn try_reschedule_task(
        &self,
        task_id: &str,
        user_id: &str,
        reason: RescheduleReason,
        tz: Tz,
    ) -> Result<RescheduleOutcome, RescheduleError> {
        let store = self.tasks.as_ref().ok_or(RescheduleError::StoreUnavailable)?;

        let task = store
            .query_tasks(user_id, &TaskQuery::by_id(task_id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RescheduleError::TaskNotFound(task_id.to_string()))?;

        let slot = self
            .find_next_available_slot(user_id, task.anchor(), task.duration_minutes(), tz)
            .await;

        store
            .update_task(
                task_id,
                &TaskUpdate {
                    scheduled_at: Some(slot.scheduled_at.to_rfc3339()),
                    scheduled_text: Some(slot.scheduled_text.clone()),
                    was_rescheduled: Some(true),
                    reminder_sent: None,
                },
            )
            .await?;

        let original_date = task.scheduled_at.clone().unwrap_or_else(|| "unknown".to_string());
        let event = RescheduleEvent {
            task_id: task_id.to_string(),
            task_name: task.name().to_string(),
            user_id: user_id.to_string(),
            goal_id: task.goal_id.clone(),
            original_date,
            new_date: format_minute(&slot.scheduled_at),
            reason,
        };

        if let Some(audit) = &self.audit {
            if let Err(err) = audit.record_reschedule(&event).await {
                tracing::warn!(task_id, error = %err, "failed to record reschedule event");
            }
        }

        tracing::info!(
            task_id,
            from = %event.original_date,
            to = %slot.scheduled_at.to_rfc3339(),
            anchor = %slot.scheduled_text,
            reason = %reason,
            "rescheduled task"
        );

        Ok(RescheduleOutcome { slot, event })
    }

    /// Reschedule every non-completed task whose `scheduled_at` is more than
    /// an hour in the past. Returns the ids that were moved, in store order.
    ///
    /// Tasks are processed one at a time; a failure skips that task only.
    pub async fn detect_and_reschedule_missed(&self, user_id: &str, tz: Tz) -> Vec<String> {
        let Some(store) = &self.tasks else {
            return Vec::new();
        };

        let tasks = match store.query_tasks(user_id, &TaskQuery::all()).await {
            Ok(tasks) => tasks,
            Err(err) => {
                tracing::warn!(user_id, error = %err, "missed-task sweep could not load tasks");
                return Vec::new();
            }
        };

        let cutoff = self.now() - Duration::minutes(OVERDUE_GRACE_MINUTES);
        let mut rescheduled = Vec::new();

        for task in tasks.iter().filter(|t| !t.is_completed()) {
            let Some(scheduled) = task.scheduled_utc(tz) else {
                continue;
            };
            if scheduled >= cutoff {
                continue;
            }
            if self
                .reschedule_task(&task.id, user_id, RescheduleReason::AutoMissedDeadline, tz)
                .await
            {
                rescheduled.push(task.id.clone());
            }
        }

        if !rescheduled.is_empty() {
            tracing::info!(user_id, count = rescheduled.len(), "auto-rescheduled missed tasks");
        }
        rescheduled
    }
}
