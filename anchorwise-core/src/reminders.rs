//! Due-reminder selection. Delivery is the caller's concern.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::scheduler::AnchorScheduler;
use crate::task::{TaskQuery, TaskRecord, TaskUpdate};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReminderIntent {
    pub task_id: String,
    pub user_id: String,
    pub task_name: String,
    pub scheduled_at_utc: DateTime<Utc>,
    /// Anchor label, or the local clock time when the task has none.
    pub when_text: String,
    pub dedupe_key: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReminderPolicy {
    /// Lead time before the task starts.
    pub minutes_before: i64,
    /// Half-width of the matching window around `now + minutes_before`.
    pub window_minutes: i64,
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self {
            minutes_before: 15,
            window_minutes: 2,
        }
    }
}

/// Tasks starting inside `now + minutes_before ± window_minutes` (inclusive).
///
/// Completed tasks, already-reminded tasks and tasks without a parseable
/// `scheduled_at` are skipped. A policy whose window cannot be represented
/// matches nothing.
pub fn due_reminders(tasks: &[TaskRecord], now: DateTime<Utc>, tz: Tz, policy: ReminderPolicy) -> Vec<ReminderIntent> {
    let Some((window_start, window_end)) = reminder_window(now, policy) else {
        tracing::warn!(?policy, "reminder window out of range; no reminders selected");
        return Vec::new();
    };

    tasks
        .iter()
        .filter(|t| !t.is_completed() && !t.reminder_sent)
        .filter_map(|t| {
            let at = t.scheduled_utc(tz)?;
            if at < window_start || at > window_end {
                return None;
            }
            let when_text = t
                .scheduled_text
                .clone()
                .unwrap_or_else(|| at.with_timezone(&tz).format("%I:%M %p").to_string());
            Some(ReminderIntent {
                task_id: t.id.clone(),
                user_id: t.user_id.clone(),
                task_name: t.name().to_string(),
                scheduled_at_utc: at,
                when_text,
                dedupe_key: format!("{}:{}", t.id, at.timestamp()),
            })
        })
        .collect()
}

fn reminder_window(now: DateTime<Utc>, policy: ReminderPolicy) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let target = now.checked_add_signed(Duration::try_minutes(policy.minutes_before)?)?;
    let half = Duration::try_minutes(policy.window_minutes)?;
    Some((target.checked_sub_signed(half)?, target.checked_add_signed(half)?))
}

impl AnchorScheduler {
    /// Reminders due right now for `user_id`. An unreachable store yields none.
    pub async fn collect_due_reminders(&self, user_id: &str, tz: Tz, policy: ReminderPolicy) -> Vec<ReminderIntent> {
        let Some(store) = &self.tasks else {
            return Vec::new();
        };
        match store.query_tasks(user_id, &TaskQuery::not_completed()).await {
            Ok(tasks) => due_reminders(&tasks, self.now(), tz, policy),
            Err(err) => {
                tracing::warn!(user_id, error = %err, "could not load tasks for reminders");
                Vec::new()
            }
        }
    }

    pub async fn mark_reminder_sent(&self, task_id: &str) -> Result<(), SourceError> {
        let store = self.tasks.as_ref().ok_or(SourceError::NotConnected)?;
        store
            .update_task(
                task_id,
                &TaskUpdate {
                    reminder_sent: Some(true),
                    ..Default::default()
                },
            )
            .await?;
        tracing::debug!(task_id, "reminder marked sent");
        Ok(())
    }
}
