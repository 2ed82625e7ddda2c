//! File-backed collaborators under `~/.anchorwise/`.

use anchorwise_core::{
    AuditSink, CalendarEvent, CalendarSource, RescheduleEvent, SourceError, TaskQuery, TaskRecord, TaskStore,
    TaskUpdate, parse_timestamp,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Raw rows of a JSON array file. `None` when the file does not exist; only a
/// file that is not a JSON array at all is malformed.
async fn read_json_rows(path: &Path) -> Result<Option<Vec<Value>>, SourceError> {
    match tokio::fs::read_to_string(path).await {
        Ok(s) if s.trim().is_empty() => Ok(Some(Vec::new())),
        Ok(s) => serde_json::from_str(&s)
            .map(Some)
            .map_err(|e| SourceError::Malformed(format!("{}: {e}", path.display()))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SourceError::unavailable(format!("read {}: {e}", path.display()))),
    }
}

/// Decode each row on its own; rows that don't fit `T` are logged and dropped.
fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>, path: &Path) -> Vec<T> {
    rows.into_iter()
        .enumerate()
        .filter_map(|(index, row)| match serde_json::from_value(row) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(path = %path.display(), index, error = %e, "skipping malformed row");
                None
            }
        })
        .collect()
}

fn row_id(row: &Value) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

/// `tasks.json`: a JSON array of task records.
#[derive(Debug)]
pub struct JsonTaskStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonTaskStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub async fn load_all(&self) -> Result<Vec<TaskRecord>, SourceError> {
        let rows = read_json_rows(&self.path).await?.unwrap_or_default();
        Ok(decode_rows(rows, &self.path))
    }

    async fn save_rows(&self, rows: &[Value]) -> Result<(), SourceError> {
        let json = serde_json::to_string_pretty(rows).map_err(|e| SourceError::Malformed(e.to_string()))?;
        // Write-then-rename so a crash never leaves half a file.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| SourceError::unavailable(format!("write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| SourceError::unavailable(format!("rename {}: {e}", self.path.display())))
    }
}

#[async_trait]
impl TaskStore for JsonTaskStore {
    async fn query_tasks(&self, user_id: &str, query: &TaskQuery) -> Result<Vec<TaskRecord>, SourceError> {
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .filter(|t| t.user_id == user_id && query.matches(t))
            .collect())
    }

    async fn update_task(&self, task_id: &str, update: &TaskUpdate) -> Result<(), SourceError> {
        let _guard = self.write_lock.lock().await;
        // Edit the raw rows so records this build can't decode survive the rewrite.
        let mut rows = read_json_rows(&self.path).await?.unwrap_or_default();
        let row = rows
            .iter_mut()
            .find(|r| row_id(r) == Some(task_id))
            .ok_or_else(|| SourceError::NotFound(task_id.to_string()))?;
        let mut task: TaskRecord = serde_json::from_value(row.clone())
            .map_err(|e| SourceError::Malformed(format!("task {task_id}: {e}")))?;
        update.apply(&mut task);
        *row = serde_json::to_value(&task).map_err(|e| SourceError::Malformed(e.to_string()))?;
        self.save_rows(&rows).await
    }
}

/// `calendar.json`: a JSON array of `{start, end, summary}` events, with
/// `start`/`end` as timestamp strings (offset or naive wall-clock).
///
/// A missing file is reported as not connected. Rows with unreadable times
/// are skipped.
#[derive(Debug, Clone)]
pub struct JsonCalendarSource {
    path: PathBuf,
    tz: Tz,
}

impl JsonCalendarSource {
    pub fn new(path: impl Into<PathBuf>, tz: Tz) -> Self {
        Self { path: path.into(), tz }
    }
}

#[derive(Debug, Deserialize)]
struct CalendarRow {
    start: String,
    end: String,
    summary: Option<String>,
}

impl CalendarRow {
    fn into_event(self) -> Option<CalendarEvent> {
        Some(CalendarEvent {
            start: parse_timestamp(&self.start)?,
            end: parse_timestamp(&self.end)?,
            summary: self.summary.unwrap_or_else(|| "Untitled".to_string()),
        })
    }
}

#[async_trait]
impl CalendarSource for JsonCalendarSource {
    async fn fetch_busy_events(&self, _user_id: &str, days_ahead: u32) -> Result<Vec<CalendarEvent>, SourceError> {
        let rows = read_json_rows(&self.path).await?.ok_or(SourceError::NotConnected)?;
        let events = decode_rows::<CalendarRow>(rows, &self.path)
            .into_iter()
            .filter_map(|row| {
                let (start, end) = (row.start.clone(), row.end.clone());
                let event = row.into_event();
                if event.is_none() {
                    tracing::warn!(%start, %end, "skipping calendar row with unparseable times");
                }
                event
            });

        let now = Utc::now();
        // No upper bound when the horizon is past chrono's range.
        let horizon = Duration::try_days(i64::from(days_ahead)).and_then(|d| now.checked_add_signed(d));
        Ok(events
            .filter(|e| e.end.to_utc(self.tz) > now && horizon.is_none_or(|h| e.start.to_utc(self.tz) <= h))
            .collect())
    }
}

/// `audit.jsonl`: one reschedule event per line, append-only.
#[derive(Debug, Clone)]
pub struct JsonlAuditSink {
    path: PathBuf,
}

impl JsonlAuditSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn record_reschedule(&self, event: &RescheduleEvent) -> Result<(), SourceError> {
        let mut line = serde_json::to_string(event).map_err(|e| SourceError::Malformed(e.to_string()))?;
        line.push('\n');

        let mut f = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| SourceError::unavailable(format!("open {}: {e}", self.path.display())))?;
        f.write_all(line.as_bytes())
            .await
            .map_err(|e| SourceError::unavailable(format!("append {}: {e}", self.path.display())))
    }
}
