//! Collaborator seams: calendar, task store, audit sink.
//!
//! Adapters live outside the core (see the CLI crate). The in-memory
//! implementations here back the tests and small embeddings.

use std::future::Future;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::reschedule::RescheduleEvent;
use crate::task::{TaskQuery, TaskRecord, TaskUpdate};
use crate::time::EventTime;

/// A busy block reported by an external calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub start: EventTime,
    pub end: EventTime,
    #[serde(default = "untitled")]
    pub summary: String,
}

fn untitled() -> String {
    "Untitled".to_string()
}

#[async_trait]
pub trait CalendarSource: Send + Sync {
    /// Busy events for `user_id` over `[now, now + days_ahead days]`.
    ///
    /// Return `SourceError::NotConnected` when the user has no calendar.
    async fn fetch_busy_events(
        &self,
        user_id: &str,
        days_ahead: u32,
    ) -> Result<Vec<CalendarEvent>, SourceError>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn query_tasks(&self, user_id: &str, query: &TaskQuery) -> Result<Vec<TaskRecord>, SourceError>;

    async fn update_task(&self, task_id: &str, update: &TaskUpdate) -> Result<(), SourceError>;
}

/// Fire-and-forget sink for reschedule audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record_reschedule(&self, event: &RescheduleEvent) -> Result<(), SourceError>;
}

/// Await a collaborator fetch; any error becomes an empty list.
///
/// This is the single point where the core decides that a failed fetch must
/// not block the caller.
pub async fn fetch_or_empty<T, F>(source: &'static str, fetch: F) -> Vec<T>
where
    F: Future<Output = Result<Vec<T>, SourceError>>,
{
    match fetch.await {
        Ok(items) => items,
        Err(SourceError::NotConnected) => {
            tracing::debug!(source, "source not connected; treating as empty");
            Vec::new()
        }
        Err(err) => {
            tracing::warn!(source, error = %err, "fetch failed; treating as empty");
            Vec::new()
        }
    }
}

/// Fixed list of events, or a fixed failure.
#[derive(Debug, Clone, Default)]
pub struct StaticCalendar {
    events: Vec<CalendarEvent>,
    failure: Option<SourceError>,
}

impl StaticCalendar {
    pub fn new(events: Vec<CalendarEvent>) -> Self {
        Self { events, failure: None }
    }

    pub fn failing(err: SourceError) -> Self {
        Self {
            events: Vec::new(),
            failure: Some(err),
        }
    }
}

#[async_trait]
impl CalendarSource for StaticCalendar {
    async fn fetch_busy_events(&self, _user_id: &str, _days_ahead: u32) -> Result<Vec<CalendarEvent>, SourceError> {
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(self.events.clone()),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: Mutex<Vec<TaskRecord>>,
    fail_queries: bool,
}

impl InMemoryTaskStore {
    pub fn new(tasks: Vec<TaskRecord>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            fail_queries: false,
        }
    }

    /// A store whose every call reports `Unavailable`.
    pub fn unavailable() -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
            fail_queries: true,
        }
    }

    pub fn snapshot(&self) -> Vec<TaskRecord> {
        self.lock().clone()
    }

    pub fn get(&self, task_id: &str) -> Option<TaskRecord> {
        self.lock().iter().find(|t| t.id == task_id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<TaskRecord>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn query_tasks(&self, user_id: &str, query: &TaskQuery) -> Result<Vec<TaskRecord>, SourceError> {
        if self.fail_queries {
            return Err(SourceError::unavailable("in-memory store marked unavailable"));
        }
        Ok(self
            .lock()
            .iter()
            .filter(|t| t.user_id == user_id && query.matches(t))
            .cloned()
            .collect())
    }

    async fn update_task(&self, task_id: &str, update: &TaskUpdate) -> Result<(), SourceError> {
        if self.fail_queries {
            return Err(SourceError::unavailable("in-memory store marked unavailable"));
        }
        let mut tasks = self.lock();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| SourceError::NotFound(task_id.to_string()))?;
        update.apply(task);
        Ok(())
    }
}

/// Collects audit records in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<RescheduleEvent>>,
    reject: bool,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that refuses every record.
    pub fn rejecting() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            reject: true,
        }
    }

    pub fn events(&self) -> Vec<RescheduleEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record_reschedule(&self, event: &RescheduleEvent) -> Result<(), SourceError> {
        if self.reject {
            return Err(SourceError::unavailable("audit sink rejecting"));
        }
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
        Ok(())
    }
}
