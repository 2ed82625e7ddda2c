//! Scheduler handle: injected collaborators + clock.
//!
//! Each collaborator is optional. A missing one behaves like an integration
//! that is not connected; operations still return a result. The public
//! operations live next to their logic in `availability`, `slot_finder`,
//! `reschedule` and `reminders`.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::sources::{AuditSink, CalendarSource, TaskStore};

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Clone)]
pub struct AnchorScheduler {
    pub(crate) calendar: Option<Arc<dyn CalendarSource>>,
    pub(crate) tasks: Option<Arc<dyn TaskStore>>,
    pub(crate) audit: Option<Arc<dyn AuditSink>>,
    now_provider: NowProvider,
}

impl AnchorScheduler {
    pub fn new() -> Self {
        Self {
            calendar: None,
            tasks: None,
            audit: None,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_calendar(mut self, calendar: Arc<dyn CalendarSource>) -> Self {
        self.calendar = Some(calendar);
        self
    }

    pub fn with_task_store(mut self, tasks: Arc<dyn TaskStore>) -> Self {
        self.tasks = Some(tasks);
        self
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    /// Pin the clock to a fixed instant.
    pub fn with_fixed_now(self, now: DateTime<Utc>) -> Self {
        self.with_now_provider(Arc::new(move || now))
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.now_provider)()
    }

    pub fn has_task_store(&self) -> bool {
        self.tasks.is_some()
    }
}

impl Default for AnchorScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AnchorScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnchorScheduler")
            .field("calendar", &self.calendar.is_some())
            .field("tasks", &self.tasks.is_some())
            .field("audit", &self.audit.is_some())
            .finish()
    }
}
