//! anchorwise-core: anchor availability + adaptive rescheduling

pub mod anchors;
pub mod availability;
pub mod error;
pub mod metrics;
pub mod prompt;
pub mod reminders;
pub mod reschedule;
pub mod scheduler;
pub mod slot_finder;
pub mod sources;
pub mod task;
pub mod time;

pub use anchors::{
    ANCHOR_REGISTRY, AnchorTimeOfDay, DEFAULT_ANCHOR_TIME, anchor_time_of_day, lookup_anchor, resolve_anchor_on,
    resolve_anchor_timestamp,
};
pub use availability::{
    AvailabilityMap, BusyInterval, BusySource, DEFAULT_DAYS_AHEAD, DEFAULT_TASK_DURATION_MINUTES,
    availability_from_intervals, busy_from_calendar, busy_from_tasks, overlaps,
};
pub use error::{RescheduleError, SourceError};
pub use metrics::{CompletionMetrics, completion_metrics};
pub use prompt::{format_availability_for_prompt, format_calendar_context};
pub use reminders::{ReminderIntent, ReminderPolicy, due_reminders};
pub use reschedule::{OVERDUE_GRACE_MINUTES, RescheduleEvent, RescheduleOutcome, RescheduleReason};
pub use scheduler::{AnchorScheduler, NowProvider};
pub use slot_finder::{Commitment, DayPart, SEARCH_HORIZON_DAYS, Slot, search_slot};
pub use sources::{
    AuditSink, CalendarEvent, CalendarSource, InMemoryTaskStore, MemoryAuditSink, StaticCalendar, TaskStore,
    fetch_or_empty,
};
pub use task::{DEFAULT_ANCHOR, DEFAULT_TASK_MINUTES, TaskQuery, TaskRecord, TaskStatus, TaskUpdate};
pub use time::{EventTime, format_minute, localize, parse_timestamp, parse_timezone};
