//! Busy-interval aggregation and per-day anchor availability.
//!
//! Two independent sources occupy time: external calendar events and the
//! user's own scheduled tasks. Both are normalized into [`BusyInterval`]s and
//! concatenated as-is (no merging); each anchor window is then checked
//! against the intervals starting on the same local day.

use std::collections::BTreeMap;
use std::ops::Index;

use chrono::{DateTime, Duration, NaiveDate, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::anchors::resolve_anchor_on;
use crate::scheduler::AnchorScheduler;
use crate::sources::{CalendarEvent, fetch_or_empty};
use crate::task::{TaskQuery, TaskRecord};
use crate::time::EventTime;

pub const DEFAULT_DAYS_AHEAD: u32 = 7;
pub const DEFAULT_TASK_DURATION_MINUTES: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusySource {
    Calendar,
    Task,
}

/// Occupied time. Provenance is kept for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: EventTime,
    pub end: EventTime,
    pub source: BusySource,
}

impl BusyInterval {
    /// Build an interval, rejecting `end < start` when the two are comparable
    /// without a timezone.
    pub fn new(start: EventTime, end: EventTime, source: BusySource) -> Option<Self> {
        let inverted = match (start, end) {
            (EventTime::Zoned(s), EventTime::Zoned(e)) => e < s,
            (EventTime::Floating(s), EventTime::Floating(e)) => e < s,
            _ => false,
        };
        (!inverted).then_some(Self { start, end, source })
    }

    pub fn from_calendar(event: &CalendarEvent) -> Option<Self> {
        Self::new(event.start, event.end, BusySource::Calendar)
    }

    /// `[scheduled_at, scheduled_at + estimated_minutes)`; `None` when the
    /// task has no parseable timestamp, its end is out of range, or its
    /// duration is negative.
    pub fn from_task(task: &TaskRecord) -> Option<Self> {
        let start = task.scheduled_time()?;
        Self::new(start, start.plus_minutes(task.duration_minutes())?, BusySource::Task)
    }

    pub fn localized(&self, tz: Tz) -> (DateTime<Tz>, DateTime<Tz>) {
        (self.start.in_zone(tz), self.end.in_zone(tz))
    }
}

/// Half-open overlap of `[a_start, a_end)` and `[b_start, b_end)`.
///
/// Back-to-back windows (one ends exactly where the other starts) do not overlap.
pub fn overlaps<Z: TimeZone>(
    a_start: &DateTime<Z>,
    a_end: &DateTime<Z>,
    b_start: &DateTime<Z>,
    b_end: &DateTime<Z>,
) -> bool {
    a_start < b_end && a_end > b_start
}

pub fn busy_from_calendar(events: &[CalendarEvent]) -> Vec<BusyInterval> {
    events
        .iter()
        .filter_map(|e| {
            let interval = BusyInterval::from_calendar(e);
            if interval.is_none() {
                tracing::warn!(summary = %e.summary, "skipping calendar event that ends before it starts");
            }
            interval
        })
        .collect()
}

pub fn busy_from_tasks(tasks: &[TaskRecord]) -> Vec<BusyInterval> {
    tasks
        .iter()
        .filter(|t| t.scheduled_at.is_some())
        .filter_map(|t| {
            let Some(start) = t.scheduled_time() else {
                tracing::warn!(task_id = %t.id, raw = ?t.scheduled_at, "skipping task with unparseable scheduled_at");
                return None;
            };
            let minutes = t.duration_minutes();
            let Some(end) = start.plus_minutes(minutes) else {
                tracing::warn!(task_id = %t.id, minutes, "skipping task whose estimated_minutes is out of range");
                return None;
            };
            let interval = BusyInterval::new(start, end, BusySource::Task);
            if interval.is_none() {
                tracing::warn!(task_id = %t.id, minutes, "skipping task with negative estimated_minutes");
            }
            interval
        })
        .collect()
}

/// Date → anchors free on that date, in caller order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AvailabilityMap {
    days: BTreeMap<NaiveDate, Vec<String>>,
}

impl AvailabilityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, date: NaiveDate, anchors: Vec<String>) {
        self.days.insert(date, anchors);
    }

    pub fn on(&self, date: NaiveDate) -> Option<&[String]> {
        self.days.get(&date).map(Vec::as_slice)
    }

    /// Lookup by ISO date string (`YYYY-MM-DD`).
    pub fn get(&self, iso_date: &str) -> Option<&[String]> {
        let date = NaiveDate::parse_from_str(iso_date, "%Y-%m-%d").ok()?;
        self.on(date)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &Vec<String>)> {
        self.days.iter()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

impl Index<&str> for AvailabilityMap {
    type Output = [String];

    fn index(&self, iso_date: &str) -> &Self::Output {
        self.get(iso_date)
            .unwrap_or_else(|| panic!("no availability entry for {iso_date}"))
    }
}

fn anchor_end(anchor_start: &DateTime<Tz>, minutes: i64) -> Option<DateTime<Tz>> {
    anchor_start.checked_add_signed(Duration::try_minutes(minutes)?)
}

/// Pure availability computation over an already aggregated busy list.
pub fn availability_from_intervals<S: AsRef<str>>(
    busy: &[BusyInterval],
    anchors: &[S],
    start_date: NaiveDate,
    days_ahead: u32,
    task_duration_minutes: i64,
    tz: Tz,
) -> AvailabilityMap {
    let localized: Vec<(DateTime<Tz>, DateTime<Tz>)> = busy.iter().map(|b| b.localized(tz)).collect();
    let mut map = AvailabilityMap::new();

    for offset in 0..days_ahead {
        let Some(day) = start_date.checked_add_days(chrono::Days::new(u64::from(offset))) else {
            break;
        };

        let days_busy: Vec<&(DateTime<Tz>, DateTime<Tz>)> =
            localized.iter().filter(|(start, _)| start.date_naive() == day).collect();

        let free = anchors
            .iter()
            .map(|a| a.as_ref())
            .filter(|anchor| {
                let anchor_start = resolve_anchor_on(anchor, tz, day);
                match anchor_end(&anchor_start, task_duration_minutes) {
                    Some(anchor_end) => !days_busy
                        .iter()
                        .any(|(busy_start, busy_end)| overlaps(&anchor_start, &anchor_end, busy_start, busy_end)),
                    // Window runs past the end of time: anything still going at the anchor blocks it.
                    None => !days_busy.iter().any(|(_, busy_end)| *busy_end > anchor_start),
                }
            })
            .map(str::to_string)
            .collect();

        map.insert(day, free);
    }

    map
}

impl AnchorScheduler {
    /// Calendar events plus the user's open tasks, normalized into busy
    /// intervals. Either source failing contributes nothing.
    pub async fn fetch_busy_intervals(&self, user_id: &str, days_ahead: u32) -> Vec<BusyInterval> {
        let events = match &self.calendar {
            Some(calendar) => fetch_or_empty("calendar", calendar.fetch_busy_events(user_id, days_ahead)).await,
            None => Vec::new(),
        };

        let tasks = match &self.tasks {
            Some(store) => fetch_or_empty("tasks", store.query_tasks(user_id, &TaskQuery::not_completed())).await,
            None => Vec::new(),
        };

        let mut busy = busy_from_calendar(&events);
        busy.extend(busy_from_tasks(&tasks));
        tracing::debug!(
            user_id,
            calendar = events.len(),
            tasks = tasks.len(),
            intervals = busy.len(),
            "aggregated busy intervals"
        );
        busy
    }

    /// For each of the next `days_ahead` days (starting today in `tz`), the
    /// anchors whose `[start, start + task_duration_minutes)` window is clear.
    pub async fn compute_availability<S: AsRef<str>>(
        &self,
        user_id: &str,
        anchors: &[S],
        days_ahead: u32,
        task_duration_minutes: i64,
        tz: Tz,
    ) -> AvailabilityMap {
        let busy = self.fetch_busy_intervals(user_id, days_ahead).await;
        let today = self.now().with_timezone(&tz).date_naive();
        availability_from_intervals(&busy, anchors, today, days_ahead, task_duration_minutes, tz)
    }
}
