use std::sync::Arc;

use anchorwise_core::{
    AnchorScheduler, CalendarEvent, EventTime, InMemoryTaskStore, MemoryAuditSink, RescheduleError,
    RescheduleReason, SourceError, StaticCalendar, TaskRecord, TaskStatus, format_availability_for_prompt,
};
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::America::Los_Angeles;
use chrono_tz::Tz;

const ANCHORS: [&str; 3] = ["Morning Coffee", "After Lunch", "End of Day"];

/// 07:00 on Tuesday 2026-02-10 in Los Angeles.
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 10, 15, 0, 0).unwrap()
}

fn la(day: u32, h: u32, m: u32) -> DateTime<Tz> {
    Los_Angeles.with_ymd_and_hms(2026, 2, day, h, m, 0).unwrap()
}

fn event(start: DateTime<Tz>, end: DateTime<Tz>, summary: &str) -> CalendarEvent {
    CalendarEvent {
        start: EventTime::from(start),
        end: EventTime::from(end),
        summary: summary.to_string(),
    }
}

fn scheduler(events: Vec<CalendarEvent>, tasks: Vec<TaskRecord>) -> (AnchorScheduler, Arc<InMemoryTaskStore>) {
    let store = Arc::new(InMemoryTaskStore::new(tasks));
    let s = AnchorScheduler::new()
        .with_calendar(Arc::new(StaticCalendar::new(events)))
        .with_task_store(store.clone())
        .with_fixed_now(now());
    (s, store)
}

#[tokio::test]
async fn morning_meeting_blocks_only_morning_coffee() {
    let (s, _) = scheduler(vec![event(la(10, 7, 30), la(10, 9, 0), "Standup")], vec![]);
    let map = s.compute_availability("u1", &ANCHORS, 7, 20, Los_Angeles).await;

    assert_eq!(map.len(), 7);
    assert_eq!(map["2026-02-10"], ["After Lunch".to_string(), "End of Day".to_string()]);
    assert_eq!(map["2026-02-11"].len(), 3);

    let prompt = format_availability_for_prompt(&map);
    assert!(prompt.contains("- **Tuesday Feb 10:** After Lunch, End of Day"));
}

#[tokio::test]
async fn calendar_failure_leaves_everything_open() {
    let s = AnchorScheduler::new()
        .with_calendar(Arc::new(StaticCalendar::failing(SourceError::unavailable("503"))))
        .with_fixed_now(now());
    let map = s.compute_availability("u1", &ANCHORS, 3, 20, Los_Angeles).await;

    assert_eq!(map.len(), 3);
    for (_, anchors) in map.iter() {
        assert_eq!(anchors, &ANCHORS.map(String::from).to_vec());
    }
}

#[tokio::test]
async fn calendar_failure_still_checks_internal_tasks() {
    let store = Arc::new(InMemoryTaskStore::new(vec![
        TaskRecord::new("t1", "u1")
            .with_scheduled_at("2026-02-10T13:30:00-08:00")
            .with_minutes(20),
    ]));
    let s = AnchorScheduler::new()
        .with_calendar(Arc::new(StaticCalendar::failing(SourceError::NotConnected)))
        .with_task_store(store)
        .with_fixed_now(now());
    let map = s.compute_availability("u1", &ANCHORS, 2, 20, Los_Angeles).await;

    assert_eq!(map["2026-02-10"], ["Morning Coffee".to_string(), "End of Day".to_string()]);
    assert_eq!(map["2026-02-11"].len(), 3);
}

#[tokio::test]
async fn absurd_task_duration_is_skipped_not_fatal() {
    let tasks = vec![
        TaskRecord::new("huge", "u1")
            .with_scheduled_at("2026-02-10T08:00:00-08:00")
            .with_minutes(1_000_000_000_000),
        TaskRecord::new("t1", "u1")
            .with_scheduled_at("2026-02-10T17:00:00-08:00")
            .with_minutes(20),
    ];
    let (s, _) = scheduler(vec![], tasks);
    let map = s.compute_availability("u1", &ANCHORS, 1, 20, Los_Angeles).await;
    assert_eq!(map["2026-02-10"], ["Morning Coffee".to_string(), "After Lunch".to_string()]);
}

#[tokio::test]
async fn no_collaborators_at_all_still_answers() {
    let s = AnchorScheduler::new().with_fixed_now(now());
    let map = s.compute_availability("u1", &ANCHORS, 1, 20, Los_Angeles).await;
    assert_eq!(map["2026-02-10"].len(), 3);
}

#[tokio::test]
async fn full_day_block_is_isolated_to_its_day() {
    let (s, _) = scheduler(vec![event(la(11, 0, 0), la(12, 0, 0), "Offsite")], vec![]);
    let map = s.compute_availability("u1", &ANCHORS, 3, 20, Los_Angeles).await;

    assert_eq!(map["2026-02-10"].len(), 3);
    assert!(map["2026-02-11"].is_empty());
    assert_eq!(map["2026-02-12"].len(), 3);
}

#[tokio::test]
async fn open_tasks_occupy_time_but_completed_ones_do_not() {
    let tasks = vec![
        TaskRecord::new("t1", "u1")
            .with_scheduled_at("2026-02-10T13:30:00-08:00")
            .with_minutes(20),
        TaskRecord::new("t2", "u1")
            .with_scheduled_at("2026-02-10T17:00:00-08:00")
            .with_status(TaskStatus::Completed),
        TaskRecord::new("t3", "u1").with_scheduled_at("whenever"),
    ];
    let (s, _) = scheduler(vec![], tasks);
    let map = s.compute_availability("u1", &ANCHORS, 1, 20, Los_Angeles).await;
    assert_eq!(map["2026-02-10"], ["Morning Coffee".to_string(), "End of Day".to_string()]);
}

#[tokio::test]
async fn slot_finder_without_store_is_tomorrow_same_time() {
    let s = AnchorScheduler::new().with_fixed_now(now());
    let slot = s.find_next_available_slot("u1", "Before Bed", 15, Los_Angeles).await;
    assert_eq!(slot.scheduled_text, "Before Bed");
    assert_eq!(slot.scheduled_at, la(11, 7, 0));
}

#[tokio::test]
async fn slot_finder_store_failure_falls_back() {
    let s = AnchorScheduler::new()
        .with_task_store(Arc::new(InMemoryTaskStore::unavailable()))
        .with_fixed_now(now());
    let slot = s.find_next_available_slot("u1", "morning", 15, Los_Angeles).await;
    assert_eq!(slot.scheduled_text, "morning");
    assert_eq!(slot.scheduled_at, la(11, 7, 0));
}

#[tokio::test]
async fn slot_finder_skips_taken_morning_coffee() {
    let tasks = vec![TaskRecord::new("t1", "u1").with_scheduled_at("2026-02-11T08:00:00-08:00")];
    let (s, _) = scheduler(vec![], tasks);
    let slot = s.find_next_available_slot("u1", "Morning Coffee", 15, Los_Angeles).await;
    // "Mid-Morning" also resolves to 08:00, so the whole of Feb 11 morning is taken.
    assert_eq!(slot.scheduled_text, "Morning Coffee");
    assert_eq!(slot.scheduled_at, la(12, 8, 0));
}

#[tokio::test]
async fn reschedule_moves_task_and_audits() {
    let tasks = vec![
        TaskRecord::new("t1", "u1")
            .with_name("Practice Spanish")
            .with_goal("g1")
            .with_scheduled_at("2026-02-09T13:30:00-08:00")
            .with_anchor("After Lunch"),
    ];
    let (s, store) = scheduler(vec![], tasks);
    let audit = Arc::new(MemoryAuditSink::new());
    let s = s.with_audit_sink(audit.clone());

    assert!(s.reschedule_task("t1", "u1", RescheduleReason::UserRequested, Los_Angeles).await);

    let task = store.get("t1").unwrap();
    assert_eq!(task.scheduled_at.as_deref(), Some("2026-02-11T13:30:00-08:00"));
    assert_eq!(task.scheduled_text.as_deref(), Some("After Lunch"));
    assert!(task.was_rescheduled);

    let events = audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].task_name, "Practice Spanish");
    assert_eq!(events[0].goal_id.as_deref(), Some("g1"));
    assert_eq!(events[0].original_date, "2026-02-09T13:30:00-08:00");
    assert_eq!(events[0].new_date, "2026-02-11 13:30");
    assert_eq!(events[0].reason, RescheduleReason::UserRequested);
}

#[tokio::test]
async fn audit_failure_does_not_fail_reschedule() {
    let (s, store) = scheduler(vec![], vec![TaskRecord::new("t1", "u1")]);
    let s = s.with_audit_sink(Arc::new(MemoryAuditSink::rejecting()));

    assert!(s.reschedule_task("t1", "u1", RescheduleReason::UserRequested, Los_Angeles).await);
    assert!(store.get("t1").unwrap().was_rescheduled);
}

#[tokio::test]
async fn unknown_task_reports_false() {
    let (s, _) = scheduler(vec![], vec![TaskRecord::new("t1", "other-user")]);
    assert!(!s.reschedule_task("t1", "u1", RescheduleReason::UserRequested, Los_Angeles).await);

    let err = s
        .try_reschedule_task("missing", "u1", RescheduleReason::UserRequested, Los_Angeles)
        .await
        .unwrap_err();
    assert_eq!(err, RescheduleError::TaskNotFound("missing".to_string()));
}

#[tokio::test]
async fn reschedule_without_store_is_an_error() {
    let s = AnchorScheduler::new().with_fixed_now(now());
    let err = s
        .try_reschedule_task("t1", "u1", RescheduleReason::UserRequested, Los_Angeles)
        .await
        .unwrap_err();
    assert_eq!(err, RescheduleError::StoreUnavailable);

    let s = s.with_task_store(Arc::new(InMemoryTaskStore::unavailable()));
    let err = s
        .try_reschedule_task("t1", "u1", RescheduleReason::UserRequested, Los_Angeles)
        .await
        .unwrap_err();
    assert!(matches!(err, RescheduleError::Store(SourceError::Unavailable(_))));
}

#[tokio::test]
async fn sweep_reschedules_only_overdue_open_tasks_once() {
    let tasks = vec![
        TaskRecord::new("overdue", "u1").with_scheduled_at("2026-02-09T13:30:00-08:00"),
        TaskRecord::new("done", "u1")
            .with_scheduled_at("2026-02-09T08:00:00-08:00")
            .with_status(TaskStatus::Completed),
        // 30 minutes ago: inside the grace period.
        TaskRecord::new("recent", "u1").with_scheduled_at("2026-02-10T06:30:00-08:00"),
        TaskRecord::new("garbage", "u1").with_scheduled_at("last tuesday"),
        TaskRecord::new("unscheduled", "u1"),
    ];
    let (s, store) = scheduler(vec![], tasks);
    let audit = Arc::new(MemoryAuditSink::new());
    let s = s.with_audit_sink(audit.clone());

    let first = s.detect_and_reschedule_missed("u1", Los_Angeles).await;
    assert_eq!(first, vec!["overdue".to_string()]);
    assert_eq!(audit.events()[0].reason, RescheduleReason::AutoMissedDeadline);
    assert_eq!(
        store.get("done").unwrap().scheduled_at.as_deref(),
        Some("2026-02-09T08:00:00-08:00")
    );

    let second = s.detect_and_reschedule_missed("u1", Los_Angeles).await;
    assert!(second.is_empty());
    assert_eq!(audit.events().len(), 1);
}

#[tokio::test]
async fn sweep_treats_floating_times_as_local() {
    // 05:30 floating is 05:30 Los Angeles, 90 minutes before now.
    let tasks = vec![TaskRecord::new("t1", "u1").with_scheduled_at("2026-02-10 05:30:00")];
    let (s, _) = scheduler(vec![], tasks);
    assert_eq!(s.detect_and_reschedule_missed("u1", Los_Angeles).await, vec!["t1".to_string()]);
}

#[tokio::test]
async fn sweep_without_store_is_empty() {
    let s = AnchorScheduler::new().with_fixed_now(now());
    assert!(s.detect_and_reschedule_missed("u1", Los_Angeles).await.is_empty());
}
