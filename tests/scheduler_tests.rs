use chrono::{Duration, NaiveDate, NaiveDateTime};
use tickler::models::{Category, Priority, Recurrence, RecurrenceUnit, Settings, Task};
use tickler::scheduler::{EventKind, Scheduler};

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
}

fn task(id: u64, due: Option<NaiveDateTime>) -> Task {
    Task {
        id,
        text: format!("Task {}", id),
        completed: false,
        priority: Priority::Medium,
        due_date: due,
        category: Category::Work,
        recurrence: Recurrence::None,
        recurrence_interval: 1,
        recurrence_unit: RecurrenceUnit::Days,
        created_at: at(2024, 12, 1, 8, 0),
        completed_at: None,
        reminder_sent: false,
        original_task_id: None,
    }
}

fn enabled() -> Settings {
    Settings { enable_notifications: true, ..Settings::default() }
}

#[test]
fn test_schedule_arms_at_reminder_time() {
    let mut s = Scheduler::new();
    let t = task(1, Some(at(2025, 1, 1, 9, 0)));

    assert!(s.schedule(&t, &enabled(), at(2024, 12, 31, 12, 0)));
    assert_eq!(s.armed_at(1), Some(at(2025, 1, 1, 8, 50)));
}

#[test]
fn test_schedule_skips_passed_window() {
    let mut s = Scheduler::new();
    let t = task(1, Some(at(2025, 1, 1, 9, 0)));

    // Exactly at the reminder instant: delay is zero.
    assert!(!s.schedule(&t, &enabled(), at(2025, 1, 1, 8, 50)));
    assert!(!s.schedule(&t, &enabled(), at(2025, 1, 1, 8, 55)));
    assert!(!s.is_armed(1));
}

#[test]
fn test_schedule_skips_ineligible_tasks() {
    let mut s = Scheduler::new();
    let now = at(2024, 12, 31, 12, 0);

    let mut done = task(1, Some(at(2025, 1, 1, 9, 0)));
    done.completed = true;
    assert!(!s.schedule(&done, &enabled(), now));

    assert!(!s.schedule(&task(2, None), &enabled(), now));

    assert!(!s.schedule(&task(3, Some(at(2025, 1, 1, 9, 0))), &Settings::default(), now));
    assert_eq!(s.armed_count(), 0);
}

#[test]
fn test_reschedule_replaces_and_cancel_is_idempotent() {
    let mut s = Scheduler::new();
    let now = at(2024, 12, 31, 12, 0);
    let mut t = task(1, Some(at(2025, 1, 1, 9, 0)));
    s.schedule(&t, &enabled(), now);

    t.due_date = Some(at(2025, 1, 2, 9, 0));
    s.schedule(&t, &enabled(), now);
    assert_eq!(s.armed_count(), 1);
    assert_eq!(s.armed_at(1), Some(at(2025, 1, 2, 8, 50)));

    assert!(s.cancel(1));
    assert!(!s.cancel(1));
    assert!(!s.is_armed(1));
}

#[test]
fn test_rescan_catches_tasks_inside_window() {
    let mut s = Scheduler::new();
    let now = at(2025, 1, 1, 8, 55);
    let tasks = vec![
        task(1, Some(at(2025, 1, 1, 9, 0))),  // 5 minutes out: inside the 10 minute window
        task(2, Some(at(2025, 1, 1, 10, 0))), // too far out
        task(3, Some(at(2025, 1, 1, 8, 0))),  // already due
    ];

    assert_eq!(s.rescan(&tasks, &enabled(), now), 1);
    // due - window + one sweep is in the past, so it fires right away.
    assert_eq!(s.armed_at(1), Some(now));
    assert!(!s.is_armed(2));
    assert!(!s.is_armed(3));
}

#[test]
fn test_rescan_aligns_to_sweep() {
    let mut s = Scheduler::new();
    let now = at(2025, 1, 1, 8, 50);
    let tasks = vec![task(1, Some(at(2025, 1, 1, 9, 0)))];

    assert_eq!(s.rescan(&tasks, &enabled(), now), 1);
    assert_eq!(s.armed_at(1), Some(at(2025, 1, 1, 8, 51)));
}

#[test]
fn test_rescan_skips_sent_armed_and_disabled() {
    let mut s = Scheduler::new();
    let now = at(2025, 1, 1, 8, 55);
    let mut sent = task(1, Some(at(2025, 1, 1, 9, 0)));
    sent.reminder_sent = true;
    let armed = task(2, Some(at(2025, 1, 1, 9, 0)));
    s.schedule(&task(2, Some(at(2025, 1, 1, 9, 30))), &enabled(), now);

    assert_eq!(s.rescan(&[sent.clone(), armed], &enabled(), now), 0);
    assert_eq!(s.armed_at(2), Some(at(2025, 1, 1, 9, 20)));

    let mut fresh = Scheduler::new();
    sent.reminder_sent = false;
    assert_eq!(fresh.rescan(&[sent], &Settings::default(), now), 0);
}

#[test]
fn test_due_events_in_order() {
    let mut s = Scheduler::new();
    let now = at(2024, 12, 31, 12, 0);
    s.schedule(&task(1, Some(at(2025, 1, 1, 9, 0))), &enabled(), now);
    s.schedule(&task(2, Some(at(2025, 1, 1, 8, 0))), &enabled(), now);
    s.defer_recurrence(3, now);

    let first = s.due_events(now + Duration::seconds(1));
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].kind, EventKind::Recurrence);
    assert_eq!(first[0].task_id, 3);

    let rest = s.due_events(at(2025, 1, 1, 9, 0));
    let ids: Vec<u64> = rest.iter().map(|e| e.task_id).collect();
    assert_eq!(ids, vec![2, 1]);
    assert!(rest.iter().all(|e| e.kind == EventKind::Reminder));
    assert_eq!(s.armed_count(), 0);
}

#[test]
fn test_sweep_and_deadline() {
    let mut s = Scheduler::new();
    let now = at(2025, 1, 1, 8, 0);
    assert_eq!(s.next_deadline(), None);

    s.start_sweep(now);
    assert_eq!(s.next_deadline(), Some(now + Duration::seconds(60)));
    assert!(!s.sweep_due(now + Duration::seconds(59)));
    assert!(s.sweep_due(now + Duration::seconds(60)));
    assert_eq!(s.next_deadline(), Some(now + Duration::seconds(120)));

    s.defer_recurrence(9, now);
    assert_eq!(s.next_deadline(), Some(now + Duration::seconds(1)));
    assert_eq!(s.take_deferred(), vec![9]);
    assert!(!s.has_pending_recurrence(9));
}
