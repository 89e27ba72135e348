use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use tickler::calendar::Month;
use tickler::models::{Category, Filter, Priority, Recurrence, RecurrenceUnit, SortKey, SortOrder, Task};
use tickler::notify::{is_valid_phone_number, play_sound, Reminder};
use tickler::store::{parse_due, NewTask, TaskStore};

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
}

fn task(id: u64, priority: Priority, due: Option<NaiveDateTime>, created: NaiveDateTime) -> Task {
    Task {
        id,
        text: format!("Task {}", id),
        completed: false,
        priority,
        due_date: due,
        category: Category::Personal,
        recurrence: Recurrence::None,
        recurrence_interval: 1,
        recurrence_unit: RecurrenceUnit::Days,
        created_at: created,
        completed_at: None,
        reminder_sent: false,
        original_task_id: None,
    }
}

fn sample_store() -> TaskStore {
    let created = at(2025, 1, 1, 8, 0);
    TaskStore::new(vec![
        task(1, Priority::Low, Some(at(2025, 1, 10, 9, 0)), created),
        task(2, Priority::High, None, at(2025, 1, 5, 8, 0)),
        task(3, Priority::Medium, Some(at(2025, 1, 3, 9, 0)), created),
        task(4, Priority::High, Some(at(2025, 2, 1, 9, 0)), created),
    ])
}

fn ids(tasks: &[Task]) -> Vec<u64> {
    tasks.iter().map(|t| t.id).collect()
}

#[test]
fn test_sort_by_date() {
    let store = sample_store();

    // Task 2 has no due date and sorts by its creation time.
    let desc = store.filtered(Filter::All, SortKey::Date, SortOrder::Desc);
    assert_eq!(ids(&desc), vec![4, 1, 2, 3]);

    let asc = store.filtered(Filter::All, SortKey::Date, SortOrder::Asc);
    assert_eq!(ids(&asc), vec![3, 2, 1, 4]);
}

#[test]
fn test_sort_by_priority_is_stable() {
    let store = sample_store();

    let desc = store.filtered(Filter::All, SortKey::Priority, SortOrder::Desc);
    assert_eq!(ids(&desc), vec![2, 4, 3, 1]);

    let asc = store.filtered(Filter::All, SortKey::Priority, SortOrder::Asc);
    assert_eq!(ids(&asc), vec![1, 3, 2, 4]);
}

#[test]
fn test_filter_and_stats() {
    let mut store = sample_store();
    store.toggle(2, at(2025, 1, 6, 8, 0)).unwrap();
    store.toggle(3, at(2025, 1, 6, 8, 0)).unwrap();

    let active = store.filtered(Filter::Active, SortKey::Date, SortOrder::Desc);
    let done = store.filtered(Filter::Completed, SortKey::Date, SortOrder::Desc);
    assert_eq!(ids(&active), vec![4, 1]);
    assert_eq!(ids(&done), vec![2, 3]);

    let stats = store.stats();
    assert_eq!((stats.total, stats.active, stats.completed), (4, 2, 2));
    assert_eq!(stats.progress(), 50.0);
    assert_eq!(TaskStore::default().stats().progress(), 0.0);
}

#[test]
fn test_add_trims_and_normalizes() {
    let mut store = TaskStore::default();
    let now = at(2025, 1, 1, 8, 0);

    let fixed = store
        .add(
            NewTask {
                recurrence: Recurrence::Weekly,
                recurrence_interval: Some(4),
                recurrence_unit: Some(RecurrenceUnit::Months),
                ..NewTask::new("  Laundry  ")
            },
            now,
        )
        .unwrap();
    assert_eq!(fixed.text, "Laundry");
    assert_eq!(fixed.recurrence_interval, 1);
    assert_eq!(fixed.recurrence_unit, RecurrenceUnit::Days);
    assert_eq!(fixed.created_at, now);

    let custom = store
        .add(NewTask { recurrence: Recurrence::Custom, recurrence_interval: Some(0), ..NewTask::new("Gym") }, now)
        .unwrap();
    assert_eq!(custom.recurrence_interval, 1);

    assert!(store.add(NewTask::new(""), now).is_none());
    assert_eq!(store.len(), 2);
}

#[test]
fn test_days_with_tasks() {
    let store = sample_store();
    let days: Vec<u32> = store.days_with_tasks(2025, 1).into_iter().collect();
    assert_eq!(days, vec![3, 10]);
    assert!(store.days_with_tasks(2024, 1).is_empty());
}

#[test]
fn test_parse_due() {
    assert_eq!(parse_due(Some("2025-07-04"), Some("18:30")).unwrap(), Some(at(2025, 7, 4, 18, 30)));
    assert_eq!(parse_due(Some("2025-07-04"), Some("  ")).unwrap(), Some(at(2025, 7, 4, 23, 59)));
    assert_eq!(parse_due(None, Some("18:30")).unwrap(), None);
    assert_eq!(parse_due(Some(""), None).unwrap(), None);

    let err = parse_due(Some("07/04/2025"), None).unwrap_err();
    assert_eq!(err.to_string(), "invalid date '07/04/2025'. Use YYYY-MM-DD.");
    assert!(parse_due(Some("2025-02-30"), None).is_err());
    assert!(parse_due(Some("2025-07-04"), Some("7pm")).is_err());
}

#[test]
fn test_enum_parsing() {
    assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
    assert_eq!(" shopping ".parse::<Category>().unwrap(), Category::Shopping);
    assert_eq!("weeks".parse::<RecurrenceUnit>().unwrap(), RecurrenceUnit::Weeks);
    assert!("urgent".parse::<Priority>().is_err());
    assert_eq!(Filter::Completed.next(), Filter::All);
    assert_eq!(SortOrder::default(), SortOrder::Desc);
}

#[test]
fn test_calendar_cells() {
    // January 2025 starts on a Wednesday.
    let jan = Month::new(2025, 1);
    let cells = jan.cells();
    assert_eq!(&cells[..4], &[None, None, None, Some(1)]);
    assert_eq!(cells.len(), 3 + 31);
    assert_eq!(jan.title(), "January 2025");

    assert_eq!(Month::new(2024, 2).days_in_month(), 29);
    assert_eq!(Month::new(2025, 12).shift(1), Month::new(2026, 1));
    assert_eq!(Month::new(2025, 1).shift(-1), Month::new(2024, 12));
    assert_eq!(Month::new(2025, 3).shift(-14), Month::new(2024, 1));
}

#[test]
fn test_phone_numbers() {
    assert!(is_valid_phone_number("+1 (555) 123-4567"));
    assert!(is_valid_phone_number("5551234567"));
    assert!(!is_valid_phone_number("555-1234"));
    assert!(!is_valid_phone_number("call me maybe"));
    assert!(!is_valid_phone_number(""));
}

#[test]
fn test_reminder_text() {
    let t = task(9, Priority::Medium, Some(at(2025, 1, 1, 21, 5)), at(2025, 1, 1, 8, 0));

    let r = Reminder::compose(&t, at(2025, 1, 1, 20, 35));
    assert_eq!(r.title, "Todo Reminder");
    assert_eq!(r.message, "🔔 Task Reminder: \"Task 9\" is due at 9:05 PM (in 30 minutes)!");

    // Partial minutes round up.
    let r = Reminder::compose(&t, at(2025, 1, 1, 21, 4) - chrono::Duration::seconds(1));
    assert!(r.message.ends_with("(in 2 minutes)!"));
}

#[cfg(unix)]
#[test]
fn test_sound_player_failures_are_reported() {
    let file = Path::new("/dev/null");
    assert!(play_sound("true", file).is_ok());

    let err = play_sound("false", file).unwrap_err();
    assert!(err.to_string().starts_with("false exited with"));
    assert!(play_sound("tickler-no-such-player", file).is_err());
}
