use tickler::commands::*;
use tickler::models::{Priority, Recurrence, RecurrenceUnit, Permission, Task};
use tickler::storage::{load_settings, load_tasks, FileStorage};
use std::env;
use std::sync::Mutex;
use chrono::{NaiveDate, NaiveDateTime};
use tempfile::TempDir;

// Use a mutex to ensure tests run serially since they modify the environment variable
static TEST_MUTEX: Mutex<()> = Mutex::new(());

fn with_test_dir<F>(f: F)
where
    F: FnOnce(),
{
    let _guard = TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    env::set_var("TICKLER_DIR", dir.path());

    f();

    env::remove_var("TICKLER_DIR");
}

fn tasks() -> Vec<Task> {
    load_tasks(&FileStorage::from_env())
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
}

fn add(text: &str, due: Option<&str>, time: Option<&str>) -> Option<u64> {
    cmd_add(
        AddArgs {
            text: text.into(),
            due: due.map(String::from),
            time: time.map(String::from),
            ..AddArgs::default()
        },
        true,
    )
}

#[test]
fn test_add_and_list() {
    with_test_dir(|| {
        let id = cmd_add(
            AddArgs {
                text: "Book flights".into(),
                priority: Priority::High,
                due: Some("2099-06-01".into()),
                time: Some("14:30".into()),
                ..AddArgs::default()
            },
            true,
        );
        assert!(id.is_some());

        let tasks = tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, id.unwrap());
        assert_eq!(tasks[0].text, "Book flights");
        assert_eq!(tasks[0].priority, Priority::High);
        assert_eq!(tasks[0].due_date, Some(at(2099, 6, 1, 14, 30)));
    });
}

#[test]
fn test_add_date_only_is_end_of_day() {
    with_test_dir(|| {
        add("Taxes", Some("2099-04-15"), None).unwrap();
        assert_eq!(tasks()[0].due_date, Some(at(2099, 4, 15, 23, 59)));
    });
}

#[test]
fn test_add_rejects_bad_input() {
    with_test_dir(|| {
        assert!(add("Bad date", Some("15/04/2099"), None).is_none());
        assert!(add("Bad time", Some("2099-04-15"), Some("25:99")).is_none());
        assert!(add("   ", None, None).is_none());
        assert!(tasks().is_empty());
    });
}

#[test]
fn test_complete_task() {
    with_test_dir(|| {
        let id = add("Task to complete", None, None).unwrap();

        cmd_done(id, true);
        let t = &tasks()[0];
        assert!(t.completed);
        assert!(t.completed_at.is_some());

        cmd_done(id, true);
        let t = &tasks()[0];
        assert!(!t.completed);
        assert!(t.completed_at.is_none());
    });
}

#[test]
fn test_complete_recurring_task_creates_next() {
    with_test_dir(|| {
        let id = cmd_add(
            AddArgs {
                text: "Review budget".into(),
                due: Some("2099-01-01".into()),
                time: Some("09:00".into()),
                recur: Recurrence::Custom,
                every: Some(3),
                unit: Some(RecurrenceUnit::Weeks),
                ..AddArgs::default()
            },
            true,
        )
        .unwrap();

        cmd_done(id, true);

        let tasks = tasks();
        assert_eq!(tasks.len(), 2);
        let next = tasks.iter().find(|t| t.id != id).unwrap();
        assert_eq!(next.original_task_id, Some(id));
        assert_eq!(next.due_date, Some(at(2099, 1, 22, 9, 0)));
        assert!(!next.completed);

        // The copy does not repeat again.
        cmd_done(next.id, true);
        assert_eq!(self::tasks().len(), 2);
    });
}

#[test]
fn test_edit_task() {
    with_test_dir(|| {
        let id = add("Original", Some("2099-03-10"), Some("08:00")).unwrap();

        cmd_edit(
            id,
            EditArgs {
                text: Some("Updated".into()),
                time: Some("17:45".into()),
                priority: Some(Priority::Low),
                ..EditArgs::default()
            },
            true,
        );

        let t = &tasks()[0];
        assert_eq!(t.text, "Updated");
        assert_eq!(t.priority, Priority::Low);
        assert_eq!(t.due_date, Some(at(2099, 3, 10, 17, 45)));

        cmd_edit(id, EditArgs { no_due: true, ..EditArgs::default() }, true);
        assert_eq!(tasks()[0].due_date, None);

        // Blank text leaves the task as it was.
        cmd_edit(id, EditArgs { text: Some(" ".into()), ..EditArgs::default() }, true);
        assert_eq!(tasks()[0].text, "Updated");
    });
}

#[test]
fn test_remove_task() {
    with_test_dir(|| {
        let keep = add("Keep", None, None).unwrap();
        let drop = add("Drop", None, None).unwrap();

        cmd_remove(drop, true);
        cmd_remove(9999, true);

        let tasks = tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, keep);
    });
}

#[test]
fn test_clear_completed() {
    with_test_dir(|| {
        let ids: Vec<u64> = (0..5).map(|i| add(&format!("Task {}", i), None, None).unwrap()).collect();
        cmd_done(ids[0], true);
        cmd_done(ids[4], true);

        assert_eq!(cmd_clear_completed(true), 2);
        assert_eq!(tasks().len(), 3);
        assert_eq!(cmd_clear_completed(true), 0);
    });
}

#[test]
fn test_clear_forced() {
    with_test_dir(|| {
        add("One", None, None).unwrap();
        add("Two", None, None).unwrap();

        cmd_clear(true);
        assert!(tasks().is_empty());
    });
}

#[test]
fn test_settings_saved() {
    with_test_dir(|| {
        cmd_settings(
            SettingsArgs {
                notifications: Some(true),
                reminder_minutes: Some(45),
                phone: Some("not a phone".into()),
                desktop: Some(Permission::Denied),
            },
            true,
        );

        let s = load_settings(&FileStorage::from_env());
        assert!(s.enable_notifications);
        assert_eq!(s.reminder_time, 45);
        assert_eq!(s.phone_number, "not a phone");
        assert_eq!(s.notification_permission, Permission::Denied);

        cmd_settings(SettingsArgs { notifications: Some(false), ..SettingsArgs::default() }, true);
        let s = load_settings(&FileStorage::from_env());
        assert!(!s.enable_notifications);
        assert_eq!(s.reminder_time, 45);
    });
}

#[test]
fn test_settings_reset_sent_reminders() {
    with_test_dir(|| {
        let id = add("Call mom", Some("2099-05-05"), None).unwrap();
        let storage = FileStorage::from_env();
        let mut stored = load_tasks(&storage);
        stored[0].reminder_sent = true;
        tickler::storage::save_tasks(&storage, &stored).unwrap();

        cmd_settings(SettingsArgs { reminder_minutes: Some(5), ..SettingsArgs::default() }, true);

        let t = tasks().into_iter().find(|t| t.id == id).unwrap();
        assert!(!t.reminder_sent);
    });
}
