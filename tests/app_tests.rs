use chrono::{NaiveDate, NaiveDateTime};
use tickler::clock::ManualClock;
use tickler::engine::Engine;
use tickler::models::{Permission, Priority, Recurrence, RecurrenceUnit, SortKey, SortOrder};
use tickler::notify::Dispatcher;
use tickler::storage::{self, MemoryStorage};
use tickler::store::NewTask;
use tickler::tui::app::{parse_recurrence_input, App, InputField, InputMode, ViewMode};

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
}

fn type_line<S: tickler::storage::Storage, C: tickler::clock::Clock>(app: &mut App<S, C>, line: &str) {
    app.input_buffer = line.to_string();
    app.handle_input();
}

#[test]
fn test_parse_recurrence_input() {
    assert_eq!(parse_recurrence_input("").unwrap(), (Recurrence::None, None, None));
    assert_eq!(parse_recurrence_input("weekly").unwrap(), (Recurrence::Weekly, None, None));
    assert_eq!(
        parse_recurrence_input("3 weeks").unwrap(),
        (Recurrence::Custom, Some(3), Some(RecurrenceUnit::Weeks))
    );
    assert_eq!(
        parse_recurrence_input("custom 2 months").unwrap(),
        (Recurrence::Custom, Some(2), Some(RecurrenceUnit::Months))
    );
    assert!(parse_recurrence_input("0 days").is_err());
    assert!(parse_recurrence_input("every other tuesday").is_err());
}

#[test]
fn test_first_run_asks_for_permission() {
    let storage = MemoryStorage::new();
    let clock = ManualClock::new(at(2025, 1, 1, 8, 0));
    let mut app = App::new(Engine::open(&storage, &clock, Dispatcher::toast_only()));
    assert_eq!(app.input_mode, InputMode::Permission);

    app.answer_permission(Permission::Granted);
    assert_eq!(app.input_mode, InputMode::Normal);
    assert_eq!(storage::load_settings(&storage).notification_permission, Permission::Granted);

    let app = App::new(Engine::open(&storage, &clock, Dispatcher::toast_only()));
    assert_eq!(app.input_mode, InputMode::Normal);
}

#[test]
fn test_add_wizard() {
    let storage = MemoryStorage::new();
    let clock = ManualClock::new(at(2025, 1, 1, 8, 0));
    let mut app = App::new(Engine::open(&storage, &clock, Dispatcher::toast_only()));
    app.answer_permission(Permission::Denied);

    app.start_add();
    assert_eq!(app.input_mode, InputMode::Adding);
    type_line(&mut app, "Plan trip");
    type_line(&mut app, "not-a-date");
    // Invalid input keeps the wizard on the date step.
    assert_eq!(app.add_state.field(), InputField::Due);
    type_line(&mut app, "2025-03-01");
    type_line(&mut app, "10:15");
    type_line(&mut app, "high");
    type_line(&mut app, "");
    type_line(&mut app, "2 weeks");

    assert_eq!(app.input_mode, InputMode::Normal);
    assert_eq!(app.tasks.len(), 1);
    let t = &app.tasks[0];
    assert_eq!(t.text, "Plan trip");
    assert_eq!(t.due_date, Some(at(2025, 3, 1, 10, 15)));
    assert_eq!(t.priority, Priority::High);
    assert_eq!(t.recurrence, Recurrence::Custom);
    assert_eq!(t.recurrence_interval, 2);
    assert_eq!(t.recurrence_unit, RecurrenceUnit::Weeks);
}

#[test]
fn test_edit_and_toggle_selected() {
    let storage = MemoryStorage::new();
    let clock = ManualClock::new(at(2025, 1, 1, 8, 0));
    let mut engine = Engine::open(&storage, &clock, Dispatcher::toast_only());
    engine
        .add_task(NewTask {
            due_date: NaiveDate::from_ymd_opt(2025, 1, 2),
            ..NewTask::new("Old text")
        })
        .unwrap();
    let mut app = App::new(engine);
    app.answer_permission(Permission::Denied);

    app.start_edit(InputField::Text);
    assert_eq!(app.input_buffer, "Old text");
    type_line(&mut app, "New text");
    assert_eq!(app.input_mode, InputMode::Normal);
    assert_eq!(app.tasks[0].text, "New text");

    app.start_edit(InputField::Time);
    assert_eq!(app.input_buffer, "23:59");
    type_line(&mut app, "07:30");
    assert_eq!(app.tasks[0].due_date, Some(at(2025, 1, 2, 7, 30)));

    app.toggle_selected();
    assert!(app.tasks[0].completed);
}

#[test]
fn test_clear_all_needs_confirmation() {
    let storage = MemoryStorage::new();
    let clock = ManualClock::new(at(2025, 1, 1, 8, 0));
    let mut engine = Engine::open(&storage, &clock, Dispatcher::toast_only());
    engine.add_task(NewTask::new("One")).unwrap();
    engine.add_task(NewTask::new("Two")).unwrap();
    let mut app = App::new(engine);

    app.start_clear_all();
    app.answer_confirm(false);
    assert_eq!(app.tasks.len(), 2);

    app.start_clear_all();
    assert_eq!(app.input_mode, InputMode::Confirm);
    app.answer_confirm(true);
    assert!(app.tasks.is_empty());
    assert_eq!(app.input_mode, InputMode::Normal);
}

#[test]
fn test_sort_toggle_and_settings_rows() {
    let storage = MemoryStorage::new();
    let clock = ManualClock::new(at(2025, 1, 1, 8, 0));
    let mut app = App::new(Engine::open(&storage, &clock, Dispatcher::toast_only()));

    app.toggle_sort(SortKey::Date);
    assert_eq!(app.sort_order, SortOrder::Asc);
    app.toggle_sort(SortKey::Priority);
    assert_eq!((app.sort_by, app.sort_order), (SortKey::Priority, SortOrder::Desc));

    app.toggle_view();
    assert_eq!(app.view_mode, ViewMode::Settings);
    app.activate_setting();
    assert!(app.engine.settings().enable_notifications);

    app.next();
    app.activate_setting();
    assert_eq!(app.input_field, InputField::ReminderMinutes);
    type_line(&mut app, "abc");
    assert_eq!(app.input_mode, InputMode::Editing);
    type_line(&mut app, "15");
    assert_eq!(app.input_mode, InputMode::Normal);
    assert_eq!(storage::load_settings(&storage).reminder_time, 15);
}
