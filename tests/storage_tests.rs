use std::fs;

use chrono::NaiveDate;
use tempfile::TempDir;
use tickler::models::{Category, Permission, Priority, Recurrence, RecurrenceUnit, Settings, Task};
use tickler::storage::{load_settings, load_tasks, save_settings, save_tasks, FileStorage, Storage, StoreKey};

fn sample() -> Task {
    let created = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(8, 0, 0).unwrap();
    Task {
        id: 1735718400000,
        text: "Renew passport".into(),
        completed: false,
        priority: Priority::High,
        due_date: Some(created + chrono::Duration::days(30)),
        category: Category::Other,
        recurrence: Recurrence::Custom,
        recurrence_interval: 2,
        recurrence_unit: RecurrenceUnit::Months,
        created_at: created,
        completed_at: None,
        reminder_sent: true,
        original_task_id: None,
    }
}

#[test]
fn test_missing_files_load_defaults() {
    let dir = TempDir::new().unwrap();
    let storage = FileStorage::new(dir.path().join("never-created"));

    assert!(storage.load(StoreKey::Tasks).unwrap().is_none());
    assert!(load_tasks(&storage).is_empty());
    assert_eq!(load_settings(&storage), Settings::default());
}

#[test]
fn test_tasks_survive_a_restart() {
    let dir = TempDir::new().unwrap();
    let storage = FileStorage::new(dir.path().join("data"));
    save_tasks(&storage, &[sample()]).unwrap();

    assert!(storage.path(StoreKey::Tasks).exists());
    let reopened = FileStorage::new(dir.path().join("data"));
    assert_eq!(load_tasks(&reopened), vec![sample()]);
}

#[test]
fn test_settings_survive_a_restart() {
    let dir = TempDir::new().unwrap();
    let storage = FileStorage::new(dir.path());
    let settings = Settings {
        enable_notifications: true,
        phone_number: "+1 (555) 123-4567".into(),
        reminder_time: 25,
        notification_permission: Permission::Granted,
    };
    save_settings(&storage, &settings).unwrap();

    assert_eq!(load_settings(&storage), settings);
}

#[test]
fn test_malformed_file_is_ignored() {
    let dir = TempDir::new().unwrap();
    let storage = FileStorage::new(dir.path());
    fs::write(storage.path(StoreKey::Tasks), "[{\"id\": \"oops\"").unwrap();

    assert!(load_tasks(&storage).is_empty());
}

#[test]
fn test_older_records_fill_defaults() {
    let dir = TempDir::new().unwrap();
    let storage = FileStorage::new(dir.path());
    let legacy = r#"[{
        "id": 7,
        "text": "Legacy",
        "completed": false,
        "priority": "low",
        "due_date": null,
        "category": "work",
        "recurrence": "none",
        "created_at": "2024-05-01T10:00:00"
    }]"#;
    fs::write(storage.path(StoreKey::Tasks), legacy).unwrap();

    let tasks = load_tasks(&storage);
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].recurrence_interval, 1);
    assert!(!tasks[0].reminder_sent);
    assert_eq!(tasks[0].original_task_id, None);
}

#[test]
fn test_delete_all() {
    let dir = TempDir::new().unwrap();
    let storage = FileStorage::new(dir.path());
    save_tasks(&storage, &[sample()]).unwrap();
    save_settings(&storage, &Settings::default()).unwrap();

    storage.delete_all().unwrap();
    assert!(!storage.path(StoreKey::Tasks).exists());
    assert!(!storage.path(StoreKey::Settings).exists());
    storage.delete_all().unwrap();
}
