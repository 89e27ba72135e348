use std::io::{self, Write};
use std::thread;
use std::time::Duration as StdDuration;

use chrono::{Datelike, Duration, Local, NaiveDateTime};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use tracing::info;

use crate::calendar::{Month, WEEKDAY_HEADER};
use crate::clock::SystemClock;
use crate::engine::Engine;
use crate::models::{
    Category, Filter, Permission, Priority, Recurrence, RecurrenceUnit, SortKey, SortOrder, Task, TaskEdit, TaskId,
};
use crate::notify::{is_valid_phone_number, Dispatcher};
use crate::scheduler::SWEEP_INTERVAL_SECS;
use crate::storage::FileStorage;
use crate::store::{parse_date, parse_due, parse_time, NewTask};

pub type AppEngine = Engine<FileStorage, SystemClock>;

/// Opens the engine over the on-disk data directory with every notification channel.
pub fn open_engine() -> AppEngine {
    Engine::open(FileStorage::from_env(), SystemClock, Dispatcher::standard())
}

/// Fields for `tickler add`.
#[derive(Debug, Clone, Default)]
pub struct AddArgs {
    pub text: String,
    pub priority: Priority,
    pub due: Option<String>,
    pub time: Option<String>,
    pub category: Category,
    pub recur: Recurrence,
    pub every: Option<u32>,
    pub unit: Option<RecurrenceUnit>,
}

/// Fields for `tickler edit`. Unset fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct EditArgs {
    pub text: Option<String>,
    pub priority: Option<Priority>,
    pub due: Option<String>,
    pub time: Option<String>,
    pub no_due: bool,
    pub category: Option<Category>,
    pub recur: Option<Recurrence>,
    pub every: Option<u32>,
    pub unit: Option<RecurrenceUnit>,
}

/// Changes for `tickler settings`. With nothing set, the current settings are printed.
#[derive(Debug, Clone, Default)]
pub struct SettingsArgs {
    pub notifications: Option<bool>,
    pub phone: Option<String>,
    pub reminder_minutes: Option<u32>,
    pub desktop: Option<Permission>,
}

impl SettingsArgs {
    fn is_empty(&self) -> bool {
        self.notifications.is_none() && self.phone.is_none() && self.reminder_minutes.is_none() && self.desktop.is_none()
    }
}

/// Adds a new task.
///
/// A date without a time is due at 23:59 that day. Blank text is ignored.
pub fn cmd_add(args: AddArgs, silent: bool) -> Option<TaskId> {
    let due = match parse_due(args.due.as_deref(), args.time.as_deref()) {
        Ok(d) => d,
        Err(e) => {
            if !silent { eprintln!("{}", e); }
            return None;
        }
    };
    let new = NewTask {
        text: args.text,
        priority: args.priority,
        due_date: due.map(|d| d.date()),
        due_time: due.map(|d| d.time()),
        category: args.category,
        recurrence: args.recur,
        recurrence_interval: args.every,
        recurrence_unit: args.unit,
    };

    let mut engine = open_engine();
    match engine.add_task(new) {
        Ok(Some(t)) => {
            if !silent { println!("Task added (id = {})", t.id); }
            if !silent {
                if let Some(at) = engine.scheduler().armed_at(t.id) {
                    println!("Reminder set for {}", at.format("%Y-%m-%d %H:%M"));
                }
            }
            Some(t.id)
        }
        Ok(None) => {
            if !silent { eprintln!("Task text cannot be empty."); }
            None
        }
        Err(e) => {
            if !silent { eprintln!("Failed to save tasks: {}", e); }
            None
        }
    }
}

/// Toggles a task between done and open.
///
/// Completing a recurring task creates its next occurrence.
pub fn cmd_done(id: TaskId, silent: bool) {
    let mut engine = open_engine();
    let task = match engine.toggle_completion(id) {
        Ok(t) => t,
        Err(e) => {
            if !silent { eprintln!("{}", e); }
            return;
        }
    };
    if !silent {
        if task.completed {
            println!("Task {} marked as complete.", id);
        } else {
            println!("Task {} reopened.", id);
        }
    }
    match engine.flush_deferred() {
        Ok(spawned) => {
            for t in spawned {
                if !silent {
                    match t.due_date {
                        Some(due) => println!("Recurring task created (id = {}) due {}", t.id, due.format("%Y-%m-%d %H:%M")),
                        None => println!("Recurring task created (id = {})", t.id),
                    }
                }
            }
        }
        Err(e) => {
            if !silent { eprintln!("Failed to create recurring task: {}", e); }
        }
    }
}

/// Edits an existing task's details.
pub fn cmd_edit(id: TaskId, args: EditArgs, silent: bool) {
    let mut engine = open_engine();
    let Some(current) = engine.task(id).cloned() else {
        if !silent { eprintln!("Task {} not found.", id); }
        return;
    };

    let mut edit = TaskEdit::from_task(&current);
    if let Some(text) = args.text { edit.text = text; }
    if let Some(p) = args.priority { edit.priority = p; }
    if let Some(c) = args.category { edit.category = c; }
    if let Some(r) = args.recur { edit.recurrence = r; }
    if let Some(n) = args.every { edit.recurrence_interval = n; }
    if let Some(u) = args.unit { edit.recurrence_unit = u; }
    if args.no_due {
        edit.due_date = None;
    } else if args.due.is_some() || args.time.is_some() {
        match merge_due(current.due_date, args.due.as_deref(), args.time.as_deref()) {
            Ok(due) => edit.due_date = due,
            Err(e) => {
                if !silent { eprintln!("{}", e); }
                return;
            }
        }
    }

    match engine.edit_task(id, edit) {
        Ok(Some(_)) => {
            if !silent { println!("Task {} updated.", id); }
        }
        Ok(None) => {
            if !silent { eprintln!("Task text cannot be empty."); }
        }
        Err(e) => {
            if !silent { eprintln!("Failed to save tasks: {}", e); }
        }
    }
}

/// Applies a new date and/or time to an existing due instant. A time alone keeps the old date.
fn merge_due(current: Option<NaiveDateTime>, date: Option<&str>, time: Option<&str>) -> crate::Result<Option<NaiveDateTime>> {
    match (date, time) {
        (Some(_), _) => parse_due(date, time),
        (None, Some(t)) => {
            let time = parse_time(t)?;
            Ok(current.map(|d| d.date().and_time(time)))
        }
        (None, None) => Ok(current),
    }
}

/// Removes a task by ID.
pub fn cmd_remove(id: TaskId, silent: bool) {
    let mut engine = open_engine();
    match engine.delete_task(id) {
        Ok(_) => {
            if !silent { println!("Task {} removed.", id); }
        }
        Err(e) => {
            if !silent { eprintln!("{}", e); }
        }
    }
}

/// Removes all completed tasks.
pub fn cmd_clear_completed(silent: bool) -> usize {
    let mut engine = open_engine();
    match engine.delete_completed() {
        Ok(n) => {
            if !silent { println!("Deleted {} completed tasks.", n); }
            n
        }
        Err(e) => {
            if !silent { eprintln!("Failed to save tasks: {}", e); }
            0
        }
    }
}

/// Deletes every task, after confirmation unless `force` is set.
pub fn cmd_clear(force: bool) {
    if !force {
        print!("Are you sure you want to delete all tasks? This cannot be undone. [y/N] ");
        if io::stdout().flush().is_err() {
            return;
        }
        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() || input.trim().to_lowercase() != "y" {
            println!("Aborted.");
            return;
        }
    }

    let mut engine = open_engine();
    match engine.clear_all() {
        Ok(n) => println!("All tasks cleared ({} removed).", n),
        Err(e) => eprintln!("Failed to clear tasks: {}", e),
    }
}

fn due_text(t: &Task) -> String {
    t.due_date
        .map(|d| d.format("%b %-d, %-I:%M %p").to_string())
        .unwrap_or_else(|| "No due date".to_string())
}

fn recurrence_text(t: &Task) -> String {
    match t.recurrence {
        Recurrence::None => String::new(),
        Recurrence::Custom => format!("every {} {}", t.recurrence_interval, t.recurrence_unit),
        r => r.to_string(),
    }
}

/// Lists tasks in a formatted table.
pub fn cmd_list(filter: Filter, sort_by: SortKey, order: SortOrder) {
    let engine = open_engine();
    let tasks = engine.get_filtered(filter, sort_by, order);
    if tasks.is_empty() {
        if filter == Filter::All {
            println!("No tasks found. Add your first task to get started!");
        } else {
            println!("No tasks match your current filter.");
        }
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Task").add_attribute(Attribute::Bold),
            Cell::new("Priority").add_attribute(Attribute::Bold),
            Cell::new("Due").add_attribute(Attribute::Bold),
            Cell::new("Category").add_attribute(Attribute::Bold),
            Cell::new("Repeats").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
        ]);

    let now = engine.now();
    let count = tasks.len();
    for t in tasks {
        let overdue = !t.completed && t.due_date.is_some_and(|d| d < now);
        let priority_color = match t.priority {
            Priority::High => Color::Red,
            Priority::Medium => Color::Yellow,
            Priority::Low => Color::Green,
        };
        let status = if t.completed { "Done" } else { "Pending" };
        let status_color = if t.completed { Color::Green } else { Color::Yellow };

        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.text),
            Cell::new(t.priority).fg(priority_color),
            Cell::new(due_text(&t)).fg(if overdue { Color::Red } else { Color::Reset }),
            Cell::new(t.category),
            Cell::new(recurrence_text(&t)),
            Cell::new(status).fg(status_color),
        ]);
    }

    println!("{table}");
    println!("{} task{}", count, if count == 1 { "" } else { "s" });
}

/// Shows task counts and the completion progress.
pub fn cmd_stats() {
    let engine = open_engine();
    let stats = engine.store().stats();
    println!(
        "Total: {}  Active: {}  Completed: {}  Progress: {:.0}%",
        stats.total, stats.active, stats.completed, stats.progress()
    );
}

/// Prints a month grid, marking days that have tasks due with `*`.
///
/// `month` is `YYYY-MM`; defaults to the current month.
pub fn cmd_calendar(month: Option<String>) {
    let today = Local::now().date_naive();
    let month = match month {
        Some(m) => match parse_date(&format!("{}-01", m.trim())) {
            Ok(d) => Month::containing(d),
            Err(_) => {
                eprintln!("Invalid month '{}'. Use YYYY-MM.", m);
                return;
            }
        },
        None => Month::containing(today),
    };

    let engine = open_engine();
    let busy = engine.store().days_with_tasks(month.year, month.month);

    println!("{:^28}", month.title());
    println!("{}", WEEKDAY_HEADER.map(|d| format!(" {} ", d)).join(""));
    for week in month.cells().chunks(7) {
        let line: String = week
            .iter()
            .map(|cell| match cell {
                None => "    ".to_string(),
                Some(day) => {
                    let is_today = Month::containing(today) == month && *day == today.day();
                    let mark = if busy.contains(day) { '*' } else if is_today { '<' } else { ' ' };
                    format!("{:>3}{}", day, mark)
                }
            })
            .collect();
        println!("{}", line.trim_end());
    }
}

/// Shows or updates the notification settings.
///
/// Saving re-evaluates every reminder under the new settings.
pub fn cmd_settings(args: SettingsArgs, silent: bool) {
    let mut engine = open_engine();
    if args.is_empty() {
        let s = engine.settings();
        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(vec!["Setting", "Value"]);
        table.add_row(vec!["Notifications".to_string(), if s.enable_notifications { "on" } else { "off" }.to_string()]);
        table.add_row(vec!["Reminder time".to_string(), format!("{} minutes before", s.reminder_time)]);
        let phone = if s.phone_number.is_empty() {
            "-".to_string()
        } else if is_valid_phone_number(&s.phone_number) {
            s.phone_number.clone()
        } else {
            format!("{} (invalid, SMS disabled)", s.phone_number)
        };
        table.add_row(vec!["Phone number".to_string(), phone]);
        table.add_row(vec!["Desktop popups".to_string(), s.notification_permission.to_string()]);
        println!("{table}");
        return;
    }

    let mut settings = engine.settings().clone();
    if let Some(on) = args.notifications { settings.enable_notifications = on; }
    if let Some(phone) = args.phone {
        if !phone.is_empty() && !is_valid_phone_number(&phone) && !silent {
            eprintln!("Warning: '{}' does not look like a phone number; SMS reminders stay off.", phone);
        }
        settings.phone_number = phone;
    }
    if let Some(m) = args.reminder_minutes { settings.reminder_time = m; }
    if let Some(p) = args.desktop { settings.notification_permission = p; }

    match engine.save_settings(settings) {
        Ok(()) => {
            if !silent { println!("Notification settings saved!"); }
        }
        Err(e) => {
            if !silent { eprintln!("Failed to save settings: {}", e); }
        }
    }
}

/// Runs in the foreground delivering reminders until interrupted.
///
/// Re-reads the data files once per sweep so that settings changed from other
/// terminals take effect. Task changes are picked up by the engine itself.
pub fn cmd_watch() {
    let mut engine = open_engine();
    if !engine.settings().enable_notifications {
        println!("Notifications are disabled. Enable them with `tickler settings --notifications true`.");
    }
    if engine.needs_permission() {
        println!("Desktop popups are off. Allow them with `tickler settings --desktop granted`.");
    }
    println!("Watching for reminders (Ctrl-C to stop)...");
    info!(armed = engine.scheduler().armed_count(), "watch started");

    let sweep = Duration::seconds(SWEEP_INTERVAL_SECS);
    let mut last_reload = engine.now();
    loop {
        for reminder in engine.tick() {
            println!("[{}] {}", engine.now().format("%H:%M"), reminder.message);
        }
        let now = engine.now();
        if now - last_reload >= sweep {
            engine.reload();
            last_reload = now;
        }
        let wait = engine
            .next_deadline()
            .map_or(sweep, |at| at - now)
            .clamp(Duration::milliseconds(100), sweep);
        thread::sleep(wait.to_std().unwrap_or(StdDuration::from_secs(1)));
    }
}
