use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::Error;

pub type TaskId = u64;

/// Represents a single task in the task list.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    /// Unique identifier for the task.
    pub id: TaskId,
    /// The trimmed, non-empty task text.
    pub text: String,
    /// Whether the task has been completed.
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    /// Local due date and time, if any.
    #[serde(default)]
    pub due_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub recurrence: Recurrence,
    /// Step count for custom recurrence. Always 1 for the fixed patterns.
    #[serde(default = "default_interval")]
    pub recurrence_interval: u32,
    #[serde(default)]
    pub recurrence_unit: RecurrenceUnit,
    /// When the task was created.
    pub created_at: NaiveDateTime,
    /// When the task was last completed. Cleared when it is reopened.
    #[serde(default)]
    pub completed_at: Option<NaiveDateTime>,
    /// Whether the reminder for the current due date already went out.
    #[serde(default)]
    pub reminder_sent: bool,
    /// Id of the task this one was spawned from by recurrence expansion.
    #[serde(default)]
    pub original_task_id: Option<TaskId>,
}

fn default_interval() -> u32 {
    1
}

impl Task {
    /// True when completing this task should spawn the next occurrence.
    ///
    /// Spawned occurrences never repeat again, which keeps recurrence chains one link long.
    pub fn spawns_recurrence(&self) -> bool {
        self.recurrence != Recurrence::None && self.original_task_id.is_none()
    }

    /// The instant a reminder `minutes` before the due date should fire.
    pub fn reminder_at(&self, minutes: u32) -> Option<NaiveDateTime> {
        self.due_date.map(|due| due - Duration::minutes(i64::from(minutes)))
    }

    /// Instant used by the date sort: the due date, else the creation time.
    pub fn sort_instant(&self) -> NaiveDateTime {
        self.due_date.unwrap_or(self.created_at)
    }
}

/// Notification preferences, replaced wholesale on save.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub enable_notifications: bool,
    /// Number for the SMS channel. Ignored unless it looks like a phone number.
    #[serde(default)]
    pub phone_number: String,
    /// Minutes before the due date at which reminders fire.
    #[serde(default = "default_reminder_time")]
    pub reminder_time: u32,
    /// Whether desktop popups may be shown.
    #[serde(default)]
    pub notification_permission: Permission,
}

fn default_reminder_time() -> u32 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable_notifications: false,
            phone_number: String::new(),
            reminder_time: default_reminder_time(),
            notification_permission: Permission::Default,
        }
    }
}

/// Fields a user may overwrite on an existing task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskEdit {
    pub text: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDateTime>,
    pub category: Category,
    pub recurrence: Recurrence,
    pub recurrence_interval: u32,
    pub recurrence_unit: RecurrenceUnit,
}

impl TaskEdit {
    /// Starts an edit pre-filled with the task's current values.
    pub fn from_task(task: &Task) -> Self {
        Self {
            text: task.text.clone(),
            priority: task.priority,
            due_date: task.due_date,
            category: task.category,
            recurrence: task.recurrence,
            recurrence_interval: task.recurrence_interval,
            recurrence_unit: task.recurrence_unit,
        }
    }
}

// Each enum below serializes as its lowercase name and parses the same names.

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Sort weight: high ranks above medium above low.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Personal,
    Work,
    Shopping,
    Health,
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Personal,
        Category::Work,
        Category::Shopping,
        Category::Health,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Personal => "personal",
            Category::Work => "work",
            Category::Shopping => "shopping",
            Category::Health => "health",
            Category::Other => "other",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Custom,
}

impl Recurrence {
    pub const ALL: [Recurrence; 6] = [
        Recurrence::None,
        Recurrence::Daily,
        Recurrence::Weekly,
        Recurrence::Monthly,
        Recurrence::Yearly,
        Recurrence::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Recurrence::None => "none",
            Recurrence::Daily => "daily",
            Recurrence::Weekly => "weekly",
            Recurrence::Monthly => "monthly",
            Recurrence::Yearly => "yearly",
            Recurrence::Custom => "custom",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceUnit {
    #[default]
    Days,
    Weeks,
    Months,
}

impl RecurrenceUnit {
    pub const ALL: [RecurrenceUnit; 3] = [RecurrenceUnit::Days, RecurrenceUnit::Weeks, RecurrenceUnit::Months];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceUnit::Days => "days",
            RecurrenceUnit::Weeks => "weeks",
            RecurrenceUnit::Months => "months",
        }
    }
}

/// Desktop notification permission, as a browser would track it per page.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Not asked yet.
    #[default]
    Default,
    Granted,
    Denied,
}

impl Permission {
    pub const ALL: [Permission; 3] = [Permission::Default, Permission::Granted, Permission::Denied];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Default => "default",
            Permission::Granted => "granted",
            Permission::Denied => "denied",
        }
    }
}

/// Which tasks a list projection shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    pub const ALL: [Filter; 3] = [Filter::All, Filter::Active, Filter::Completed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Active => "active",
            Filter::Completed => "completed",
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !task.completed,
            Filter::Completed => task.completed,
        }
    }

    /// Cycles all -> active -> completed -> all.
    pub fn next(&self) -> Filter {
        match self {
            Filter::All => Filter::Active,
            Filter::Active => Filter::Completed,
            Filter::Completed => Filter::All,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Date,
    Priority,
}

impl SortKey {
    pub const ALL: [SortKey; 2] = [SortKey::Date, SortKey::Priority];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Date => "date",
            SortKey::Priority => "priority",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub const ALL: [SortOrder; 2] = [SortOrder::Asc, SortOrder::Desc];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn flip(&self) -> SortOrder {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

/// Implements `Display` and case-insensitive `FromStr` over an enum's `ALL`/`as_str`.
macro_rules! string_enum {
    ($ty:ident, $kind:literal, $expected:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_lowercase();
                $ty::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| Error::invalid_value($kind, s, $expected))
            }
        }
    };
}

string_enum!(Priority, "priority", "low, medium, high");
string_enum!(Category, "category", "personal, work, shopping, health, other");
string_enum!(Recurrence, "recurrence", "none, daily, weekly, monthly, yearly, custom");
string_enum!(RecurrenceUnit, "recurrence unit", "days, weeks, months");
string_enum!(Permission, "permission", "default, granted, denied");
string_enum!(Filter, "filter", "all, active, completed");
string_enum!(SortKey, "sort key", "date, priority");
string_enum!(SortOrder, "sort order", "asc, desc");
