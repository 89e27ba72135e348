use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{Error, Result};
use crate::models::{
    Category, Filter, Priority, Recurrence, RecurrenceUnit, SortKey, SortOrder, Task, TaskEdit, TaskId,
};
use crate::recurrence::next_due_date;

/// Time used when a due date is given without a time of day.
pub fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN)
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| Error::InvalidDate(s.to_string()))
}

/// Parses an `HH:MM` time of day.
pub fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|_| Error::InvalidTime(s.to_string()))
}

/// Combines a date and an optional time into a due instant. A time without a date is ignored.
pub fn combine_due(date: Option<NaiveDate>, time: Option<NaiveTime>) -> Option<NaiveDateTime> {
    date.map(|d| d.and_time(time.unwrap_or_else(end_of_day)))
}

/// Parses optional date/time strings from user input. Blank strings count as absent.
pub fn parse_due(date: Option<&str>, time: Option<&str>) -> Result<Option<NaiveDateTime>> {
    let date = date.filter(|s| !s.trim().is_empty()).map(parse_date).transpose()?;
    let time = time.filter(|s| !s.trim().is_empty()).map(parse_time).transpose()?;
    Ok(combine_due(date, time))
}

/// Input for a new task.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewTask {
    pub text: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
    pub category: Category,
    pub recurrence: Recurrence,
    pub recurrence_interval: Option<u32>,
    pub recurrence_unit: Option<RecurrenceUnit>,
}

impl NewTask {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Self::default() }
    }
}

/// Counts shown in the progress panel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Stats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

impl Stats {
    /// Completed share in percent, 0 for an empty list.
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64 * 100.0
        }
    }
}

/// Custom interval/unit only mean something for custom recurrence; the fixed
/// patterns always store one day.
fn normalize_recurrence(recurrence: Recurrence, interval: Option<u32>, unit: Option<RecurrenceUnit>) -> (u32, RecurrenceUnit) {
    if recurrence == Recurrence::Custom {
        (interval.unwrap_or(1).max(1), unit.unwrap_or_default())
    } else {
        (1, RecurrenceUnit::Days)
    }
}

/// The in-memory task collection. Pure bookkeeping: persistence and timers live in the engine.
#[derive(Debug, Default, Clone)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn get_mut(&mut self, id: TaskId) -> Result<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id).ok_or(Error::TaskNotFound(id))
    }

    /// A new id: the current time in milliseconds, bumped past every existing id.
    pub fn fresh_id(&self, now: NaiveDateTime) -> TaskId {
        let stamp = u64::try_from(now.and_utc().timestamp_millis()).unwrap_or(0);
        let next = self.tasks.iter().map(|t| t.id).max().map_or(0, |m| m + 1);
        stamp.max(next)
    }

    /// Appends a task built from `new`.
    ///
    /// # Returns
    /// `None` if the text is blank.
    pub fn add(&mut self, new: NewTask, now: NaiveDateTime) -> Option<Task> {
        let text = new.text.trim();
        if text.is_empty() {
            return None;
        }
        let (recurrence_interval, recurrence_unit) =
            normalize_recurrence(new.recurrence, new.recurrence_interval, new.recurrence_unit);
        let task = Task {
            id: self.fresh_id(now),
            text: text.to_string(),
            completed: false,
            priority: new.priority,
            due_date: combine_due(new.due_date, new.due_time),
            category: new.category,
            recurrence: new.recurrence,
            recurrence_interval,
            recurrence_unit,
            created_at: now,
            completed_at: None,
            reminder_sent: false,
            original_task_id: None,
        };
        self.tasks.push(task.clone());
        Some(task)
    }

    /// Flips completion and stamps or clears `completed_at`.
    ///
    /// # Returns
    /// The task after the flip.
    pub fn toggle(&mut self, id: TaskId, now: NaiveDateTime) -> Result<Task> {
        let task = self.get_mut(id)?;
        task.completed = !task.completed;
        task.completed_at = task.completed.then_some(now);
        Ok(task.clone())
    }

    /// Overwrites the editable fields and makes the reminder eligible again.
    ///
    /// # Returns
    /// `None` if the edited text is blank, in which case nothing changes.
    pub fn edit(&mut self, id: TaskId, edit: TaskEdit) -> Result<Option<Task>> {
        let task = self.get_mut(id)?;
        let text = edit.text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let (recurrence_interval, recurrence_unit) =
            normalize_recurrence(edit.recurrence, Some(edit.recurrence_interval), Some(edit.recurrence_unit));
        task.text = text.to_string();
        task.priority = edit.priority;
        task.due_date = edit.due_date;
        task.category = edit.category;
        task.recurrence = edit.recurrence;
        task.recurrence_interval = recurrence_interval;
        task.recurrence_unit = recurrence_unit;
        task.reminder_sent = false;
        Ok(Some(task.clone()))
    }

    pub fn remove(&mut self, id: TaskId) -> Option<Task> {
        let idx = self.tasks.iter().position(|t| t.id == id)?;
        Some(self.tasks.remove(idx))
    }

    /// Removes every completed task and returns their ids.
    pub fn remove_completed(&mut self) -> Vec<TaskId> {
        let removed = self.tasks.iter().filter(|t| t.completed).map(|t| t.id).collect();
        self.tasks.retain(|t| !t.completed);
        removed
    }

    /// Removes every task and returns their ids.
    pub fn clear(&mut self) -> Vec<TaskId> {
        self.tasks.drain(..).map(|t| t.id).collect()
    }

    /// Appends the next occurrence of `original`.
    ///
    /// `original` may be a snapshot of a task that has since been removed. The copy
    /// keeps every field except a fresh id, an open state, a fresh reminder, the
    /// advanced due date, and a back-reference to its origin.
    ///
    /// # Returns
    /// `None` if the task does not spawn recurrences (not recurring, or itself a
    /// copy), or its next due date is out of range.
    pub fn spawn_recurrence(&mut self, original: &Task, now: NaiveDateTime) -> Option<Task> {
        if !original.spawns_recurrence() {
            return None;
        }
        let due_date = match original.due_date {
            Some(_) => Some(next_due_date(original)?),
            None => None,
        };
        let next = Task {
            id: self.fresh_id(now),
            completed: false,
            completed_at: None,
            due_date,
            reminder_sent: false,
            original_task_id: Some(original.id),
            ..original.clone()
        };
        self.tasks.push(next.clone());
        Some(next)
    }

    pub fn mark_reminder_sent(&mut self, id: TaskId) -> Result<()> {
        self.get_mut(id)?.reminder_sent = true;
        Ok(())
    }

    /// Makes every task eligible for a reminder again.
    pub fn reset_reminders(&mut self) {
        for task in &mut self.tasks {
            task.reminder_sent = false;
        }
    }

    /// Tasks matching `filter`, ordered by `sort_by`.
    ///
    /// Date order compares the due date, falling back to creation time; `Desc`
    /// puts later instants first. Priority order ranks high over medium over low;
    /// `Desc` puts high first. `Asc` inverts either comparison. Ties keep insertion order.
    pub fn filtered(&self, filter: Filter, sort_by: SortKey, order: SortOrder) -> Vec<Task> {
        let mut out: Vec<Task> = self.tasks.iter().filter(|t| filter.matches(t)).cloned().collect();
        out.sort_by(|a, b| {
            let result = match sort_by {
                SortKey::Date => b.sort_instant().cmp(&a.sort_instant()),
                SortKey::Priority => b.priority.rank().cmp(&a.priority.rank()),
            };
            match order {
                SortOrder::Asc => result.reverse(),
                SortOrder::Desc => result,
            }
        });
        out
    }

    pub fn stats(&self) -> Stats {
        let total = self.tasks.len();
        let completed = self.tasks.iter().filter(|t| t.completed).count();
        Stats { total, active: total - completed, completed }
    }

    /// Days of the given month on which at least one task is due.
    pub fn days_with_tasks(&self, year: i32, month: u32) -> BTreeSet<u32> {
        self.tasks
            .iter()
            .filter_map(|t| t.due_date)
            .filter(|d| d.year() == year && d.month() == month)
            .map(|d| d.day())
            .collect()
    }
}
