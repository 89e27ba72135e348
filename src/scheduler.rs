//! Reminder bookkeeping.
//!
//! Nothing here sleeps or spawns. The scheduler only records *when* something
//! should happen; the engine's driver loop asks for [`Scheduler::due_events`] and
//! [`Scheduler::next_deadline`] and resolves them on a single thread.

use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime};
use tracing::{debug, trace};

use crate::models::{Settings, Task, TaskId};

/// Cadence of the periodic rescan.
pub const SWEEP_INTERVAL_SECS: i64 = 60;

/// Delay between completing a recurring task and spawning its next occurrence.
pub const RECURRENCE_DELAY_SECS: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventKind {
    /// Fire the due-date reminder for a task.
    Reminder,
    /// Spawn the next occurrence of a completed recurring task.
    Recurrence,
}

/// A pending piece of work the driver loop must resolve at `fire_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledEvent {
    pub kind: EventKind,
    pub task_id: TaskId,
    pub fire_at: NaiveDateTime,
}

/// Owns every pending timer: one reminder per task, queued recurrences, and the sweep.
#[derive(Debug, Default)]
pub struct Scheduler {
    reminders: HashMap<TaskId, NaiveDateTime>,
    recurrences: HashMap<TaskId, NaiveDateTime>,
    next_sweep: Option<NaiveDateTime>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the reminder for `task` at `due - reminder_time`.
    ///
    /// Does nothing when the task has no due date, is completed, notifications are
    /// disabled, or the reminder instant is not strictly in the future. Any reminder
    /// already armed for the task is replaced.
    ///
    /// # Returns
    /// `true` if a reminder was armed.
    pub fn schedule(&mut self, task: &Task, settings: &Settings, now: NaiveDateTime) -> bool {
        if task.completed || !settings.enable_notifications {
            return false;
        }
        let Some(fire_at) = task.reminder_at(settings.reminder_time) else {
            return false;
        };
        if fire_at <= now {
            trace!(task = task.id, "reminder window already passed");
            return false;
        }
        self.arm(task.id, fire_at);
        true
    }

    fn arm(&mut self, id: TaskId, fire_at: NaiveDateTime) {
        debug!(task = id, %fire_at, "reminder armed");
        self.reminders.insert(id, fire_at);
    }

    /// Clears the reminder for `id`, if any.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let was_armed = self.reminders.remove(&id).is_some();
        if was_armed {
            debug!(task = id, "reminder cancelled");
        }
        was_armed
    }

    /// Clears every armed reminder.
    pub fn cancel_all(&mut self) {
        if !self.reminders.is_empty() {
            debug!(count = self.reminders.len(), "all reminders cancelled");
        }
        self.reminders.clear();
    }

    /// Arms reminders that fell into their window without being armed.
    ///
    /// A task qualifies when it is open, its reminder was not sent yet, it has no
    /// reminder armed, and its due date lies within `reminder_time` minutes from now.
    /// The fire instant is pushed one sweep later than `due - reminder_time` so it
    /// lines up with the sweep cadence, and is never earlier than `now`.
    ///
    /// # Returns
    /// The number of reminders armed.
    pub fn rescan(&mut self, tasks: &[Task], settings: &Settings, now: NaiveDateTime) -> usize {
        if !settings.enable_notifications {
            return 0;
        }
        let window = Duration::minutes(i64::from(settings.reminder_time));
        let mut armed = 0;
        for task in tasks {
            if task.completed || task.reminder_sent || self.reminders.contains_key(&task.id) {
                continue;
            }
            let Some(due) = task.due_date else { continue };
            let until_due = due - now;
            if until_due > Duration::zero() && until_due <= window {
                let aligned = due - window + Duration::seconds(SWEEP_INTERVAL_SECS);
                self.arm(task.id, aligned.max(now));
                armed += 1;
            }
        }
        armed
    }

    /// Queues the recurrence expansion for a just-completed task.
    pub fn defer_recurrence(&mut self, id: TaskId, now: NaiveDateTime) {
        self.recurrences.insert(id, now + Duration::seconds(RECURRENCE_DELAY_SECS));
    }

    pub fn cancel_recurrence(&mut self, id: TaskId) -> bool {
        self.recurrences.remove(&id).is_some()
    }

    /// Removes and returns every queued recurrence regardless of its fire time.
    ///
    /// One-shot commands use this to finish the deferred work before exiting.
    pub fn take_deferred(&mut self) -> Vec<TaskId> {
        let mut pending: Vec<(NaiveDateTime, TaskId)> =
            self.recurrences.drain().map(|(id, at)| (at, id)).collect();
        pending.sort();
        pending.into_iter().map(|(_, id)| id).collect()
    }

    /// Removes and returns every event due at or before `now`, earliest first.
    pub fn due_events(&mut self, now: NaiveDateTime) -> Vec<ScheduledEvent> {
        let mut due = Vec::new();
        self.reminders.retain(|&task_id, &mut fire_at| {
            if fire_at <= now {
                due.push(ScheduledEvent { kind: EventKind::Reminder, task_id, fire_at });
                false
            } else {
                true
            }
        });
        self.recurrences.retain(|&task_id, &mut fire_at| {
            if fire_at <= now {
                due.push(ScheduledEvent { kind: EventKind::Recurrence, task_id, fire_at });
                false
            } else {
                true
            }
        });
        due.sort_by_key(|e| (e.fire_at, e.kind, e.task_id));
        due
    }

    /// Arms the first periodic sweep one interval after `now`.
    pub fn start_sweep(&mut self, now: NaiveDateTime) {
        self.next_sweep = Some(now + Duration::seconds(SWEEP_INTERVAL_SECS));
    }

    /// Returns `true` if a sweep is due, and arms the next one.
    pub fn sweep_due(&mut self, now: NaiveDateTime) -> bool {
        match self.next_sweep {
            Some(at) if at <= now => {
                self.next_sweep = Some(now + Duration::seconds(SWEEP_INTERVAL_SECS));
                true
            }
            _ => false,
        }
    }

    /// The earliest instant at which anything is due.
    pub fn next_deadline(&self) -> Option<NaiveDateTime> {
        self.reminders
            .values()
            .chain(self.recurrences.values())
            .chain(self.next_sweep.iter())
            .min()
            .copied()
    }

    pub fn is_armed(&self, id: TaskId) -> bool {
        self.reminders.contains_key(&id)
    }

    /// The instant the reminder for `id` will fire.
    pub fn armed_at(&self, id: TaskId) -> Option<NaiveDateTime> {
        self.reminders.get(&id).copied()
    }

    pub fn armed_count(&self) -> usize {
        self.reminders.len()
    }

    pub fn has_pending_recurrence(&self, id: TaskId) -> bool {
        self.recurrences.contains_key(&id)
    }
}
