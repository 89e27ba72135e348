use std::collections::HashMap;

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::models::{Filter, Permission, Settings, SortKey, SortOrder, Task, TaskEdit, TaskId};
use crate::notify::{Dispatcher, Reminder};
use crate::scheduler::{EventKind, Scheduler};
use crate::storage::{self, Storage};
use crate::store::{NewTask, TaskStore};
use crate::toast::{Toast, ToastKind, ToastSlot};

/// The application context: tasks, settings and timers plus the injected
/// storage, clock and notification channels.
///
/// Every mutation first adopts whatever another process saved in the meantime,
/// is persisted before the method returns, and raises the render request that
/// the view polls with [`Engine::take_render_request`].
pub struct Engine<S: Storage, C: Clock> {
    storage: S,
    clock: C,
    dispatcher: Dispatcher,
    store: TaskStore,
    settings: Settings,
    scheduler: Scheduler,
    /// Completed recurring tasks as they were when completed, waiting to be expanded.
    deferred: HashMap<TaskId, Task>,
    toasts: ToastSlot,
    render_requested: bool,
}

impl<S: Storage, C: Clock> Engine<S, C> {
    /// Loads persisted state and arms reminders for it.
    pub fn open(storage: S, clock: C, dispatcher: Dispatcher) -> Self {
        let store = TaskStore::new(storage::load_tasks(&storage));
        let settings = storage::load_settings(&storage);
        let mut engine = Self {
            storage,
            clock,
            dispatcher,
            store,
            settings,
            scheduler: Scheduler::new(),
            deferred: HashMap::new(),
            toasts: ToastSlot::new(),
            render_requested: true,
        };
        let now = engine.now();
        engine.arm_all(now);
        engine.scheduler.start_sweep(now);
        info!(tasks = engine.store.len(), armed = engine.scheduler.armed_count(), "engine ready");
        engine
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn tasks(&self) -> &[Task] {
        self.store.tasks()
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.store.get(id)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Adds a task and arms its reminder.
    ///
    /// # Returns
    /// `None` when the text is blank; nothing is stored in that case.
    pub fn add_task(&mut self, new: NewTask) -> Result<Option<Task>> {
        self.sync_tasks();
        let now = self.now();
        let Some(task) = self.store.add(new, now) else {
            debug!("ignoring task with empty text");
            return Ok(None);
        };
        self.persist_tasks()?;
        self.scheduler.schedule(&task, &self.settings, now);
        info!(task = task.id, "task added");
        self.toast("Task added successfully!", ToastKind::Success);
        Ok(Some(task))
    }

    /// Completes or reopens a task.
    ///
    /// Completing cancels its reminder and, for an original recurring task, queues
    /// the next occurrence from a snapshot of the task, so deleting it in the
    /// meantime does not end the series. Reopening withdraws a queued occurrence
    /// that has not been spawned yet.
    pub fn toggle_completion(&mut self, id: TaskId) -> Result<Task> {
        self.sync_tasks();
        let now = self.now();
        let task = self.store.toggle(id, now)?;
        if task.completed {
            self.scheduler.cancel(id);
            if task.spawns_recurrence() {
                self.scheduler.defer_recurrence(id, now);
                self.deferred.insert(id, task.clone());
            }
        } else {
            self.scheduler.cancel_recurrence(id);
            self.deferred.remove(&id);
        }
        self.persist_tasks()?;
        info!(task = id, completed = task.completed, "task toggled");
        Ok(task)
    }

    /// Overwrites a task's fields and re-arms its reminder.
    ///
    /// # Returns
    /// `None` when the edited text is blank; the task is left untouched.
    pub fn edit_task(&mut self, id: TaskId, edit: TaskEdit) -> Result<Option<Task>> {
        self.sync_tasks();
        let now = self.now();
        let Some(task) = self.store.edit(id, edit)? else {
            debug!(task = id, "ignoring edit with empty text");
            return Ok(None);
        };
        self.persist_tasks()?;
        self.scheduler.cancel(id);
        self.scheduler.schedule(&task, &self.settings, now);
        info!(task = id, "task edited");
        self.toast("Task updated successfully!", ToastKind::Success);
        Ok(Some(task))
    }

    /// Removes a task and its reminder. A next occurrence already queued for it is kept.
    pub fn delete_task(&mut self, id: TaskId) -> Result<Task> {
        self.sync_tasks();
        let task = self.store.remove(id).ok_or(Error::TaskNotFound(id))?;
        self.scheduler.cancel(id);
        self.persist_tasks()?;
        info!(task = id, "task deleted");
        self.toast("Task deleted!", ToastKind::Error);
        Ok(task)
    }

    /// Removes all completed tasks.
    ///
    /// # Returns
    /// The number of tasks removed.
    pub fn delete_completed(&mut self) -> Result<usize> {
        self.sync_tasks();
        let removed = self.store.remove_completed();
        for &id in &removed {
            self.scheduler.cancel(id);
        }
        self.persist_tasks()?;
        info!(count = removed.len(), "completed tasks deleted");
        self.toast(format!("Deleted {} completed tasks!", removed.len()), ToastKind::Success);
        Ok(removed.len())
    }

    /// Removes every task and every armed reminder. Queued occurrences still spawn.
    ///
    /// # Returns
    /// The number of tasks removed.
    pub fn clear_all(&mut self) -> Result<usize> {
        self.sync_tasks();
        self.scheduler.cancel_all();
        let removed = self.store.clear();
        self.persist_tasks()?;
        info!(count = removed.len(), "all tasks cleared");
        self.toast("All tasks cleared!", ToastKind::Success);
        Ok(removed.len())
    }

    /// Spawns the next occurrence of a completed recurring task and arms its reminder.
    ///
    /// Uses the snapshot taken on completion if there is one, else the stored task.
    ///
    /// # Returns
    /// `None` if the task does not repeat, is itself a spawned occurrence, or its
    /// next due date is out of range.
    pub fn expand_recurrence(&mut self, original_id: TaskId) -> Result<Option<Task>> {
        self.sync_tasks();
        self.scheduler.cancel_recurrence(original_id);
        let original = match self.deferred.remove(&original_id) {
            Some(snapshot) => snapshot,
            None => self.store.get(original_id).cloned().ok_or(Error::TaskNotFound(original_id))?,
        };
        let now = self.now();
        let Some(task) = self.store.spawn_recurrence(&original, now) else {
            if original.spawns_recurrence() {
                warn!(task = original_id, "next occurrence is out of range, series ends");
            }
            return Ok(None);
        };
        self.persist_tasks()?;
        self.scheduler.schedule(&task, &self.settings, now);
        info!(task = task.id, original = original_id, due = ?task.due_date, "recurring task created");
        let when = task
            .due_date
            .map(|d| d.format("%-m/%-d/%Y").to_string())
            .unwrap_or_else(|| "no due date".to_string());
        self.toast(format!("Recurring task \"{}\" created for {}", task.text, when), ToastKind::Info);
        Ok(Some(task))
    }

    /// The list projection shown by the views.
    pub fn get_filtered(&self, filter: Filter, sort_by: SortKey, order: SortOrder) -> Vec<Task> {
        self.store.filtered(filter, sort_by, order)
    }

    /// Replaces the settings and re-evaluates every reminder under them.
    ///
    /// All armed reminders are dropped and every task becomes eligible for a reminder again.
    pub fn save_settings(&mut self, settings: Settings) -> Result<()> {
        self.sync_tasks();
        self.settings = settings;
        storage::save_settings(&self.storage, &self.settings)?;
        self.scheduler.cancel_all();
        self.store.reset_reminders();
        self.persist_tasks()?;
        let now = self.now();
        self.arm_all(now);
        info!(enabled = self.settings.enable_notifications, reminder_time = self.settings.reminder_time, "settings saved");
        self.toast("Notification settings saved!", ToastKind::Success);
        Ok(())
    }

    /// True until the user has answered the desktop notification prompt.
    pub fn needs_permission(&self) -> bool {
        self.settings.notification_permission == Permission::Default
    }

    /// Records the user's answer to the desktop notification prompt.
    pub fn set_permission(&mut self, permission: Permission) -> Result<()> {
        self.settings.notification_permission = permission;
        storage::save_settings(&self.storage, &self.settings)?;
        self.render_requested = true;
        Ok(())
    }

    /// Resolves everything that has come due: reminders, queued recurrences, the
    /// periodic sweep and toast expiry.
    ///
    /// Failures while handling one event are logged and surfaced as an error toast;
    /// the remaining events are still handled.
    ///
    /// # Returns
    /// The reminders that fired.
    pub fn tick(&mut self) -> Vec<Reminder> {
        let now = self.now();
        let mut fired = Vec::new();
        if self.scheduler.next_deadline().is_some_and(|at| at <= now) {
            self.sync_tasks();
        }
        for event in self.scheduler.due_events(now) {
            let outcome = match event.kind {
                EventKind::Reminder => self.fire_reminder(event.task_id, now).map(|r| fired.extend(r)),
                EventKind::Recurrence => self.expand_recurrence(event.task_id).map(|_| ()),
            };
            if let Err(e) = outcome {
                warn!(task = event.task_id, kind = ?event.kind, error = %e, "scheduled event failed");
                self.toast(e.to_string(), ToastKind::Error);
            }
        }
        if self.scheduler.sweep_due(now) {
            let armed = self.scheduler.rescan(self.store.tasks(), &self.settings, now);
            if armed > 0 {
                debug!(armed, "sweep armed reminders");
            }
        }
        if self.toasts.expire(now) {
            self.render_requested = true;
        }
        fired
    }

    fn fire_reminder(&mut self, id: TaskId, now: NaiveDateTime) -> Result<Option<Reminder>> {
        let Some(task) = self.store.get(id).filter(|t| !t.completed && !t.reminder_sent) else {
            return Ok(None);
        };
        let reminder = self.dispatcher.fire(task, &self.settings, now, &mut self.toasts);
        self.store.mark_reminder_sent(id)?;
        self.persist_tasks()?;
        Ok(Some(reminder))
    }

    /// Runs every queued recurrence now, without waiting for its delay.
    ///
    /// # Returns
    /// The spawned tasks.
    pub fn flush_deferred(&mut self) -> Result<Vec<Task>> {
        let mut spawned = Vec::new();
        for id in self.scheduler.take_deferred() {
            spawned.extend(self.expand_recurrence(id)?);
        }
        Ok(spawned)
    }

    /// The earliest instant at which [`Engine::tick`] has work to do.
    pub fn next_deadline(&self) -> Option<NaiveDateTime> {
        [self.scheduler.next_deadline(), self.toasts.expires_at()]
            .into_iter()
            .flatten()
            .min()
    }

    /// Re-reads tasks and settings from storage and re-arms reminders.
    ///
    /// Picks up changes made by another process. Queued recurrences are kept.
    pub fn reload(&mut self) {
        self.store = TaskStore::new(storage::load_tasks(&self.storage));
        self.settings = storage::load_settings(&self.storage);
        self.scheduler.cancel_all();
        let now = self.now();
        self.arm_all(now);
        self.render_requested = true;
    }

    pub fn visible_toast(&self) -> Option<&Toast> {
        self.toasts.visible(self.clock.now())
    }

    pub fn dismiss_toast(&mut self) {
        self.toasts.dismiss();
        self.render_requested = true;
    }

    /// Shows an informational toast.
    pub fn toast(&mut self, message: impl Into<String>, kind: ToastKind) {
        let now = self.now();
        self.toasts.show(message, kind, now);
        self.render_requested = true;
    }

    /// Returns whether the view should redraw, and clears the request.
    pub fn take_render_request(&mut self) -> bool {
        std::mem::take(&mut self.render_requested)
    }

    /// Arms reminders for every task through the single scheduling path, then
    /// sweeps for tasks already inside their reminder window.
    fn arm_all(&mut self, now: NaiveDateTime) {
        for task in self.store.tasks() {
            self.scheduler.schedule(task, &self.settings, now);
        }
        self.scheduler.rescan(self.store.tasks(), &self.settings, now);
    }

    /// Adopts task changes another process saved since this engine last read or
    /// wrote the list: reminders of vanished tasks are cancelled, new or changed
    /// tasks are re-armed.
    ///
    /// A missing or unreadable blob leaves the in-memory list alone.
    fn sync_tasks(&mut self) {
        let Some(stored) = storage::read_tasks(&self.storage) else {
            return;
        };
        if stored.as_slice() == self.store.tasks() {
            return;
        }
        let now = self.now();
        for task in self.store.tasks() {
            if !stored.iter().any(|t| t.id == task.id) {
                self.scheduler.cancel(task.id);
            }
        }
        for task in &stored {
            if self.store.get(task.id) != Some(task) {
                self.scheduler.cancel(task.id);
                if !task.reminder_sent {
                    self.scheduler.schedule(task, &self.settings, now);
                }
            }
        }
        debug!(before = self.store.len(), after = stored.len(), "picked up task changes from storage");
        self.store = TaskStore::new(stored);
        self.scheduler.rescan(self.store.tasks(), &self.settings, now);
        self.render_requested = true;
    }

    fn persist_tasks(&mut self) -> Result<()> {
        storage::save_tasks(&self.storage, self.store.tasks())?;
        self.render_requested = true;
        Ok(())
    }
}
