use chrono::Datelike;
use ratatui::widgets::TableState;

use crate::calendar::Month;
use crate::clock::Clock;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::models::{
    Category, Filter, Permission, Priority, Recurrence, RecurrenceUnit, SortKey, SortOrder, Task, TaskEdit, TaskId,
};
use crate::storage::Storage;
use crate::store::{parse_date, parse_time, NewTask};
use crate::toast::ToastKind;

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum InputMode {
    Normal,
    Editing,
    Adding,
    /// Waiting for y/n on a destructive action.
    Confirm,
    /// Waiting for y/n on desktop notifications.
    Permission,
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum ViewMode {
    Tasks,
    Settings,
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum InputField {
    None,
    Text,
    Priority,
    Due,
    Time,
    Category,
    Recur,
    Phone,
    ReminderMinutes,
}

/// Steps of the "Add Task" wizard, in order.
pub const ADD_STEPS: [InputField; 6] = [
    InputField::Text,
    InputField::Due,
    InputField::Time,
    InputField::Priority,
    InputField::Category,
    InputField::Recur,
];

/// Parses recurrence input: a pattern name (`weekly`), or a custom step such as
/// `3 weeks` / `custom 3 weeks`. Blank means none.
pub fn parse_recurrence_input(s: &str) -> Result<(Recurrence, Option<u32>, Option<RecurrenceUnit>)> {
    let words: Vec<&str> = s.split_whitespace().collect();
    match words.as_slice() {
        [] => Ok((Recurrence::None, None, None)),
        [name] => Ok((name.parse()?, None, None)),
        ["custom", n, unit] | [n, unit] => {
            let n: u32 = n
                .parse()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| Error::invalid_value("interval", n, "a positive number"))?;
            Ok((Recurrence::Custom, Some(n), Some(unit.parse()?)))
        }
        _ => Err(Error::invalid_value("recurrence", s, "a pattern name or '<n> days|weeks|months'")),
    }
}

/// Text shown for a task's recurrence.
pub fn describe_recurrence(t: &Task) -> String {
    match t.recurrence {
        Recurrence::None => String::new(),
        Recurrence::Custom => format!("{} {}", t.recurrence_interval, t.recurrence_unit),
        r => r.to_string(),
    }
}

/// Things that ask for confirmation first.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum ConfirmAction {
    ClearAll,
}

/// State for the multi-step "Add Task" wizard.
#[derive(Default)]
pub struct AddState {
    pub step: usize,
    pub draft: NewTask,
}

impl AddState {
    pub fn field(&self) -> InputField {
        ADD_STEPS.get(self.step).copied().unwrap_or(InputField::None)
    }
}

pub struct App<S: Storage, C: Clock> {
    pub engine: Engine<S, C>,
    pub tasks: Vec<Task>,
    pub state: TableState,
    pub settings_state: TableState,
    pub view_mode: ViewMode,
    pub input_mode: InputMode,
    pub input_field: InputField,
    pub input_buffer: String,
    pub target_id: Option<TaskId>,
    pub add_state: AddState,
    pub confirm: Option<ConfirmAction>,
    pub filter: Filter,
    pub sort_by: SortKey,
    pub sort_order: SortOrder,
    pub month: Month,
}

impl<S: Storage, C: Clock> App<S, C> {
    /// Wraps an opened engine. Asks for desktop notification permission if it was never answered.
    pub fn new(engine: Engine<S, C>) -> Self {
        let month = Month::containing(engine.now().date());
        let mut settings_state = TableState::default();
        settings_state.select(Some(0));
        let input_mode = if engine.needs_permission() { InputMode::Permission } else { InputMode::Normal };
        let mut app = App {
            engine,
            tasks: Vec::new(),
            state: TableState::default(),
            settings_state,
            view_mode: ViewMode::Tasks,
            input_mode,
            input_field: InputField::None,
            input_buffer: String::new(),
            target_id: None,
            add_state: AddState::default(),
            confirm: None,
            filter: Filter::All,
            sort_by: SortKey::Date,
            sort_order: SortOrder::Desc,
            month,
        };
        app.reload();
        app
    }

    /// Rebuilds the visible task list from the engine.
    pub fn reload(&mut self) {
        self.tasks = self.engine.get_filtered(self.filter, self.sort_by, self.sort_order);
        if self.tasks.is_empty() {
            self.state.select(None);
        } else if let Some(i) = self.state.selected() {
            if i >= self.tasks.len() {
                self.state.select(Some(self.tasks.len() - 1));
            }
        } else {
            self.state.select(Some(0));
        }
    }

    /// Runs due timers and refreshes the list if anything changed.
    pub fn tick(&mut self) {
        self.engine.tick();
        if self.engine.take_render_request() {
            self.reload();
        }
    }

    fn report<T>(&mut self, result: Result<T>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                self.engine.toast(e.to_string(), ToastKind::Error);
                None
            }
        }
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.state.selected().and_then(|i| self.tasks.get(i))
    }

    /// Selects the next item in the current list.
    pub fn next(&mut self) {
        let (state, len) = match self.view_mode {
            ViewMode::Tasks => (&mut self.state, self.tasks.len()),
            ViewMode::Settings => (&mut self.settings_state, SETTINGS_ROWS),
        };
        if len == 0 { return; }
        let i = match state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        state.select(Some(i));
    }

    /// Selects the previous item in the current list.
    pub fn previous(&mut self) {
        let (state, len) = match self.view_mode {
            ViewMode::Tasks => (&mut self.state, self.tasks.len()),
            ViewMode::Settings => (&mut self.settings_state, SETTINGS_ROWS),
        };
        if len == 0 { return; }
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }

    /// Toggles completion of the selected task.
    pub fn toggle_selected(&mut self) {
        if self.view_mode != ViewMode::Tasks { return; }
        if let Some(id) = self.selected_task().map(|t| t.id) {
            let result = self.engine.toggle_completion(id);
            self.report(result);
            self.reload();
        }
    }

    /// Deletes the selected task.
    pub fn delete_selected(&mut self) {
        if self.view_mode != ViewMode::Tasks { return; }
        if let Some(id) = self.selected_task().map(|t| t.id) {
            let result = self.engine.delete_task(id);
            self.report(result);
            self.reload();
        }
    }

    pub fn delete_completed(&mut self) {
        let result = self.engine.delete_completed();
        self.report(result);
        self.reload();
    }

    /// Asks before wiping every task.
    pub fn start_clear_all(&mut self) {
        self.confirm = Some(ConfirmAction::ClearAll);
        self.input_mode = InputMode::Confirm;
    }

    pub fn answer_confirm(&mut self, yes: bool) {
        if let (true, Some(ConfirmAction::ClearAll)) = (yes, self.confirm) {
            let result = self.engine.clear_all();
            self.report(result);
        }
        self.confirm = None;
        self.input_mode = InputMode::Normal;
        self.reload();
    }

    pub fn answer_permission(&mut self, permission: Permission) {
        let result = self.engine.set_permission(permission);
        self.report(result);
        self.input_mode = InputMode::Normal;
    }

    /// Cycles all -> active -> completed.
    pub fn cycle_filter(&mut self) {
        self.filter = self.filter.next();
        self.reload();
    }

    /// Sorting by the current key again flips the order; a new key starts descending.
    pub fn toggle_sort(&mut self, key: SortKey) {
        if self.sort_by == key {
            self.sort_order = self.sort_order.flip();
        } else {
            self.sort_by = key;
            self.sort_order = SortOrder::Desc;
        }
        self.reload();
    }

    pub fn change_month(&mut self, delta: i32) {
        self.month = self.month.shift(delta);
    }

    /// Toggles between the Tasks and Settings views.
    pub fn toggle_view(&mut self) {
        self.view_mode = match self.view_mode {
            ViewMode::Tasks => ViewMode::Settings,
            ViewMode::Settings => ViewMode::Tasks,
        };
    }

    pub fn dismiss_toast(&mut self) {
        self.engine.dismiss_toast();
    }

    /// Initiates the "Add Task" wizard.
    pub fn start_add(&mut self) {
        if self.view_mode != ViewMode::Tasks { return; }
        self.input_mode = InputMode::Adding;
        self.add_state = AddState::default();
        self.input_buffer.clear();
    }

    /// Initiates editing of a specific field for the selected task.
    pub fn start_edit(&mut self, field: InputField) {
        if self.view_mode != ViewMode::Tasks { return; }
        let Some(t) = self.selected_task() else { return };
        let id = t.id;
        let prefill = match field {
            InputField::Text => t.text.clone(),
            InputField::Priority => t.priority.to_string(),
            InputField::Due => t.due_date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
            InputField::Time => t.due_date.map(|d| d.format("%H:%M").to_string()).unwrap_or_default(),
            InputField::Category => t.category.to_string(),
            InputField::Recur => match t.recurrence {
                Recurrence::None => String::new(),
                _ => describe_recurrence(t),
            },
            _ => String::new(),
        };
        self.target_id = Some(id);
        self.input_mode = InputMode::Editing;
        self.input_field = field;
        self.input_buffer = prefill;
    }

    /// Starts editing the selected settings row, or flips it if it is a switch.
    pub fn activate_setting(&mut self) {
        let mut settings = self.engine.settings().clone();
        match self.settings_state.selected() {
            Some(0) => {
                settings.enable_notifications = !settings.enable_notifications;
                let result = self.engine.save_settings(settings);
                self.report(result);
            }
            Some(1) => {
                self.input_field = InputField::ReminderMinutes;
                self.input_buffer = settings.reminder_time.to_string();
                self.input_mode = InputMode::Editing;
            }
            Some(2) => {
                self.input_field = InputField::Phone;
                self.input_buffer = settings.phone_number;
                self.input_mode = InputMode::Editing;
            }
            Some(3) => {
                settings.notification_permission = match settings.notification_permission {
                    Permission::Granted => Permission::Denied,
                    _ => Permission::Granted,
                };
                let result = self.engine.save_settings(settings);
                self.report(result);
            }
            _ => {}
        }
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
        self.target_id = None;
    }

    /// Handles text input based on the current mode.
    pub fn handle_input(&mut self) {
        match self.input_mode {
            InputMode::Adding => self.handle_adding_input(),
            InputMode::Editing => self.handle_editing_input(),
            _ => {}
        }
    }

    /// Applies one wizard step. Invalid input keeps the wizard on the same step.
    fn handle_adding_input(&mut self) {
        let input = self.input_buffer.trim().to_string();
        let field = self.add_state.field();
        let draft = &mut self.add_state.draft;
        let applied: Result<()> = match field {
            InputField::Text => {
                if input.is_empty() { return; }
                draft.text = input.clone();
                Ok(())
            }
            InputField::Due if !input.is_empty() => parse_date(&input).map(|d| draft.due_date = Some(d)),
            InputField::Time if !input.is_empty() => parse_time(&input).map(|t| draft.due_time = Some(t)),
            InputField::Priority if !input.is_empty() => input.parse::<Priority>().map(|p| draft.priority = p),
            InputField::Category if !input.is_empty() => input.parse::<Category>().map(|c| draft.category = c),
            InputField::Recur => parse_recurrence_input(&input).map(|(r, n, u)| {
                draft.recurrence = r;
                draft.recurrence_interval = n;
                draft.recurrence_unit = u;
            }),
            _ => Ok(()),
        };
        if self.report(applied).is_none() {
            return;
        }
        self.input_buffer.clear();
        self.add_state.step += 1;
        if self.add_state.step >= ADD_STEPS.len() {
            let draft = std::mem::take(&mut self.add_state.draft);
            let result = self.engine.add_task(draft);
            self.report(result);
            self.input_mode = InputMode::Normal;
            self.reload();
        }
    }

    /// Handles input for the edit prompt.
    fn handle_editing_input(&mut self) {
        let input = self.input_buffer.trim().to_string();
        let result = match self.input_field {
            InputField::Phone | InputField::ReminderMinutes => self.apply_setting(&input),
            _ => match self.target_id.and_then(|id| self.engine.task(id)).cloned() {
                Some(task) => self.apply_task_edit(task, &input),
                None => Ok(()),
            },
        };
        if self.report(result).is_none() {
            return;
        }
        self.cancel_input();
        self.reload();
    }

    fn apply_task_edit(&mut self, task: Task, input: &str) -> Result<()> {
        let mut edit = TaskEdit::from_task(&task);
        match self.input_field {
            InputField::Text => edit.text = input.to_string(),
            InputField::Priority => edit.priority = input.parse()?,
            InputField::Category => edit.category = input.parse()?,
            InputField::Due => {
                edit.due_date = if input.is_empty() {
                    None
                } else {
                    let date = parse_date(input)?;
                    let time = task.due_date.map(|d| d.time()).unwrap_or_else(crate::store::end_of_day);
                    Some(date.and_time(time))
                };
            }
            InputField::Time => {
                let time = if input.is_empty() { crate::store::end_of_day() } else { parse_time(input)? };
                edit.due_date = task.due_date.map(|d| d.date().and_time(time));
            }
            InputField::Recur => {
                let (r, n, u) = parse_recurrence_input(input)?;
                edit.recurrence = r;
                edit.recurrence_interval = n.unwrap_or(1);
                edit.recurrence_unit = u.unwrap_or_default();
            }
            _ => return Ok(()),
        }
        self.engine.edit_task(task.id, edit).map(|_| ())
    }

    fn apply_setting(&mut self, input: &str) -> Result<()> {
        let mut settings = self.engine.settings().clone();
        match self.input_field {
            InputField::Phone => settings.phone_number = input.to_string(),
            InputField::ReminderMinutes => {
                settings.reminder_time = input
                    .parse()
                    .map_err(|_| Error::invalid_value("reminder time", input, "whole minutes"))?;
            }
            _ => return Ok(()),
        }
        self.engine.save_settings(settings)
    }

    /// Whether the given day of the shown month is today.
    pub fn is_today(&self, day: u32) -> bool {
        let today = self.engine.now().date();
        Month::containing(today) == self.month && today.day() == day
    }
}

/// Rows in the settings view: notifications, reminder time, phone, desktop popups.
pub const SETTINGS_ROWS: usize = 4;
