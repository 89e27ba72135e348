use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Gauge, Paragraph, Row, Table},
    Frame,
};
use crate::calendar::WEEKDAY_HEADER;
use crate::clock::Clock;
use crate::models::{Filter, Priority};
use crate::notify::is_valid_phone_number;
use crate::storage::Storage;
use crate::toast::ToastKind;
use super::app::{App, InputField, InputMode, ViewMode, ADD_STEPS};

pub fn ui<S: Storage, C: Clock>(f: &mut Frame, app: &mut App<S, C>) {
    let toast_height = if app.engine.visible_toast().is_some() { 3 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),            // Progress
            Constraint::Min(0),               // Table + calendar
            Constraint::Length(toast_height), // Toast
            Constraint::Length(3),            // Help
        ].as_ref())
        .split(f.area());

    render_progress(f, app, chunks[0]);

    match app.view_mode {
        ViewMode::Tasks => {
            let body = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Min(40), Constraint::Length(32)].as_ref())
                .split(chunks[1]);
            render_tasks(f, app, body[0]);
            render_calendar(f, app, body[1]);
        }
        ViewMode::Settings => render_settings(f, app, chunks[1]),
    }

    if let Some(toast) = app.engine.visible_toast() {
        let color = match toast.kind {
            ToastKind::Success => Color::Green,
            ToastKind::Error => Color::Red,
            ToastKind::Info => Color::Cyan,
            ToastKind::Reminder => Color::Yellow,
        };
        let text = format!("{} {}", toast.kind.icon(), toast.message);
        let p = Paragraph::new(text)
            .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
            .block(Block::default().borders(Borders::ALL).title("x: close"));
        f.render_widget(p, chunks[2]);
    }

    let help_text = match app.input_mode {
        InputMode::Normal => match app.view_mode {
            ViewMode::Tasks => "q: Quit | a: Add | Space: Done | e: Text | p: Prio | t/T: Date/Time | c: Cat | r: Recur | d: Del | D: Del Done | X: Clear | f: Filter | s/P: Sort | [ ]: Month | v: Settings",
            ViewMode::Settings => "q: Quit | Enter: Change | v: View Tasks",
        },
        InputMode::Editing => "Enter: Save | Esc: Cancel",
        InputMode::Adding => "Enter: Next Step (blank to skip) | Esc: Cancel",
        InputMode::Confirm => "y: Confirm | any other key: Cancel",
        InputMode::Permission => "y: Allow | n: Deny | Esc: Ask later",
    };

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(help, chunks[3]);

    render_prompt(f, app);
}

fn render_progress<S: Storage, C: Clock>(f: &mut Frame, app: &App<S, C>, area: Rect) {
    let stats = app.engine.store().stats();
    let label = format!(
        "{}/{} done | {} active",
        stats.completed, stats.total, stats.active
    );
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Progress"))
        .gauge_style(Style::default().fg(Color::Green).bg(Color::Black))
        .percent(stats.progress().round().clamp(0.0, 100.0) as u16)
        .label(label);
    f.render_widget(gauge, area);
}

fn render_tasks<S: Storage, C: Clock>(f: &mut Frame, app: &mut App<S, C>, area: Rect) {
    let now = app.engine.now();
    let rows: Vec<Row> = app
        .tasks
        .iter()
        .map(|t| {
            let overdue = !t.completed && t.due_date.is_some_and(|d| d < now);
            let due = t
                .due_date
                .map(|d| d.format("%b %-d, %-I:%M %p").to_string())
                .unwrap_or_else(|| "No due date".to_string());
            let style = if t.completed {
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT)
            } else if overdue {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            let priority_color = match t.priority {
                Priority::High => Color::Red,
                Priority::Medium => Color::Yellow,
                Priority::Low => Color::Green,
            };

            Row::new(vec![
                Cell::from(if t.completed { "[x]" } else { "[ ]" }),
                Cell::from(t.text.clone()),
                Cell::from(t.priority.to_string()).style(Style::default().fg(priority_color)),
                Cell::from(due),
                Cell::from(t.category.to_string()),
                Cell::from(super::app::describe_recurrence(t)),
            ]).style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(3),
        Constraint::Min(20),
        Constraint::Length(8),
        Constraint::Length(18),
        Constraint::Length(9),
        Constraint::Length(10),
    ];

    let heading = match app.filter {
        Filter::All => "All Tasks",
        Filter::Active => "Active Tasks",
        Filter::Completed => "Completed Tasks",
    };
    let count = app.tasks.len();
    let title = format!(
        "Tickler - {} ({} task{}) - sort: {} {}",
        heading,
        count,
        if count == 1 { "" } else { "s" },
        app.sort_by,
        app.sort_order
    );

    if app.tasks.is_empty() {
        let hint = if app.filter == Filter::All {
            "No tasks found. Press 'a' to add your first task!"
        } else {
            "No tasks match your current filter."
        };
        let p = Paragraph::new(hint)
            .style(Style::default().fg(Color::Gray))
            .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(p, area);
        return;
    }

    let table = Table::new(rows, widths)
        .header(Row::new(vec!["", "Task", "Priority", "Due", "Category", "Repeats"])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .bottom_margin(1))
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_calendar<S: Storage, C: Clock>(f: &mut Frame, app: &App<S, C>, area: Rect) {
    let busy = app.engine.store().days_with_tasks(app.month.year, app.month.month);
    let mut lines = vec![Line::from(
        WEEKDAY_HEADER
            .iter()
            .map(|d| Span::styled(format!("{:>3} ", d), Style::default().fg(Color::Cyan)))
            .collect::<Vec<_>>(),
    )];
    for week in app.month.cells().chunks(7) {
        let spans: Vec<Span> = week
            .iter()
            .map(|cell| match cell {
                None => Span::raw("    "),
                Some(day) => {
                    let mut style = Style::default();
                    if busy.contains(day) {
                        style = style.fg(Color::Yellow).add_modifier(Modifier::BOLD);
                    }
                    if app.is_today(*day) {
                        style = style.add_modifier(Modifier::REVERSED);
                    }
                    Span::styled(format!("{:>3} ", day), style)
                }
            })
            .collect();
        lines.push(Line::from(spans));
    }

    let p = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(app.month.title()));
    f.render_widget(p, area);
}

fn render_settings<S: Storage, C: Clock>(f: &mut Frame, app: &mut App<S, C>, area: Rect) {
    let s = app.engine.settings();
    let phone = if s.phone_number.is_empty() {
        "-".to_string()
    } else if is_valid_phone_number(&s.phone_number) {
        s.phone_number.clone()
    } else {
        format!("{} (invalid, SMS off)", s.phone_number)
    };
    let rows = vec![
        Row::new(vec!["Notifications".to_string(), if s.enable_notifications { "on" } else { "off" }.to_string()]),
        Row::new(vec!["Reminder time".to_string(), format!("{} minutes before due", s.reminder_time)]),
        Row::new(vec!["Phone number".to_string(), phone]),
        Row::new(vec!["Desktop popups".to_string(), s.notification_permission.to_string()]),
    ];

    let table = Table::new(rows, [Constraint::Length(20), Constraint::Min(20)])
        .header(Row::new(vec!["Setting", "Value"])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .bottom_margin(1))
        .block(Block::default().borders(Borders::ALL).title("Tickler - Notification Settings"))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");

    f.render_stateful_widget(table, area, &mut app.settings_state);
}

fn render_prompt<S: Storage, C: Clock>(f: &mut Frame, app: &App<S, C>) {
    let title = match app.input_mode {
        InputMode::Normal => return,
        InputMode::Confirm => "Delete all tasks? This cannot be undone. (y/N)".to_string(),
        InputMode::Permission => "Allow desktop notifications for reminders? (y/n)".to_string(),
        InputMode::Adding => {
            let step = app.add_state.step + 1;
            let total = ADD_STEPS.len();
            let what = match app.add_state.field() {
                InputField::Text => "Enter Task",
                InputField::Due => "Due Date (YYYY-MM-DD, optional)",
                InputField::Time => "Due Time (HH:MM, optional)",
                InputField::Priority => "Priority (low/medium/high, optional)",
                InputField::Category => "Category (personal/work/shopping/health/other)",
                InputField::Recur => "Repeat (daily/weekly/monthly/yearly or '3 weeks')",
                _ => "",
            };
            format!("Add Task {}/{}: {}", step, total, what)
        }
        InputMode::Editing => match app.input_field {
            InputField::Text => "Edit Task",
            InputField::Priority => "Edit Priority (low/medium/high)",
            InputField::Due => "Edit Due Date (YYYY-MM-DD, blank to clear)",
            InputField::Time => "Edit Due Time (HH:MM)",
            InputField::Category => "Edit Category",
            InputField::Recur => "Edit Repeat (none/daily/weekly/monthly/yearly or '3 weeks')",
            InputField::Phone => "Phone Number for SMS",
            InputField::ReminderMinutes => "Minutes Before Due",
            InputField::None => "Edit",
        }
        .to_string(),
    };

    let area = centered_rect(60, 3, f.area()); // Fixed height of 3 (border + 1 line)
    f.render_widget(Clear, area); // Clear the area first
    let body = match app.input_mode {
        InputMode::Editing | InputMode::Adding => app.input_buffer.as_str(),
        _ => "",
    };
    let input = Paragraph::new(body)
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title(title));

    f.render_widget(input, area);
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let margin = r.height.saturating_sub(height) / 2;
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(margin),
            Constraint::Length(height),
            Constraint::Length(margin),
        ].as_ref())
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ].as_ref())
        .split(popup_layout[1])[1]
}
