pub mod app;
pub mod ui;

use std::time::Duration;
use std::{error::Error, io};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use app::{App, InputField, InputMode, ViewMode};
use ui::ui;
use crate::clock::Clock;
use crate::commands::open_engine;
use crate::models::{Permission, SortKey};
use crate::storage::Storage;

/// Upper bound on how long the loop waits for a key before checking timers.
const MAX_POLL: Duration = Duration::from_millis(500);

pub fn run_tui() -> Result<(), Box<dyn Error>> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app state
    let mut app = App::new(open_engine());

    // Run loop
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{:?}", err)
    }

    Ok(())
}

/// How long to wait for input before the next timer is due.
fn poll_timeout<S: Storage, C: Clock>(app: &App<S, C>) -> Duration {
    let now = app.engine.now();
    app.engine
        .next_deadline()
        .and_then(|at| (at - now).to_std().ok())
        .map_or(MAX_POLL, |d| d.min(MAX_POLL))
}

fn run_app<B: Backend, S: Storage, C: Clock>(terminal: &mut Terminal<B>, app: &mut App<S, C>) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if !event::poll(poll_timeout(app))? {
            app.tick();
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match app.input_mode {
            InputMode::Normal => match app.view_mode {
                ViewMode::Tasks => match key.code {
                    KeyCode::Char('q') => return Ok(()),
                    KeyCode::Down | KeyCode::Char('j') => app.next(),
                    KeyCode::Up | KeyCode::Char('k') => app.previous(),
                    KeyCode::Char(' ') => app.toggle_selected(),
                    KeyCode::Char('d') | KeyCode::Delete => app.delete_selected(),
                    KeyCode::Char('D') => app.delete_completed(),
                    KeyCode::Char('X') => app.start_clear_all(),
                    KeyCode::Char('a') => app.start_add(),
                    KeyCode::Char('e') => app.start_edit(InputField::Text),
                    KeyCode::Char('p') => app.start_edit(InputField::Priority),
                    KeyCode::Char('t') => app.start_edit(InputField::Due),
                    KeyCode::Char('T') => app.start_edit(InputField::Time),
                    KeyCode::Char('c') => app.start_edit(InputField::Category),
                    KeyCode::Char('r') => app.start_edit(InputField::Recur),
                    KeyCode::Char('f') => app.cycle_filter(),
                    KeyCode::Char('s') => app.toggle_sort(SortKey::Date),
                    KeyCode::Char('P') => app.toggle_sort(SortKey::Priority),
                    KeyCode::Char('<') | KeyCode::Char('[') => app.change_month(-1),
                    KeyCode::Char('>') | KeyCode::Char(']') => app.change_month(1),
                    KeyCode::Char('x') => app.dismiss_toast(),
                    KeyCode::Char('v') => app.toggle_view(),
                    _ => {}
                },
                ViewMode::Settings => match key.code {
                    KeyCode::Char('q') => return Ok(()),
                    KeyCode::Down | KeyCode::Char('j') => app.next(),
                    KeyCode::Up | KeyCode::Char('k') => app.previous(),
                    KeyCode::Enter | KeyCode::Char(' ') => app.activate_setting(),
                    KeyCode::Char('x') => app.dismiss_toast(),
                    KeyCode::Char('v') | KeyCode::Esc => app.toggle_view(),
                    _ => {}
                },
            },
            InputMode::Confirm => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => app.answer_confirm(true),
                _ => app.answer_confirm(false),
            },
            InputMode::Permission => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => app.answer_permission(Permission::Granted),
                KeyCode::Char('n') | KeyCode::Char('N') => app.answer_permission(Permission::Denied),
                KeyCode::Esc => app.input_mode = InputMode::Normal,
                _ => {}
            },
            InputMode::Editing | InputMode::Adding => match key.code {
                KeyCode::Enter => app.handle_input(),
                KeyCode::Esc => app.cancel_input(),
                KeyCode::Char(c) => {
                    app.input_buffer.push(c);
                }
                KeyCode::Backspace => {
                    app.input_buffer.pop();
                }
                _ => {}
            },
        }
        app.tick();
    }
}
