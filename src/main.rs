use std::fs::{self, OpenOptions};
use std::io;
use std::sync::Mutex;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::EnvFilter;

use tickler::commands::*;
use tickler::models::{Category, Filter, Permission, Priority, Recurrence, RecurrenceUnit, SortKey, SortOrder, TaskId};
use tickler::storage::data_dir;
use tickler::tui::run_tui;

#[derive(Parser)]
#[command(name = "tickler")]
#[command(about = "Task list with due-date reminders", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        /// Task text (quoted if it has spaces)
        text: String,
        /// Priority (low, medium, high)
        #[arg(short, long, default_value = "medium")]
        priority: Priority,
        /// Due date in YYYY-MM-DD
        #[arg(short, long)]
        due: Option<String>,
        /// Due time in HH:MM (defaults to 23:59)
        #[arg(short, long)]
        time: Option<String>,
        /// Category (personal, work, shopping, health, other)
        #[arg(short, long, default_value = "personal")]
        category: Category,
        /// Recurrence (none, daily, weekly, monthly, yearly, custom)
        #[arg(short, long, default_value = "none")]
        recur: Recurrence,
        /// Interval for custom recurrence
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        every: Option<u32>,
        /// Unit for custom recurrence (days, weeks, months)
        #[arg(long)]
        unit: Option<RecurrenceUnit>,
    },
    /// List tasks
    List {
        /// Which tasks to show (all, active, completed)
        #[arg(short, long, default_value = "all")]
        filter: Filter,
        /// Sort key (date, priority)
        #[arg(short, long, default_value = "date")]
        sort: SortKey,
        /// Sort order (asc, desc)
        #[arg(short, long, default_value = "desc")]
        order: SortOrder,
    },
    /// Toggle a task between done and open
    Done {
        id: TaskId,
    },
    /// Edit a task
    Edit {
        id: TaskId,
        /// New task text
        #[arg(short = 'x', long)]
        text: Option<String>,
        /// New priority
        #[arg(short, long)]
        priority: Option<Priority>,
        /// New due date
        #[arg(short, long)]
        due: Option<String>,
        /// New due time
        #[arg(short, long)]
        time: Option<String>,
        /// Remove the due date
        #[arg(long, conflicts_with_all = ["due", "time"])]
        no_due: bool,
        /// New category
        #[arg(short, long)]
        category: Option<Category>,
        /// New recurrence
        #[arg(short, long)]
        recur: Option<Recurrence>,
        /// New custom interval
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        every: Option<u32>,
        /// New custom unit
        #[arg(long)]
        unit: Option<RecurrenceUnit>,
    },
    /// Remove a task
    Remove {
        id: TaskId,
    },
    /// Delete all completed tasks
    ClearCompleted,
    /// Delete all tasks
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Show or change notification settings
    Settings {
        /// Turn reminders on or off (true/false)
        #[arg(short, long)]
        notifications: Option<bool>,
        /// Phone number for SMS reminders ("" to clear)
        #[arg(short, long)]
        phone: Option<String>,
        /// Minutes before the due time to remind
        #[arg(short, long)]
        reminder_minutes: Option<u32>,
        /// Desktop popup permission (default, granted, denied)
        #[arg(short, long)]
        desktop: Option<Permission>,
    },
    /// Print a month calendar
    Calendar {
        /// Month in YYYY-MM (defaults to the current month)
        month: Option<String>,
    },
    /// Show task counts
    Stats,
    /// Stay in the foreground and deliver reminders
    Watch,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
    /// Open interactive TUI
    Ui,
}

/// Sets up logging. The TUI owns the terminal, so it logs to a file in the data directory.
fn init_logging(to_file: bool, default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    if to_file {
        let dir = data_dir();
        let _ = fs::create_dir_all(&dir);
        if let Ok(file) = OpenOptions::new().create(true).append(true).open(dir.join("tickler.log")) {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
}

fn main() {
    let cli = Cli::parse();
    match &cli.command {
        Some(Commands::Ui) | None => init_logging(true, "tickler=info"),
        Some(Commands::Watch) => init_logging(false, "tickler=info"),
        Some(_) => init_logging(false, "tickler=warn"),
    }

    match cli.command {
        Some(Commands::Add { text, priority, due, time, category, recur, every, unit }) => {
            cmd_add(AddArgs { text, priority, due, time, category, recur, every, unit }, false);
        }
        Some(Commands::List { filter, sort, order }) => cmd_list(filter, sort, order),
        Some(Commands::Done { id }) => cmd_done(id, false),
        Some(Commands::Edit { id, text, priority, due, time, no_due, category, recur, every, unit }) => {
            cmd_edit(id, EditArgs { text, priority, due, time, no_due, category, recur, every, unit }, false)
        }
        Some(Commands::Remove { id }) => cmd_remove(id, false),
        Some(Commands::ClearCompleted) => {
            cmd_clear_completed(false);
        }
        Some(Commands::Clear { force }) => cmd_clear(force),
        Some(Commands::Settings { notifications, phone, reminder_minutes, desktop }) => {
            cmd_settings(SettingsArgs { notifications, phone, reminder_minutes, desktop }, false)
        }
        Some(Commands::Calendar { month }) => cmd_calendar(month),
        Some(Commands::Stats) => cmd_stats(),
        Some(Commands::Watch) => cmd_watch(),
        Some(Commands::Completions { shell }) => {
            let shell_enum = match shell.as_str() {
                "bash" => Shell::Bash,
                "zsh" => Shell::Zsh,
                "fish" => Shell::Fish,
                "powershell" => Shell::PowerShell,
                "elvish" => Shell::Elvish,
                _ => {
                    eprintln!("Unsupported shell: {}", shell);
                    return;
                }
            };
            let mut cmd = Cli::command();
            generate(shell_enum, &mut cmd, "tickler", &mut io::stdout());
        }
        Some(Commands::Ui) | None => {
            if let Err(e) = run_tui() {
                eprintln!("Error running TUI: {}", e);
            }
        }
    }
}
