//! # Tickler
//!
//! A single-user task list with due-date reminders, for the terminal.
//!
//! The core is the [`engine::Engine`]: it owns the in-memory [`store::TaskStore`],
//! the notification [`models::Settings`], and the reminder [`scheduler::Scheduler`],
//! persists every change through a [`storage::Storage`], and delivers reminders
//! through a [`notify::Dispatcher`]. Time comes from an injected [`clock::Clock`],
//! and nothing runs in the background: a driver loop calls [`engine::Engine::tick`]
//! whenever [`engine::Engine::next_deadline`] comes around.
//!
//! ## Features
//!
//! *   **Priorities and categories** with date or priority sorting.
//! *   **Recurrence**: daily, weekly, monthly, yearly, or every N days/weeks/months.
//!     Completing a recurring task spawns its next occurrence.
//! *   **Reminders** a configurable number of minutes before the due time, via
//!     desktop popup, chime, in-app toast and a (logged) SMS channel.
//! *   **Calendar** month view marking days with due tasks.
//! *   **Data Persistence**: `tasks.json` and `settings.json` in the XDG data
//!     directory, or wherever `TICKLER_DIR` points.

pub mod calendar;
pub mod clock;
pub mod commands;
pub mod engine;
pub mod error;
pub mod models;
pub mod notify;
pub mod recurrence;
pub mod scheduler;
pub mod storage;
pub mod store;
pub mod toast;
pub mod tui;

pub use error::{Error, Result};
