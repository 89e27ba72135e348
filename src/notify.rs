use std::error::Error as StdError;
use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use chrono::NaiveDateTime;
use notify_rust::{Notification, Urgency};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::models::{Permission, Settings, Task, TaskId};
use crate::toast::{ToastKind, ToastSlot};

pub type ChannelResult = Result<(), Box<dyn StdError + Send + Sync>>;

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[\d\s\-\(\)]{10,}$").expect("valid phone number regex"));

/// Checks that `phone` has the shape of a phone number: an optional `+` followed by at
/// least ten digits, spaces, dashes or parentheses.
pub fn is_valid_phone_number(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

/// A reminder ready to be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub task_id: TaskId,
    pub title: String,
    pub message: String,
}

impl Reminder {
    /// Builds the reminder text for `task` as seen at `now`.
    pub fn compose(task: &Task, now: NaiveDateTime) -> Self {
        let (at, minutes) = match task.due_date {
            Some(due) => {
                let secs = (due - now).num_seconds().max(0);
                (due.format("%-I:%M %p").to_string(), (secs + 59) / 60)
            }
            None => ("an unknown time".to_string(), 0),
        };
        let unit = if minutes == 1 { "minute" } else { "minutes" };
        Self {
            task_id: task.id,
            title: "Todo Reminder".to_string(),
            message: format!(
                "🔔 Task Reminder: \"{}\" is due at {} (in {} {})!",
                task.text, at, minutes, unit
            ),
        }
    }
}

/// An outbound way of telling the user about a reminder.
pub trait Channel {
    fn name(&self) -> &'static str;

    /// Whether the channel should run at all under `settings`.
    fn enabled(&self, _settings: &Settings) -> bool {
        true
    }

    fn deliver(&self, reminder: &Reminder, settings: &Settings) -> ChannelResult;
}

/// Desktop popup through the system notification service.
#[derive(Debug, Default)]
pub struct DesktopChannel;

impl Channel for DesktopChannel {
    fn name(&self) -> &'static str {
        "desktop"
    }

    fn enabled(&self, settings: &Settings) -> bool {
        settings.notification_permission == Permission::Granted
    }

    fn deliver(&self, reminder: &Reminder, _settings: &Settings) -> ChannelResult {
        Notification::new()
            .summary(&reminder.title)
            .body(&reminder.message)
            .appname("tickler")
            .icon("appointment-soon")
            .urgency(Urgency::Normal)
            .show()
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

/// Text message channel. There is no gateway: sends are only logged.
#[derive(Debug, Default)]
pub struct SmsChannel;

impl Channel for SmsChannel {
    fn name(&self) -> &'static str {
        "sms"
    }

    fn enabled(&self, settings: &Settings) -> bool {
        !settings.phone_number.is_empty() && is_valid_phone_number(&settings.phone_number)
    }

    fn deliver(&self, reminder: &Reminder, settings: &Settings) -> ChannelResult {
        info!(to = %settings.phone_number, "SMS would be sent: {}", reminder.message);
        Ok(())
    }
}

/// Short audible cue. Plays a system sound if a player is around, else rings the terminal bell.
#[derive(Debug, Default)]
pub struct ChimeChannel;

impl Channel for ChimeChannel {
    fn name(&self) -> &'static str {
        "chime"
    }

    fn deliver(&self, _reminder: &Reminder, _settings: &Settings) -> ChannelResult {
        let sounds = [
            ("paplay", "/usr/share/sounds/freedesktop/stereo/message.oga"),
            ("paplay", "/usr/share/sounds/freedesktop/stereo/complete.oga"),
            ("aplay", "/usr/share/sounds/generic.wav"),
        ];
        if let Some(&(cmd, file)) = sounds.iter().find(|(_, file)| Path::new(file).exists()) {
            std::thread::Builder::new()
                .name("tickler-chime".into())
                .spawn(move || {
                    if let Err(e) = play_sound(cmd, Path::new(file)) {
                        debug!(player = cmd, error = %e, "chime failed");
                    }
                })?;
            return Ok(());
        }
        let mut out = io::stdout();
        out.write_all(b"\x07")?;
        out.flush()?;
        Ok(())
    }
}

/// Plays `file` with the external `player` and waits for it to finish.
///
/// Fails if the player cannot be started or exits unsuccessfully.
pub fn play_sound(player: &str, file: &Path) -> ChannelResult {
    let status = Command::new(player)
        .arg(file)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;
    if !status.success() {
        return Err(format!("{} exited with {}", player, status).into());
    }
    Ok(())
}

/// Fans a reminder out to every channel plus the in-app toast.
pub struct Dispatcher {
    channels: Vec<Box<dyn Channel>>,
}

impl Dispatcher {
    pub fn new(channels: Vec<Box<dyn Channel>>) -> Self {
        Self { channels }
    }

    /// Desktop popup, SMS stub and chime.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(DesktopChannel),
            Box::new(SmsChannel),
            Box::new(ChimeChannel),
        ])
    }

    /// Only the in-app toast.
    pub fn toast_only() -> Self {
        Self::new(Vec::new())
    }

    /// Delivers the reminder for `task` on every enabled channel.
    ///
    /// A failing channel is logged and skipped; the rest still run and the toast
    /// is always shown.
    pub fn fire(&self, task: &Task, settings: &Settings, now: NaiveDateTime, toasts: &mut ToastSlot) -> Reminder {
        let reminder = Reminder::compose(task, now);
        for channel in &self.channels {
            if !channel.enabled(settings) {
                debug!(channel = channel.name(), task = task.id, "channel skipped");
                continue;
            }
            if let Err(e) = channel.deliver(&reminder, settings) {
                warn!(channel = channel.name(), task = task.id, error = %e, "notification channel failed");
            }
        }
        toasts.show(reminder.message.clone(), ToastKind::Reminder, now);
        info!(task = task.id, "Reminder sent: {}", reminder.message);
        reminder
    }
}
