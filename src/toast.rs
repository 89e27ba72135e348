use chrono::{Duration, NaiveDateTime};

/// How long a toast stays up unless closed by hand.
pub const TOAST_SECS: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
    Reminder,
}

impl ToastKind {
    pub fn icon(&self) -> &'static str {
        match self {
            ToastKind::Success => "✔",
            ToastKind::Error => "✖",
            ToastKind::Info => "ℹ",
            ToastKind::Reminder => "🔔",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    pub expires_at: NaiveDateTime,
}

/// Holds at most one visible toast. Showing a new one evicts the old one.
#[derive(Debug, Default)]
pub struct ToastSlot {
    current: Option<Toast>,
}

impl ToastSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, message: impl Into<String>, kind: ToastKind, now: NaiveDateTime) {
        self.current = Some(Toast {
            message: message.into(),
            kind,
            expires_at: now + Duration::seconds(TOAST_SECS),
        });
    }

    /// Manual close.
    pub fn dismiss(&mut self) {
        self.current = None;
    }

    /// Drops the toast once it has expired. Returns `true` if one was dropped.
    pub fn expire(&mut self, now: NaiveDateTime) -> bool {
        if self.current.as_ref().is_some_and(|t| t.expires_at <= now) {
            self.current = None;
            return true;
        }
        false
    }

    /// The toast still visible at `now`.
    pub fn visible(&self, now: NaiveDateTime) -> Option<&Toast> {
        self.current.as_ref().filter(|t| t.expires_at > now)
    }

    pub fn expires_at(&self) -> Option<NaiveDateTime> {
        self.current.as_ref().map(|t| t.expires_at)
    }
}
