use thiserror::Error;

use crate::models::TaskId;

/// Errors surfaced by the task engine and its storage.
#[derive(Debug, Error)]
pub enum Error {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not encode data: {0}")]
    Json(#[from] serde_json::Error),
    /// A string did not name a known variant of one of the model enums.
    #[error("invalid {kind} '{value}'. Expected one of: {expected}")]
    InvalidValue {
        kind: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("invalid date '{0}'. Use YYYY-MM-DD.")]
    InvalidDate(String),
    #[error("invalid time '{0}'. Use HH:MM (24-hour).")]
    InvalidTime(String),
    #[error("Task {0} not found.")]
    TaskNotFound(TaskId),
}

impl Error {
    pub fn invalid_value(kind: &'static str, value: &str, expected: &'static str) -> Self {
        Self::InvalidValue {
            kind,
            value: value.to_string(),
            expected,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
