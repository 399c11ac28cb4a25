//! Error types for taskboard
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, unknown or ambiguous task id, bad config)
//! - 3: Validation failed (task text or deadline rejected)
//! - 4: Operation failed (storage, serialization, locking)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the tb CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const VALIDATION_FAILED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Rejections raised while creating a task. Nothing is mutated when one of
/// these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Task text cannot be empty")]
    EmptyText,

    #[error("Task text must be at least {min} characters (got {len})")]
    TextTooShort { min: usize, len: usize },

    #[error("A deadline is required for {0} tasks")]
    DeadlineRequired(String),

    #[error("Deadline {0} is not in the future")]
    DeadlineInPast(String),
}

/// Main error type for taskboard operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Ambiguous task id '{input}' matches {} tasks", matches.len())]
    AmbiguousTaskId { input: String, matches: Vec<String> },

    // Validation (exit code 3)
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::TaskNotFound(_)
            | Error::AmbiguousTaskId { .. } => exit_codes::USER_ERROR,

            Error::Validation(_) => exit_codes::VALIDATION_FAILED,

            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::LockFailed(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for JSON error output
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::AmbiguousTaskId { input, matches } => Some(serde_json::json!({
                "input": input,
                "matches": matches,
            })),
            Error::Validation(ValidationError::TextTooShort { min, len }) => {
                Some(serde_json::json!({ "min": min, "len": len }))
            }
            _ => None,
        }
    }
}

/// Result type alias for taskboard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
