//! Error types for rxc.
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad identifier, malformed date input)
//! - 4: Operation failed (IO, corrupt store)
//!
//! The scheduling engine itself never surfaces errors for malformed
//! recurrence data; it degrades to fallback cutoffs instead. These errors
//! belong to the CLI shell and the file store.

use thiserror::Error;

/// Exit codes for the rxc CLI.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("{0}")]
    AmbiguousTask(String),

    #[error("Position '{position}' is not responsible for task {task}")]
    UnknownPosition { task: u64, position: String },

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid time '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("Invalid moment '{0}', expected \"YYYY-MM-DD HH:MM\"")]
    InvalidMoment(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::TaskNotFound(_)
            | Error::AmbiguousTask(_)
            | Error::UnknownPosition { .. }
            | Error::InvalidDate(_)
            | Error::InvalidTime(_)
            | Error::InvalidMoment(_)
            | Error::InvalidArgument(_) => exit_codes::USER_ERROR,

            Error::Io(_) | Error::Json(_) => exit_codes::OPERATION_FAILED,
        }
    }
}

/// Result type alias for rxc operations.
pub type Result<T> = std::result::Result<T, Error>;
