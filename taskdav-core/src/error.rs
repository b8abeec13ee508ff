//! Error types for the taskdav ecosystem.

use thiserror::Error;

/// Errors that can occur in taskdav operations.
#[derive(Error, Debug)]
pub enum TaskdavError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Taskwarrior error: {0}")]
    Taskwarrior(String),

    #[error("Taskwarrior binary '{0}' not found in PATH")]
    TaskwarriorNotInstalled(String),

    #[error("CalDAV error: {0}")]
    Caldav(String),

    #[error("CalDAV authentication failed for '{0}'")]
    CaldavAuth(String),

    #[error("Calendar not found: {0}")]
    CalendarNotFound(String),

    #[error("Todo not found: {0}")]
    TodoNotFound(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("ICS parse error: {0}")]
    IcsParse(String),

    #[error("ICS generation error: {0}")]
    IcsGenerate(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for taskdav operations.
pub type TaskdavResult<T> = Result<T, TaskdavError>;
