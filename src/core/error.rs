//! Error types for dispatch and scheduling operations.

use thiserror::Error;

/// Errors produced by the orchestrator when running a unit of work.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The task's action returned an error.
    #[error("task `{task}` failed: {source}")]
    ActionFailed {
        /// Name of the failed task.
        task: String,
        /// Error returned by the action.
        source: anyhow::Error,
    },
    /// The task was discarded (e.g. orchestrator stopped) before producing a result.
    #[error("task `{task}` was dropped before producing a result")]
    Dropped {
        /// Name of the dropped task.
        task: String,
    },
}

/// Errors produced by the scheduler, its timer engine, and task stores.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A recurrence string could not be parsed as a cron expression.
    #[error("invalid cron expression `{expr}`: {message}")]
    InvalidCron {
        /// The rejected expression, verbatim.
        expr: String,
        /// Parser message.
        message: String,
    },
    /// A task carries neither a scheduled instant nor a recurrence.
    #[error("task `{0}` has neither a scheduled time nor a recurrence")]
    MissingSchedule(String),
    /// No timer job is registered under the id.
    #[error("timer job not found: {0}")]
    JobNotFound(String),
    /// The timer engine is not running.
    #[error("timer engine is not running")]
    EngineStopped,
    /// Persistent store failure with context.
    #[error("store error: {0}")]
    Store(String),
}

/// Application-facing result using anyhow for collaborator failures.
pub type AppResult<T> = Result<T, anyhow::Error>;
