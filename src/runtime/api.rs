//! Transport-agnostic control surface: request/response models and handlers.
//!
//! The HTTP or CLI wrapper deserializes a request, calls the matching handler, and
//! maps an [`ApiError`] to [`ApiError::status_code`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{
    Orchestrator, OrchestratorStatus, Priority, ScheduledTask, Scheduler, SchedulerError,
    SchedulerStatus, Spawn,
};

/// Owner recorded on tasks scheduled through the control surface.
pub const DEFAULT_USER_ID: &str = "default_user";

/// Control surface errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The referenced task does not exist.
    #[error("task not found: {0}")]
    NotFound(String),
    /// The request is malformed.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// The scheduler rejected the operation.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

impl ApiError {
    /// HTTP status code for this error.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::BadRequest(_) | Self::Scheduler(SchedulerError::InvalidCron { .. }) => 400,
            Self::Scheduler(_) => 500,
        }
    }
}

/// Schedule request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRequest {
    /// Task name.
    pub name: String,
    /// Prompt to run.
    pub prompt: String,
    /// ISO-8601 instant or cron expression.
    pub schedule: String,
    /// Numeric priority 1..=5; defaults to MEDIUM.
    #[serde(default)]
    pub priority: Option<u8>,
}

/// Schedule response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleResponse {
    /// Always true on success.
    pub success: bool,
    /// Generated task id.
    pub task_id: String,
    /// Resolved instant for one-shot tasks.
    pub scheduled_for: Option<DateTime<Utc>>,
    /// Cron expression for recurring tasks.
    pub recurrence: Option<String>,
}

/// Pending task listing entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskListing {
    /// Task id.
    pub id: String,
    /// Task name.
    pub name: String,
    /// Prompt.
    pub prompt: String,
    /// Instant for one-shot tasks.
    pub scheduled_for: Option<DateTime<Utc>>,
    /// Cron expression for recurring tasks.
    pub recurrence: Option<String>,
    /// Priority name.
    pub priority: Priority,
    /// Lifecycle state.
    pub status: String,
}

impl From<&ScheduledTask> for TaskListing {
    fn from(task: &ScheduledTask) -> Self {
        Self {
            id: task.task_id.clone(),
            name: task.task_name.clone(),
            prompt: task.prompt.clone(),
            scheduled_for: task.scheduled_for,
            recurrence: task.recurrence.clone(),
            priority: task.priority,
            status: task.status.as_str().to_string(),
        }
    }
}

/// Generic control response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlResponse {
    /// Whether the request was applied.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
}

impl ControlResponse {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
    /// Orchestrator loop running.
    pub orchestrator_running: bool,
    /// Scheduler timer engine running.
    pub scheduler_running: bool,
}

/// Schedule a prompt for [`DEFAULT_USER_ID`].
///
/// # Errors
///
/// [`ApiError::BadRequest`] for an out-of-range priority or empty fields, otherwise
/// whatever the scheduler reports.
pub async fn schedule<S>(
    scheduler: &Scheduler<S>,
    req: ScheduleRequest,
) -> Result<ScheduleResponse, ApiError>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    if req.schedule.trim().is_empty() {
        return Err(ApiError::BadRequest("schedule must not be empty".into()));
    }
    if req.prompt.trim().is_empty() {
        return Err(ApiError::BadRequest("prompt must not be empty".into()));
    }
    let priority = req
        .priority
        .map_or(Ok(Priority::Medium), Priority::try_from)
        .map_err(ApiError::BadRequest)?;

    let task = scheduler
        .schedule_task(DEFAULT_USER_ID, &req.name, &req.prompt, &req.schedule, priority)
        .await?;
    Ok(ScheduleResponse {
        success: true,
        task_id: task.task_id,
        scheduled_for: task.scheduled_for,
        recurrence: task.recurrence,
    })
}

/// List pending tasks, soonest first.
pub fn list_tasks<S>(scheduler: &Scheduler<S>) -> Vec<TaskListing>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    scheduler
        .list_scheduled(None)
        .iter()
        .map(TaskListing::from)
        .collect()
}

/// Cancel a pending task.
///
/// # Errors
///
/// [`ApiError::NotFound`] if the id is not scheduled.
pub async fn cancel<S>(scheduler: &Scheduler<S>, task_id: &str) -> Result<ControlResponse, ApiError>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    if scheduler.cancel_task(task_id).await? {
        Ok(ControlResponse::ok(format!("task {task_id} cancelled")))
    } else {
        Err(ApiError::NotFound(task_id.to_string()))
    }
}

/// Scheduler status.
pub fn scheduler_status<S>(scheduler: &Scheduler<S>) -> SchedulerStatus
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    scheduler.get_status()
}

/// Orchestrator status.
pub fn orchestrator_status<S>(orchestrator: &Orchestrator<S>) -> OrchestratorStatus
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    orchestrator.get_status()
}

/// Start the scheduler; reports rather than fails when already running.
pub async fn start_scheduler<S>(scheduler: &Scheduler<S>) -> ControlResponse
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    if scheduler.is_running() {
        return ControlResponse::ok("already running");
    }
    let recovered = scheduler.start().await;
    ControlResponse::ok(format!("scheduler started, {recovered} task(s) recovered"))
}

/// Stop the scheduler; reports rather than fails when already stopped.
pub fn stop_scheduler<S>(scheduler: &Scheduler<S>) -> ControlResponse
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    if !scheduler.is_running() {
        return ControlResponse::ok("already stopped");
    }
    scheduler.stop();
    ControlResponse::ok("scheduler stopped")
}

/// Liveness report.
pub fn health<S>(orchestrator: &Orchestrator<S>, scheduler: &Scheduler<S>) -> Health
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    Health {
        ok: true,
        orchestrator_running: orchestrator.is_running(),
        scheduler_running: scheduler.is_running(),
    }
}
