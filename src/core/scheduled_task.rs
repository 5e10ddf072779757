//! Durable scheduled-prompt record and schedule string disambiguation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Priority, SchedulerError, Trigger};
use crate::util::parse_iso8601;

/// Lifecycle state of a scheduled task. Every state except `Pending` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduledStatus {
    /// Waiting for its trigger.
    Pending,
    /// One-shot task executed successfully.
    Completed,
    /// Execution failed or the recurrence could not be parsed.
    Failed,
    /// Cancelled by the owner or missed while the process was down.
    Cancelled,
}

impl ScheduledStatus {
    /// Lower-case name as persisted.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// A schedule string after disambiguation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleSpec {
    /// Absolute instant; fires once.
    Once(DateTime<Utc>),
    /// Cron expression kept verbatim; validated only when registered.
    Recurring(String),
}

impl ScheduleSpec {
    /// Anything that parses as ISO-8601 is a one-shot instant, everything else is
    /// taken as a cron expression.
    pub fn parse(input: &str) -> Self {
        parse_iso8601(input.trim()).map_or_else(|| Self::Recurring(input.to_string()), Self::Once)
    }
}

/// Persisted record of a scheduled prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTask {
    /// Unique identifier.
    pub task_id: String,
    /// Owner of the task.
    pub user_id: String,
    /// Human-readable label.
    pub task_name: String,
    /// Prompt handed to the executor when the task fires.
    pub prompt: String,
    /// Fire instant for one-shot tasks.
    pub scheduled_for: Option<DateTime<Utc>>,
    /// Priority used when routing through the orchestrator.
    pub priority: Priority,
    /// Cron expression for recurring tasks.
    pub recurrence: Option<String>,
    /// Lifecycle state.
    pub status: ScheduledStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time of the most recent execution.
    pub executed_at: Option<DateTime<Utc>>,
    /// Most recent failure message.
    pub error: Option<String>,
}

impl ScheduledTask {
    /// Build a pending task with a fresh id.
    pub fn new(
        user_id: impl Into<String>,
        task_name: impl Into<String>,
        prompt: impl Into<String>,
        spec: ScheduleSpec,
        priority: Priority,
    ) -> Self {
        let (scheduled_for, recurrence) = match spec {
            ScheduleSpec::Once(at) => (Some(at), None),
            ScheduleSpec::Recurring(expr) => (None, Some(expr)),
        };
        Self {
            task_id: format!("task_{}", Uuid::new_v4().simple()),
            user_id: user_id.into(),
            task_name: task_name.into(),
            prompt: prompt.into(),
            scheduled_for,
            priority,
            recurrence,
            status: ScheduledStatus::Pending,
            created_at: Utc::now(),
            executed_at: None,
            error: None,
        }
    }

    /// The schedule this record carries. The instant wins if both are present.
    pub fn schedule(&self) -> Option<ScheduleSpec> {
        match (&self.scheduled_for, &self.recurrence) {
            (Some(at), _) => Some(ScheduleSpec::Once(*at)),
            (None, Some(expr)) => Some(ScheduleSpec::Recurring(expr.clone())),
            (None, None) => None,
        }
    }

    /// Whether this task repeats.
    pub fn is_recurring(&self) -> bool {
        self.scheduled_for.is_none() && self.recurrence.is_some()
    }

    /// Whether this is a one-shot task whose instant has already passed.
    pub fn is_missed(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_for.is_some_and(|at| at < now)
    }

    /// Timer trigger for this task.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::InvalidCron`] for an unparseable recurrence and
    /// [`SchedulerError::MissingSchedule`] when neither field is set.
    pub fn trigger(&self) -> Result<Trigger, SchedulerError> {
        match self.schedule() {
            Some(ScheduleSpec::Once(at)) => Ok(Trigger::At(at)),
            Some(ScheduleSpec::Recurring(expr)) => Trigger::from_crontab(&expr),
            None => Err(SchedulerError::MissingSchedule(self.task_id.clone())),
        }
    }
}
