//! Priority ranking and the orchestrator's in-memory unit of work.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TaskAction;

/// Orchestrator task identifier.
pub type TaskId = Uuid;

/// Task priority levels.
///
/// Lower numeric value = more urgent = dequeued first. The derived ordering follows
/// the numeric value, so `Priority::Urgent < Priority::Background`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    /// Voice commands, safety, a user actively waiting.
    Urgent = 1,
    /// Important notifications, explicit user requests.
    High = 2,
    /// Tool executions, chat responses.
    #[default]
    Medium = 3,
    /// Background monitoring, proactive suggestions.
    Low = 4,
    /// Logging, cleanup, daily summaries.
    Background = 5,
}

impl Priority {
    /// All levels, most urgent first.
    pub const ALL: [Self; 5] = [
        Self::Urgent,
        Self::High,
        Self::Medium,
        Self::Low,
        Self::Background,
    ];

    /// Numeric rank (1 = most urgent).
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Upper-case name used in persisted records.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Urgent => "URGENT",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::Background => "BACKGROUND",
        }
    }

    /// Strictly more urgent than `other`.
    pub fn is_more_urgent_than(self, other: Self) -> bool {
        self < other
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for Priority {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|p| p.value() == value)
            .ok_or_else(|| format!("priority must be between 1 and 5, got {value}"))
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown priority `{s}`"))
    }
}

/// A unit of work held by the orchestrator. Never persisted.
#[derive(Clone)]
pub struct Task {
    /// Generated identifier.
    pub id: TaskId,
    /// Queue placement rank.
    pub priority: Priority,
    /// Human-readable label.
    pub name: String,
    /// Executable capability; invoked again from scratch when a paused task resumes.
    pub action: Arc<dyn TaskAction>,
    /// Whether more urgent work may displace this task.
    pub interruptible: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a task with a fresh id.
    pub fn new(
        priority: Priority,
        name: impl Into<String>,
        action: Arc<dyn TaskAction>,
        interruptible: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            priority,
            name: name.into(),
            action,
            interruptible,
            created_at: Utc::now(),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("name", &self.name)
            .field("interruptible", &self.interruptible)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}
