//! Core dispatch abstractions: task model, orchestrator, timers, scheduler.

pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod queue;
pub mod scheduled_task;
pub mod scheduler;
pub mod store;
pub mod task;
pub mod timer;

pub use error::{AppResult, DispatchError, SchedulerError};
pub use executor::{Notifier, PromptExecutor, Spawn, TaskAction};
pub use orchestrator::{CurrentTaskSummary, Mode, Orchestrator, OrchestratorStatus};
pub use queue::DispatchQueue;
pub use scheduled_task::{ScheduleSpec, ScheduledStatus, ScheduledTask};
pub use scheduler::{ScheduledTaskSummary, Scheduler, SchedulerStatus, MISSED_TASK_ERROR};
pub use store::TaskStore;
pub use task::{Priority, Task, TaskId};
pub use timer::{FireCallback, TimerEngine, Trigger};
