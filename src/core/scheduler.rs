//! Durable prompt scheduler.
//!
//! Every scheduled intent is persisted to a [`TaskStore`] before its trigger is
//! registered with the [`TimerEngine`]. On [`Scheduler::start`] the pending records
//! are reloaded and re-registered, so intents survive process restarts. One-shot
//! tasks whose instant passed while the process was down are handled by the
//! configured [`MissedTaskPolicy`].
//!
//! When a trigger fires, the prompt goes to the [`PromptExecutor`] either directly
//! or, when a dispatcher is wired in, through [`Orchestrator::run_queued`] at the
//! task's priority. Successful responses are pushed to connected clients through
//! the [`Notifier`].

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::{MissedTaskPolicy, SchedulerConfig};
use crate::core::{
    DispatchError, FireCallback, Notifier, Orchestrator, Priority, PromptExecutor, ScheduleSpec,
    ScheduledStatus, ScheduledTask, SchedulerError, Spawn, TaskStore, TimerEngine,
};

/// Error recorded on one-shot tasks cancelled because their time passed during downtime.
pub const MISSED_TASK_ERROR: &str = "missed due to restart";

type FireFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// One pending task as reported by [`Scheduler::get_status`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTaskSummary {
    /// Task id.
    pub id: String,
    /// Task name.
    pub name: String,
    /// Prompt text.
    pub prompt: String,
    /// Fire instant for one-shot tasks.
    pub scheduled_for: Option<DateTime<Utc>>,
    /// Priority.
    pub priority: Priority,
    /// Cron expression for recurring tasks.
    pub recurrence: Option<String>,
}

impl From<&ScheduledTask> for ScheduledTaskSummary {
    fn from(task: &ScheduledTask) -> Self {
        Self {
            id: task.task_id.clone(),
            name: task.task_name.clone(),
            prompt: task.prompt.clone(),
            scheduled_for: task.scheduled_for,
            priority: task.priority,
            recurrence: task.recurrence.clone(),
        }
    }
}

/// Scheduler status report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerStatus {
    /// Whether the timer engine is running.
    pub running: bool,
    /// Tasks in the in-memory index.
    pub pending_tasks: usize,
    /// Pending tasks, soonest first.
    pub tasks: Vec<ScheduledTaskSummary>,
}

struct SchedulerInner<S> {
    config: SchedulerConfig,
    store: Arc<dyn TaskStore>,
    executor: Arc<dyn PromptExecutor>,
    notifier: Arc<dyn Notifier>,
    dispatcher: Option<Orchestrator<S>>,
    engine: TimerEngine<S>,
    index: Mutex<HashMap<String, ScheduledTask>>,
}

impl<S> SchedulerInner<S>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    /// Index the task and register its trigger. On a bad trigger the task is
    /// unindexed, marked failed and persisted.
    async fn register(self: &Arc<Self>, mut task: ScheduledTask) -> Result<(), SchedulerError> {
        let task_id = task.task_id.clone();
        self.index.lock().insert(task_id.clone(), task.clone());

        let registered = task
            .trigger()
            .and_then(|trigger| self.engine.add_job(task_id.clone(), trigger, self.fire_callback()));

        if let Err(err) = registered {
            self.index.lock().remove(&task_id);
            error!(task_id = %task_id, error = %err, "failed to register scheduled task");
            if !matches!(err, SchedulerError::EngineStopped) {
                task.status = ScheduledStatus::Failed;
                task.error = Some(err.to_string());
                if let Err(store_err) = self.store.upsert(&task).await {
                    error!(task_id = %task_id, error = %store_err, "failed to persist registration failure");
                }
            }
            return Err(err);
        }
        Ok(())
    }

    fn fire_callback(self: &Arc<Self>) -> FireCallback {
        let weak: Weak<Self> = Arc::downgrade(self);
        Arc::new(move |task_id: String| -> FireFuture {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(inner) = weak.upgrade() {
                    inner.execute_task(&task_id).await;
                }
            })
        })
    }

    /// Rebuild the index from the store. The store is authoritative, so a failed
    /// load leaves nothing listed that lacks a trigger.
    async fn recover(self: &Arc<Self>) -> usize {
        let stale = std::mem::take(&mut *self.index.lock()).len();
        if stale > 0 {
            debug!(stale, "dropping index kept across stop");
        }
        let pending = match self.store.list_by_status(ScheduledStatus::Pending).await {
            Ok(pending) => pending,
            Err(err) => {
                error!(error = %err, "failed to load pending tasks, starting with none");
                return 0;
            }
        };

        let now = Utc::now();
        let mut recovered = 0;
        for mut task in pending {
            if task.is_missed(now) {
                match self.config.missed_policy {
                    MissedTaskPolicy::Cancel => {
                        warn!(
                            task_id = %task.task_id,
                            task = %task.task_name,
                            "cancelling task missed during downtime"
                        );
                        self.index.lock().remove(&task.task_id);
                        task.status = ScheduledStatus::Cancelled;
                        task.error = Some(MISSED_TASK_ERROR.to_string());
                        if let Err(err) = self.store.upsert(&task).await {
                            error!(task_id = %task.task_id, error = %err, "failed to persist missed task");
                        }
                        continue;
                    }
                    MissedTaskPolicy::RunImmediately => {
                        info!(task_id = %task.task_id, task = %task.task_name, "running missed task now");
                    }
                }
            }

            if self.register(task).await.is_ok() {
                recovered += 1;
            }
        }
        recovered
    }

    async fn execute_task(&self, task_id: &str) {
        let task = self.index.lock().get(task_id).cloned();
        let Some(mut task) = task else {
            warn!(task_id = %task_id, "fired task is no longer scheduled");
            return;
        };
        info!(task_id = %task_id, task = %task.task_name, "executing scheduled task");

        let outcome = self.run_prompt(&task).await;
        let recurring = task.is_recurring();
        task.executed_at = Some(Utc::now());

        let response = match outcome {
            Ok(response) => {
                task.error = None;
                if !recurring {
                    task.status = ScheduledStatus::Completed;
                }
                info!(task_id = %task_id, task = %task.task_name, "scheduled task completed");
                Some(response)
            }
            Err(message) => {
                error!(task_id = %task_id, task = %task.task_name, error = %message, "scheduled task failed");
                task.error = Some(message);
                if !recurring {
                    task.status = ScheduledStatus::Failed;
                }
                None
            }
        };

        let still_scheduled = {
            let mut index = self.index.lock();
            if recurring {
                if let Some(entry) = index.get_mut(task_id) {
                    *entry = task.clone();
                    true
                } else {
                    false
                }
            } else {
                index.remove(task_id).is_some()
            }
        };

        if still_scheduled {
            if let Err(err) = self.store.upsert(&task).await {
                error!(task_id = %task_id, error = %err, "failed to persist task outcome");
            }
        } else {
            debug!(task_id = %task_id, "task cancelled while firing, outcome not persisted");
        }

        if let Some(response) = response {
            if self.notifier.has_recipients() {
                self.notifier.broadcast(&response).await;
            } else {
                info!(task = %task.task_name, response = %response, "no clients connected");
            }
        }
    }

    async fn run_prompt(&self, task: &ScheduledTask) -> Result<String, String> {
        let Some(dispatcher) = &self.dispatcher else {
            return self
                .executor
                .execute(&task.prompt)
                .await
                .map_err(|err| format!("{err:#}"));
        };

        let executor = Arc::clone(&self.executor);
        let prompt: Arc<str> = Arc::from(task.prompt.as_str());
        dispatcher
            .run_queued(task.priority, task.task_name.clone(), move || {
                let executor = Arc::clone(&executor);
                let prompt = Arc::clone(&prompt);
                async move { executor.execute(&prompt).await }
            })
            .await
            .map_err(|err| match err {
                DispatchError::ActionFailed { source, .. } => format!("{source:#}"),
                dropped @ DispatchError::Dropped { .. } => dropped.to_string(),
            })
    }
}

/// Durable scheduler for prompt executions.
///
/// Cloning is cheap; clones share the same index and timer engine.
pub struct Scheduler<S> {
    inner: Arc<SchedulerInner<S>>,
}

impl<S> Clone for Scheduler<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> Scheduler<S>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    /// Create a stopped scheduler.
    ///
    /// With a `dispatcher`, fires are queued on that orchestrator at the task's
    /// priority; without one they call `executor` directly.
    pub fn new(
        config: SchedulerConfig,
        store: Arc<dyn TaskStore>,
        executor: Arc<dyn PromptExecutor>,
        notifier: Arc<dyn Notifier>,
        spawner: S,
        dispatcher: Option<Orchestrator<S>>,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                config,
                store,
                executor,
                notifier,
                dispatcher,
                engine: TimerEngine::new(spawner),
                index: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Start the timer engine and recover pending tasks from the store.
    ///
    /// Returns the number of tasks re-registered. No-op (returning 0) if running.
    pub async fn start(&self) -> usize {
        if !self.inner.engine.start() {
            debug!("scheduler already running");
            return 0;
        }
        let recovered = self.inner.recover().await;
        info!(recovered, "scheduler started");
        recovered
    }

    /// Halt the timer engine. In-flight fires complete; the index is kept until
    /// the next `start` rebuilds it from the store.
    pub fn stop(&self) {
        if !self.inner.engine.is_running() {
            debug!("scheduler already stopped");
            return;
        }
        self.inner.engine.shutdown();
        info!("scheduler stopped");
    }

    /// Whether the timer engine is running.
    pub fn is_running(&self) -> bool {
        self.inner.engine.is_running()
    }

    /// Schedule `prompt` for a one-shot instant or a cron recurrence.
    ///
    /// `schedule` is read as ISO-8601 first; anything else is kept verbatim as a
    /// cron expression. A past instant fires immediately. While stopped the task is
    /// persisted and indexed, and its trigger is registered at the next `start`.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Store`] if the record cannot be persisted, or
    /// [`SchedulerError::InvalidCron`] if the recurrence does not parse (the record
    /// is then persisted as failed).
    pub async fn schedule_task(
        &self,
        user_id: &str,
        task_name: &str,
        prompt: &str,
        schedule: &str,
        priority: Priority,
    ) -> Result<ScheduledTask, SchedulerError> {
        let task = ScheduledTask::new(
            user_id,
            task_name,
            prompt,
            ScheduleSpec::parse(schedule),
            priority,
        );
        self.inner.store.upsert(&task).await?;

        if self.inner.engine.is_running() {
            self.inner.register(task.clone()).await?;
        } else {
            debug!(task_id = %task.task_id, "scheduler stopped, registration deferred to start");
            self.inner
                .index
                .lock()
                .insert(task.task_id.clone(), task.clone());
        }

        info!(
            task_id = %task.task_id,
            task = %task.task_name,
            scheduled_for = ?task.scheduled_for,
            recurrence = ?task.recurrence,
            "task scheduled"
        );
        Ok(task)
    }

    /// Cancel a pending task. Returns `false` if the id is not scheduled.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Store`] if the cancellation cannot be persisted. The task is
    /// unscheduled in memory regardless.
    pub async fn cancel_task(&self, task_id: &str) -> Result<bool, SchedulerError> {
        let removed = self.inner.index.lock().remove(task_id);
        let Some(mut task) = removed else {
            return Ok(false);
        };

        // Already fired or never registered.
        let _ = self.inner.engine.remove_job(task_id);

        task.status = ScheduledStatus::Cancelled;
        self.inner.store.upsert(&task).await?;
        info!(task_id = %task_id, task = %task.task_name, "task cancelled");
        Ok(true)
    }

    /// Pending tasks, optionally for one user, soonest first with recurring tasks last.
    pub fn list_scheduled(&self, user_id: Option<&str>) -> Vec<ScheduledTask> {
        let mut tasks: Vec<ScheduledTask> = self
            .inner
            .index
            .lock()
            .values()
            .filter(|task| user_id.map_or(true, |user| task.user_id == user))
            .cloned()
            .collect();
        tasks.sort_by_key(|task| (task.scheduled_for.is_none(), task.scheduled_for));
        tasks
    }

    /// Pending task by id.
    pub fn get(&self, task_id: &str) -> Option<ScheduledTask> {
        self.inner.index.lock().get(task_id).cloned()
    }

    /// Current status snapshot.
    pub fn get_status(&self) -> SchedulerStatus {
        let tasks: Vec<ScheduledTaskSummary> = self
            .list_scheduled(None)
            .iter()
            .map(ScheduledTaskSummary::from)
            .collect();
        SchedulerStatus {
            running: self.is_running(),
            pending_tasks: tasks.len(),
            tasks,
        }
    }
}
