//! Priority-preemptive, single-flight executor for ephemeral in-process work.
//!
//! The orchestrator holds a priority queue of pending [`Task`]s and runs at most one
//! of them at a time from its dispatch loop. Urgent work can bypass the queue through
//! [`Orchestrator::interrupt`], which displaces an interruptible running task.
//!
//! # Preemption model
//!
//! Pausing is bookkeeping, not suspension. A displaced task is recorded on the paused
//! stack while its action keeps running to completion; once the interrupting action
//! finishes, the most recently paused task is pushed back onto the queue and its
//! action is invoked again from scratch. Delivery is therefore at-least-once and
//! actions must tolerate re-runs.
//!
//! All dispatch state (queue, current slot, paused stack, counters) sits behind a
//! single mutex that is never held across an await point.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, watch, Notify};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::OrchestratorConfig;
use crate::core::{AppResult, DispatchError, DispatchQueue, Priority, Spawn, Task, TaskAction, TaskId};

/// Coarse activity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Nothing is executing.
    Idle,
    /// A task occupies the execution slot.
    Busy,
}

/// Snapshot of the task occupying the execution slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentTaskSummary {
    /// Task identifier.
    pub id: TaskId,
    /// Task name.
    pub name: String,
    /// Task priority.
    pub priority: Priority,
    /// Whether the task may be displaced.
    pub interruptible: bool,
    /// Seconds since the task was created.
    pub running_for_secs: f64,
}

/// Orchestrator status report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    /// Whether the dispatch loop is running.
    pub running: bool,
    /// Activity state.
    pub mode: Mode,
    /// Task in the execution slot, if any.
    pub current_task: Option<CurrentTaskSummary>,
    /// Tasks waiting in the queue.
    pub queue_size: usize,
    /// Tasks displaced and awaiting resubmission.
    pub paused_tasks: usize,
    /// Total executions that returned `Ok`.
    pub tasks_completed: u64,
    /// Total executions that returned an error.
    pub tasks_failed: u64,
}

/// Whatever holds the execution slot. Interrupts carry no re-invocable task.
struct Occupant {
    id: TaskId,
    name: String,
    priority: Priority,
    interruptible: bool,
    created_at: DateTime<Utc>,
    task: Option<Task>,
}

impl Occupant {
    fn queued(task: &Task) -> Self {
        Self {
            id: task.id,
            name: task.name.clone(),
            priority: task.priority,
            interruptible: task.interruptible,
            created_at: task.created_at,
            task: Some(task.clone()),
        }
    }

    fn interrupt(name: &str, priority: Priority) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            priority,
            interruptible: false,
            created_at: Utc::now(),
            task: None,
        }
    }

    fn summary(&self) -> CurrentTaskSummary {
        CurrentTaskSummary {
            id: self.id,
            name: self.name.clone(),
            priority: self.priority,
            interruptible: self.interruptible,
            running_for_secs: (Utc::now() - self.created_at)
                .to_std()
                .unwrap_or_default()
                .as_secs_f64(),
        }
    }
}

struct DispatchState {
    queue: DispatchQueue,
    current: Option<Occupant>,
    paused: Vec<Task>,
    mode: Mode,
    tasks_completed: u64,
    tasks_failed: u64,
}

impl DispatchState {
    fn pause_current(&mut self) {
        if let Some(occupant) = self.current.take() {
            info!(task = %occupant.name, priority = %occupant.priority, "pausing task");
            if let Some(task) = occupant.task {
                self.paused.push(task);
            }
        }
    }
}

enum LoopEvent {
    Shutdown,
    Idle,
    Dispatch(Task),
}

struct Shared {
    config: OrchestratorConfig,
    state: Mutex<DispatchState>,
    /// Signalled on every push; `notify_one` keeps a permit for a late waiter.
    queued: Notify,
    /// Signalled whenever an execution leaves the slot.
    slot_freed: Notify,
    running: AtomicBool,
    shutdown: Mutex<Option<watch::Sender<bool>>>,
}

impl Shared {
    async fn run_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let idle_timeout = Duration::from_secs(self.config.idle_timeout_secs);
        let backoff = Duration::from_millis(self.config.requeue_backoff_ms);
        info!("orchestrator dispatch loop running");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let event = tokio::select! {
                biased;
                _ = shutdown.changed() => LoopEvent::Shutdown,
                next = tokio::time::timeout(idle_timeout, self.next_task()) => {
                    next.map_or(LoopEvent::Idle, LoopEvent::Dispatch)
                }
            };

            let task = match event {
                LoopEvent::Shutdown => break,
                LoopEvent::Idle => {
                    let mut state = self.state.lock();
                    if state.current.is_none() {
                        state.mode = Mode::Idle;
                    }
                    continue;
                }
                LoopEvent::Dispatch(task) => task,
            };

            if !self.claim_slot(&task) {
                debug!(task = %task.name, "slot held by an interrupt, requeueing");
                self.state.lock().queue.push(task);
                tokio::time::sleep(backoff).await;
                continue;
            }

            // Queued failures are logged inside `execute` and go no further.
            let _ = self.execute(&task).await;
            self.resubmit_paused();
        }

        info!("orchestrator dispatch loop stopped");
    }

    async fn next_task(&self) -> Task {
        loop {
            let popped = self.state.lock().queue.pop();
            if let Some(task) = popped {
                return task;
            }
            self.queued.notified().await;
        }
    }

    /// Take the slot for a dequeued task if it is free.
    ///
    /// The loop awaits each queued execution before dequeuing again, so any
    /// occupant seen here is a non-interruptible interrupt.
    fn claim_slot(&self, task: &Task) -> bool {
        let mut state = self.state.lock();
        if state.current.is_some() {
            return false;
        }
        state.current = Some(Occupant::queued(task));
        state.mode = Mode::Busy;
        true
    }

    /// Wait until the occupant (if any) may be displaced, then take the slot.
    async fn claim_for_interrupt(&self, name: &str, priority: Priority) -> TaskId {
        loop {
            let freed = self.slot_freed.notified();
            tokio::pin!(freed);
            freed.as_mut().enable();

            {
                let mut state = self.state.lock();
                let blocked = state.current.as_ref().is_some_and(|c| !c.interruptible);
                if !blocked {
                    state.pause_current();
                    let occupant = Occupant::interrupt(name, priority);
                    let id = occupant.id;
                    state.current = Some(occupant);
                    state.mode = Mode::Busy;
                    return id;
                }
            }

            debug!(task = %name, "interrupt waiting for non-interruptible task");
            freed.await;
        }
    }

    async fn execute(&self, task: &Task) -> AppResult<()> {
        info!(task = %task.name, priority = %task.priority, "executing task");
        let outcome = task.action.run().await;
        self.finish(task.id, outcome.is_ok());
        match &outcome {
            Ok(()) => info!(task = %task.name, "task completed"),
            Err(err) => error!(task = %task.name, error = %err, "task failed"),
        }
        outcome
    }

    /// Record an outcome and free the slot if this execution still owns it.
    fn finish(&self, id: TaskId, succeeded: bool) {
        {
            let mut state = self.state.lock();
            if succeeded {
                state.tasks_completed += 1;
            } else {
                state.tasks_failed += 1;
            }
            if state.current.as_ref().is_some_and(|c| c.id == id) {
                state.current = None;
                state.mode = Mode::Idle;
            }
        }
        self.slot_freed.notify_waiters();
    }

    /// Push the most recently paused task back onto the queue for a fresh run.
    fn resubmit_paused(&self) {
        let resumed = {
            let mut state = self.state.lock();
            let task = state.paused.pop();
            if let Some(task) = &task {
                state.queue.push(task.clone());
            }
            task
        };
        if let Some(task) = resumed {
            info!(task = %task.name, "resubmitting paused task");
            self.queued.notify_one();
        }
    }

    /// Queue `task` only while the loop runs.
    ///
    /// The check and the push share one lock, so a concurrent `stop` either
    /// rejects the task here or drains it afterwards.
    fn submit_if_running(&self, task: Task) -> bool {
        let name = task.name.clone();
        let priority = task.priority;
        let queue_size = {
            let mut state = self.state.lock();
            if !self.running.load(Ordering::Acquire) {
                return false;
            }
            state.queue.push(task);
            state.queue.len()
        };
        self.queued.notify_one();
        info!(task = %name, %priority, queue_size, "task queued");
        true
    }

    fn submit(&self, task: Task) -> TaskId {
        let id = task.id;
        let name = task.name.clone();
        let priority = task.priority;
        let queue_size = {
            let mut state = self.state.lock();
            state.queue.push(task);
            state.queue.len()
        };
        self.queued.notify_one();
        info!(task = %name, %priority, queue_size, "task queued");
        id
    }
}

/// Priority-preemptive executor with a single execution slot.
///
/// Cloning is cheap; clones share the same queue and slot.
#[derive(Clone)]
pub struct Orchestrator<S> {
    shared: Arc<Shared>,
    spawner: S,
}

impl<S> Orchestrator<S>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    /// Create a stopped orchestrator.
    pub fn new(config: OrchestratorConfig, spawner: S) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(DispatchState {
                    queue: DispatchQueue::new(),
                    current: None,
                    paused: Vec::new(),
                    mode: Mode::Idle,
                    tasks_completed: 0,
                    tasks_failed: 0,
                }),
                queued: Notify::new(),
                slot_freed: Notify::new(),
                running: AtomicBool::new(false),
                shutdown: Mutex::new(None),
            }),
            spawner,
        }
    }

    /// Spawn the dispatch loop. No-op if already running.
    pub fn start(&self) {
        if self.shared.running.swap(true, Ordering::AcqRel) {
            debug!("orchestrator already running");
            return;
        }
        let (tx, rx) = watch::channel(false);
        *self.shared.shutdown.lock() = Some(tx);
        let shared = Arc::clone(&self.shared);
        self.spawner.spawn(shared.run_loop(rx));
        info!("orchestrator started");
    }

    /// Stop picking up work and drain the queue and paused stack.
    ///
    /// An action that is already executing runs to completion. No-op if stopped.
    pub fn stop(&self) {
        if !self.shared.running.swap(false, Ordering::AcqRel) {
            debug!("orchestrator already stopped");
            return;
        }
        if let Some(tx) = self.shared.shutdown.lock().take() {
            let _ = tx.send(true);
        }
        let (dropped, paused) = {
            let mut state = self.shared.state.lock();
            let paused = state.paused.len();
            state.paused.clear();
            (state.queue.clear(), paused)
        };
        if dropped + paused > 0 {
            warn!(dropped, paused, "orchestrator stopped with pending work discarded");
        }
        info!("orchestrator stopped");
    }

    /// Whether the dispatch loop is running.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Queue a task and return its id without waiting for execution.
    ///
    /// Tasks may be queued before `start`; they run once the loop is up.
    pub fn queue_task<A>(
        &self,
        priority: Priority,
        name: impl Into<String>,
        action: A,
        interruptible: bool,
    ) -> TaskId
    where
        A: TaskAction,
    {
        self.shared
            .submit(Task::new(priority, name, Arc::new(action), interruptible))
    }

    /// Execute `action` immediately, outside the queue, and return its result.
    ///
    /// An interruptible task in the slot is paused and, once `action` finishes,
    /// resubmitted to the queue. A non-interruptible task in the slot is never
    /// paused: the interrupt waits for it to finish first. Interrupts themselves
    /// are non-interruptible, so concurrent interrupts run one after another.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ActionFailed`] if `action` fails.
    pub async fn interrupt<F, Fut, T>(
        &self,
        priority: Priority,
        name: impl Into<String>,
        action: F,
    ) -> Result<T, DispatchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let name = name.into();
        let id = self.shared.claim_for_interrupt(&name, priority).await;
        info!(task = %name, %priority, "executing interrupt");

        let outcome = action().await;
        self.shared.finish(id, outcome.is_ok());
        self.shared.resubmit_paused();

        match outcome {
            Ok(value) => {
                info!(task = %name, "interrupt completed");
                Ok(value)
            }
            Err(source) => {
                error!(task = %name, error = %source, "interrupt failed");
                Err(DispatchError::ActionFailed { task: name, source })
            }
        }
    }

    /// Queue a re-invocable action and wait for the result of its first completed run.
    ///
    /// Unlike [`Orchestrator::queue_task`], nothing is queued while the loop is
    /// stopped, since no run could ever answer. If the task is paused and resubmitted, later runs still execute but their
    /// results are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ActionFailed`] if the first completed run fails, or
    /// [`DispatchError::Dropped`] if the orchestrator is stopped or the task is
    /// discarded by [`Orchestrator::stop`].
    pub async fn run_queued<F, Fut, T>(
        &self,
        priority: Priority,
        name: impl Into<String>,
        action: F,
    ) -> Result<T, DispatchError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let name = name.into();
        let (tx, rx) = oneshot::channel::<AppResult<T>>();
        let reply = Arc::new(Mutex::new(Some(tx)));

        let queued = move || {
            let run = action();
            let reply = Arc::clone(&reply);
            async move {
                let outcome = run.await;
                let echoed = outcome
                    .as_ref()
                    .map(|_| ())
                    .map_err(|err| anyhow::anyhow!("{err:#}"));
                let sender = reply.lock().take();
                if let Some(sender) = sender {
                    let _ = sender.send(outcome);
                }
                echoed
            }
        };
        let task = Task::new(priority, name.clone(), Arc::new(queued), true);
        if !self.shared.submit_if_running(task) {
            warn!(task = %name, "orchestrator not running, dropping queued request");
            return Err(DispatchError::Dropped { task: name });
        }

        match rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(DispatchError::ActionFailed { task: name, source }),
            Err(_) => Err(DispatchError::Dropped { task: name }),
        }
    }

    /// Whether a task occupies the execution slot.
    pub fn is_busy(&self) -> bool {
        self.shared.state.lock().current.is_some()
    }

    /// Whether work of `priority` could take the slot right now.
    pub fn can_handle_new_task(&self, priority: Priority) -> bool {
        self.shared
            .state
            .lock()
            .current
            .as_ref()
            .map_or(true, |c| priority.is_more_urgent_than(c.priority) && c.interruptible)
    }

    /// Current status snapshot.
    pub fn get_status(&self) -> OrchestratorStatus {
        let state = self.shared.state.lock();
        OrchestratorStatus {
            running: self.is_running(),
            mode: state.mode,
            current_task: state.current.as_ref().map(Occupant::summary),
            queue_size: state.queue.len(),
            paused_tasks: state.paused.len(),
            tasks_completed: state.tasks_completed,
            tasks_failed: state.tasks_failed,
        }
    }
}
