//! Timer engine: date and cron triggers keyed by job id.
//!
//! Each registered job is a spawned loop that sleeps until its next fire time and
//! then awaits the callback inline, so a slow fire delays (never overlaps) the next
//! one. Dropping a job's cancel handle ends its loop at the next sleep.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use cron::Schedule;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::{SchedulerError, Spawn};

/// Day-of-week names indexed by standard crontab number (0 and 7 are Sunday).
const DAY_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// Callback invoked with the job id each time a trigger fires.
pub type FireCallback = Arc<dyn Fn(String) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// When a job fires.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// Once, at the given instant. Past instants fire immediately.
    At(DateTime<Utc>),
    /// Repeatedly, per a cron schedule evaluated in local time.
    Cron(Box<Schedule>),
}

impl Trigger {
    /// Parse a cron expression.
    ///
    /// Five-field crontab expressions (`min hour dom month dow`, Sunday = 0 or 7) are
    /// accepted alongside the six/seven-field form with seconds and optional year.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::InvalidCron`] if the expression does not parse.
    pub fn from_crontab(expr: &str) -> Result<Self, SchedulerError> {
        let normalized = normalize_crontab(expr);
        Schedule::from_str(&normalized)
            .map(|schedule| Self::Cron(Box::new(schedule)))
            .map_err(|e| SchedulerError::InvalidCron {
                expr: expr.to_string(),
                message: e.to_string(),
            })
    }

    /// Next fire time strictly after `after`, or `None` once exhausted.
    ///
    /// A date trigger always reports its instant; the engine fires it once.
    pub fn next_fire(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::At(at) => Some(*at),
            Self::Cron(schedule) => schedule
                .after(&after.with_timezone(&Local))
                .next()
                .map(|next| next.with_timezone(&Utc)),
        }
    }

    /// Whether the trigger fires only once.
    pub const fn is_one_shot(&self) -> bool {
        matches!(self, Self::At(_))
    }
}

/// Convert a five-field crontab expression into the seconds-first form with named
/// weekdays. Other shapes pass through untouched.
fn normalize_crontab(expr: &str) -> String {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
        return expr.trim().to_string();
    }
    format!(
        "0 {} {} {} {} {}",
        fields[0],
        fields[1],
        fields[2],
        fields[3],
        normalize_weekdays(fields[4])
    )
}

fn normalize_weekdays(field: &str) -> String {
    field
        .split(',')
        .map(|part| {
            let (range, step) = part
                .split_once('/')
                .map_or((part, None), |(r, s)| (r, Some(s)));
            let named = match range.split_once('-') {
                Some((start, end)) => match (start.parse::<usize>(), end.parse::<usize>()) {
                    (Ok(s), Ok(7)) if s % 7 == 0 => "SUN-SAT".to_string(),
                    (Ok(s), Ok(7)) if step.is_none() => format!("{}-SAT,SUN", day_name(s)),
                    (Ok(s), Ok(e)) => format!("{}-{}", day_name(s), day_name(e)),
                    _ => range.to_string(),
                },
                None => range
                    .parse::<usize>()
                    .map_or_else(|_| range.to_string(), |n| day_name(n).to_string()),
            };
            match step {
                Some(s) => format!("{named}/{s}"),
                None => named,
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn day_name(n: usize) -> &'static str {
    DAY_NAMES[n % 7]
}

struct JobHandle {
    generation: u64,
    _cancel: oneshot::Sender<()>,
}

type JobMap = Arc<Mutex<HashMap<String, JobHandle>>>;

/// Registers triggers by job id and runs their callbacks when due.
pub struct TimerEngine<S> {
    spawner: S,
    jobs: JobMap,
    running: AtomicBool,
    generation: AtomicU64,
}

impl<S> TimerEngine<S>
where
    S: Spawn,
{
    /// Create a stopped engine.
    pub fn new(spawner: S) -> Self {
        Self {
            spawner,
            jobs: Arc::new(Mutex::new(HashMap::new())),
            running: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    /// Accept job registrations. Returns `false` if already running.
    pub fn start(&self) -> bool {
        let started = !self.running.swap(true, Ordering::AcqRel);
        if started {
            info!("timer engine started");
        }
        started
    }

    /// Cancel every job without waiting for in-flight callbacks.
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        let cancelled = std::mem::take(&mut *self.jobs.lock()).len();
        info!(cancelled, "timer engine shut down");
    }

    /// Whether the engine accepts jobs.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Register `trigger` under `id`, replacing any existing job with that id.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::EngineStopped`] if the engine is not running.
    pub fn add_job(
        &self,
        id: impl Into<String>,
        trigger: Trigger,
        callback: FireCallback,
    ) -> Result<(), SchedulerError> {
        if !self.is_running() {
            return Err(SchedulerError::EngineStopped);
        }
        let id = id.into();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let (cancel_tx, cancel_rx) = oneshot::channel();

        let replaced = self
            .jobs
            .lock()
            .insert(
                id.clone(),
                JobHandle {
                    generation,
                    _cancel: cancel_tx,
                },
            )
            .is_some();
        if replaced {
            debug!(job = %id, "replaced existing timer job");
        }

        self.spawner.spawn(run_job(
            id,
            trigger,
            callback,
            cancel_rx,
            Arc::clone(&self.jobs),
            generation,
        ));
        Ok(())
    }

    /// Cancel the job registered under `id`.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::JobNotFound`] if no such job exists.
    pub fn remove_job(&self, id: &str) -> Result<(), SchedulerError> {
        self.jobs
            .lock()
            .remove(id)
            .map(|_| debug!(job = %id, "timer job removed"))
            .ok_or_else(|| SchedulerError::JobNotFound(id.to_string()))
    }

    /// Number of registered jobs.
    pub fn job_count(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Whether a job is registered under `id`.
    pub fn has_job(&self, id: &str) -> bool {
        self.jobs.lock().contains_key(id)
    }
}

async fn run_job(
    id: String,
    trigger: Trigger,
    callback: FireCallback,
    mut cancel_rx: oneshot::Receiver<()>,
    jobs: JobMap,
    generation: u64,
) {
    let mut last_fire: Option<DateTime<Utc>> = None;

    loop {
        let now = Utc::now();
        let from = last_fire.map_or(now, |last| last.max(now));
        let Some(next) = trigger.next_fire(from) else {
            warn!(job = %id, "trigger has no further fire times");
            break;
        };
        let delay = (next - Utc::now()).to_std().unwrap_or_default();

        tokio::select! {
            _ = &mut cancel_rx => {
                debug!(job = %id, "timer job cancelled");
                return;
            }
            () = tokio::time::sleep(delay) => {}
        }

        debug!(job = %id, "timer job firing");
        callback(id.clone()).await;
        last_fire = Some(next);

        if trigger.is_one_shot() {
            break;
        }
    }

    let mut jobs = jobs.lock();
    if jobs.get(&id).is_some_and(|job| job.generation == generation) {
        jobs.remove(&id);
    }
}
