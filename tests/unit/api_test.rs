//! Tests for the control surface handlers

use std::sync::Arc;

use async_trait::async_trait;

use assistant_dispatch::config::{OrchestratorConfig, SchedulerConfig};
use assistant_dispatch::core::{
    AppResult, Orchestrator, PromptExecutor, Scheduler, SchedulerError,
};
use assistant_dispatch::infra::{BroadcastNotifier, InMemoryStore};
use assistant_dispatch::runtime::api::{self, ApiError, ScheduleRequest};
use assistant_dispatch::runtime::TokioSpawner;

struct SilentExecutor;

#[async_trait]
impl PromptExecutor for SilentExecutor {
    async fn execute(&self, _prompt: &str) -> AppResult<String> {
        Ok(String::new())
    }
}

fn scheduler() -> Scheduler<TokioSpawner> {
    Scheduler::new(
        SchedulerConfig::default(),
        Arc::new(InMemoryStore::new()),
        Arc::new(SilentExecutor),
        Arc::new(BroadcastNotifier::default()),
        TokioSpawner::current(),
        None,
    )
}

fn request(schedule: &str, priority: Option<u8>) -> ScheduleRequest {
    ScheduleRequest {
        name: "reminder".to_string(),
        prompt: "Remind me to stretch".to_string(),
        schedule: schedule.to_string(),
        priority,
    }
}

#[tokio::test]
async fn test_schedule_and_list() {
    let scheduler = scheduler();
    api::start_scheduler(&scheduler).await;

    let once = api::schedule(&scheduler, request("2099-01-01T10:00:00Z", Some(2)))
        .await
        .unwrap();
    assert!(once.success);
    assert!(once.scheduled_for.is_some());
    assert!(once.recurrence.is_none());

    let recurring = api::schedule(&scheduler, request("0 8 * * *", None)).await.unwrap();
    assert_eq!(recurring.recurrence.as_deref(), Some("0 8 * * *"));

    let listed = api::list_tasks(&scheduler);
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, once.task_id);
    assert_eq!(listed[0].status, "pending");
    assert_eq!(listed[1].priority.value(), 3);

    let status = api::scheduler_status(&scheduler);
    assert_eq!(status.pending_tasks, 2);

    api::stop_scheduler(&scheduler);
}

#[tokio::test]
async fn test_schedule_rejects_bad_requests() {
    let scheduler = scheduler();
    api::start_scheduler(&scheduler).await;

    let err = api::schedule(&scheduler, request("0 8 * * *", Some(9)))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));
    assert_eq!(err.status_code(), 400);

    let err = api::schedule(&scheduler, request("   ", None)).await.unwrap_err();
    assert_eq!(err.status_code(), 400);

    let err = api::schedule(&scheduler, request("whenever", None))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::Scheduler(SchedulerError::InvalidCron { .. })
    ));
    assert_eq!(err.status_code(), 400);

    api::stop_scheduler(&scheduler);
}

#[tokio::test]
async fn test_cancel_unknown_is_not_found() {
    let scheduler = scheduler();
    api::start_scheduler(&scheduler).await;

    let err = api::cancel(&scheduler, "task_missing").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
    assert_eq!(err.status_code(), 404);

    let created = api::schedule(&scheduler, request("2099-01-01T10:00:00Z", None))
        .await
        .unwrap();
    let cancelled = api::cancel(&scheduler, &created.task_id).await.unwrap();
    assert!(cancelled.success);
    assert!(api::list_tasks(&scheduler).is_empty());

    api::stop_scheduler(&scheduler);
}

#[tokio::test]
async fn test_start_stop_report_current_state() {
    let scheduler = scheduler();

    assert_eq!(api::stop_scheduler(&scheduler).message, "already stopped");
    assert!(api::start_scheduler(&scheduler).await.message.starts_with("scheduler started"));
    assert_eq!(api::start_scheduler(&scheduler).await.message, "already running");
    assert_eq!(api::stop_scheduler(&scheduler).message, "scheduler stopped");
}

#[tokio::test]
async fn test_health_and_orchestrator_status() {
    let scheduler = scheduler();
    let orchestrator = Orchestrator::new(OrchestratorConfig::default(), TokioSpawner::current());

    let health = api::health(&orchestrator, &scheduler);
    assert!(health.ok);
    assert!(!health.orchestrator_running);
    assert!(!health.scheduler_running);

    let status = api::orchestrator_status(&orchestrator);
    assert_eq!(status.queue_size, 0);
    assert!(status.current_task.is_none());
}

#[test]
fn test_store_failure_maps_to_server_error() {
    let err = ApiError::from(SchedulerError::Store("disk full".to_string()));
    assert_eq!(err.status_code(), 500);
    assert_eq!(err.to_string(), "store error: disk full");
}
