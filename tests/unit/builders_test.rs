//! Tests for builder modules

use std::sync::Arc;

use async_trait::async_trait;

use assistant_dispatch::builders::{build_context, build_store};
use assistant_dispatch::config::{AppConfig, FireRoute, SchedulerConfig, StoreBackendConfig};
use assistant_dispatch::core::{AppResult, PromptExecutor, TaskStore};
use assistant_dispatch::infra::BroadcastNotifier;
use assistant_dispatch::runtime::TokioSpawner;

struct EchoExecutor;

#[async_trait]
impl PromptExecutor for EchoExecutor {
    async fn execute(&self, prompt: &str) -> AppResult<String> {
        Ok(prompt.to_string())
    }
}

#[tokio::test]
async fn test_build_store_in_memory() {
    let store = build_store(&SchedulerConfig::default()).unwrap();
    assert!(store.get("task_missing").await.unwrap().is_none());
}

#[test]
fn test_build_store_file_creates_parent_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("tasks.jsonl");
    let cfg = SchedulerConfig {
        store: StoreBackendConfig::File {
            path: path.to_string_lossy().into_owned(),
        },
        ..SchedulerConfig::default()
    };

    assert!(build_store(&cfg).is_ok());
    assert!(path.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_build_context_lifecycle() {
    let mut cfg = AppConfig::default();
    cfg.scheduler.fire_route = FireRoute::Orchestrator;

    let ctx = build_context(
        cfg,
        Arc::new(EchoExecutor),
        Arc::new(BroadcastNotifier::default()),
        TokioSpawner::current(),
    )
    .unwrap();
    assert_eq!(ctx.config.scheduler.fire_route, FireRoute::Orchestrator);
    assert!(!ctx.orchestrator.is_running());
    assert!(!ctx.scheduler.is_running());

    ctx.start().await;
    assert!(ctx.orchestrator.is_running());
    assert!(ctx.scheduler.is_running());

    ctx.stop();
    assert!(!ctx.orchestrator.is_running());
    assert!(!ctx.scheduler.is_running());
}

#[tokio::test]
async fn test_build_context_rejects_invalid_config() {
    let mut cfg = AppConfig::default();
    cfg.orchestrator.requeue_backoff_ms = 0;

    let result = build_context(
        cfg,
        Arc::new(EchoExecutor),
        Arc::new(BroadcastNotifier::default()),
        TokioSpawner::current(),
    );
    assert!(result.is_err());
}
