//! Builder for the application context owning the orchestrator and scheduler.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use tracing::info;

use crate::config::{AppConfig, FireRoute, SchedulerConfig, StoreBackendConfig};
use crate::core::{
    AppResult, Notifier, Orchestrator, PromptExecutor, Scheduler, SchedulerError, Spawn, TaskStore,
};
use crate::infra::{InMemoryStore, JsonlStore};

/// Process-wide dispatch components, built once at startup and passed to consumers.
pub struct AppContext<S> {
    /// Configuration the context was built from.
    pub config: AppConfig,
    /// In-process priority executor.
    pub orchestrator: Orchestrator<S>,
    /// Durable prompt scheduler.
    pub scheduler: Scheduler<S>,
}

impl<S> AppContext<S>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    /// Start the orchestrator loop, then the scheduler (including recovery).
    pub async fn start(&self) {
        self.orchestrator.start();
        let recovered = self.scheduler.start().await;
        info!(recovered, "dispatch context started");
    }

    /// Stop the scheduler, then the orchestrator.
    pub fn stop(&self) {
        self.scheduler.stop();
        self.orchestrator.stop();
        info!("dispatch context stopped");
    }
}

/// Create the task store selected by configuration.
///
/// # Errors
///
/// [`SchedulerError::Store`] if a file store cannot be opened.
pub fn build_store(cfg: &SchedulerConfig) -> Result<Arc<dyn TaskStore>, SchedulerError> {
    let store: Arc<dyn TaskStore> = match &cfg.store {
        StoreBackendConfig::InMemory => Arc::new(InMemoryStore::new()),
        StoreBackendConfig::File { path } => Arc::new(JsonlStore::open(path)?),
    };
    Ok(store)
}

/// Build an application context, creating the store from configuration.
///
/// # Errors
///
/// Fails if the configuration is invalid or the store cannot be opened.
pub fn build_context<S>(
    cfg: AppConfig,
    executor: Arc<dyn PromptExecutor>,
    notifier: Arc<dyn Notifier>,
    spawner: S,
) -> AppResult<AppContext<S>>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    cfg.validate().map_err(|e| anyhow!("config invalid: {e}"))?;
    let store = build_store(&cfg.scheduler).context("failed to open task store")?;
    build_context_with_store(cfg, store, executor, notifier, spawner)
}

/// Build an application context around an existing store.
///
/// # Errors
///
/// Fails if the configuration is invalid.
pub fn build_context_with_store<S>(
    cfg: AppConfig,
    store: Arc<dyn TaskStore>,
    executor: Arc<dyn PromptExecutor>,
    notifier: Arc<dyn Notifier>,
    spawner: S,
) -> AppResult<AppContext<S>>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    cfg.validate().map_err(|e| anyhow!("config invalid: {e}"))?;

    let orchestrator = Orchestrator::new(cfg.orchestrator.clone(), spawner.clone());
    let dispatcher = match cfg.scheduler.fire_route {
        FireRoute::Direct => None,
        FireRoute::Orchestrator => Some(orchestrator.clone()),
    };
    let scheduler = Scheduler::new(
        cfg.scheduler.clone(),
        store,
        executor,
        notifier,
        spawner,
        dispatcher,
    );

    Ok(AppContext {
        config: cfg,
        orchestrator,
        scheduler,
    })
}
