//! Execution seams: orchestrator actions, scheduler collaborators, and spawning.

use std::future::Future;

use async_trait::async_trait;

use super::AppResult;

/// A re-invocable unit of in-process work run by the orchestrator.
///
/// Pausing a task is bookkeeping only: a resumed task calls `run` again from the
/// beginning. Implementations must be cheap to re-run or internally idempotent.
///
/// Any `Fn() -> impl Future<Output = AppResult<()>>` closure is a `TaskAction`:
///
/// ```rust,ignore
/// orchestrator.queue_task(Priority::Background, "cleanup", || async {
///     purge_stale_sessions().await?;
///     Ok(())
/// }, true);
/// ```
#[async_trait]
pub trait TaskAction: Send + Sync + 'static {
    /// Run the action to completion.
    async fn run(&self) -> AppResult<()>;
}

#[async_trait]
impl<F, Fut> TaskAction for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<()>> + Send + 'static,
{
    async fn run(&self) -> AppResult<()> {
        (self)().await
    }
}

/// Produces a text response for a prompt. This is where the LLM agent lives.
///
/// The executor has no knowledge of scheduling; it may fail.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use assistant_dispatch::core::{AppResult, PromptExecutor};
///
/// struct AgentExecutor { client: AgentClient }
///
/// #[async_trait]
/// impl PromptExecutor for AgentExecutor {
///     async fn execute(&self, prompt: &str) -> AppResult<String> {
///         self.client.generate_response(prompt).await
///     }
/// }
/// ```
#[async_trait]
pub trait PromptExecutor: Send + Sync + 'static {
    /// Execute a prompt and return the response text.
    async fn execute(&self, prompt: &str) -> AppResult<String>;
}

/// Delivers text messages to connected clients.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Broadcast a message; returns whether it was delivered to anyone.
    async fn broadcast(&self, message: &str) -> bool;
    /// Whether any client is currently connected.
    fn has_recipients(&self) -> bool;
}

/// Abstraction for spawning background work on a runtime.
pub trait Spawn {
    /// Spawn a detached future.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}
