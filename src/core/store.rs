//! Persistence seam for scheduled tasks.

use async_trait::async_trait;

use super::{ScheduledStatus, ScheduledTask, SchedulerError};

/// Document store for scheduled tasks, keyed by `task_id`.
///
/// Writes are last-write-wins; the scheduler persists the whole record on every
/// mutation.
#[async_trait]
pub trait TaskStore: Send + Sync + 'static {
    /// Insert or replace the record with the same `task_id`.
    async fn upsert(&self, task: &ScheduledTask) -> Result<(), SchedulerError>;

    /// Fetch a record by id.
    async fn get(&self, task_id: &str) -> Result<Option<ScheduledTask>, SchedulerError>;

    /// Every record currently in `status`.
    async fn list_by_status(
        &self,
        status: ScheduledStatus,
    ) -> Result<Vec<ScheduledTask>, SchedulerError>;
}
