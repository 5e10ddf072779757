//! In-memory task store backend.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::{ScheduledStatus, ScheduledTask, SchedulerError, TaskStore};

/// Simple in-memory store for development/testing. Nothing survives a restart.
#[derive(Default)]
pub struct InMemoryStore {
    records: Mutex<HashMap<String, ScheduledTask>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, in any status.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Copy of every stored record.
    pub fn snapshot(&self) -> Vec<ScheduledTask> {
        self.records.lock().values().cloned().collect()
    }
}

#[async_trait]
impl TaskStore for InMemoryStore {
    async fn upsert(&self, task: &ScheduledTask) -> Result<(), SchedulerError> {
        self.records
            .lock()
            .insert(task.task_id.clone(), task.clone());
        Ok(())
    }

    async fn get(&self, task_id: &str) -> Result<Option<ScheduledTask>, SchedulerError> {
        Ok(self.records.lock().get(task_id).cloned())
    }

    async fn list_by_status(
        &self,
        status: ScheduledStatus,
    ) -> Result<Vec<ScheduledTask>, SchedulerError> {
        Ok(self
            .records
            .lock()
            .values()
            .filter(|task| task.status == status)
            .cloned()
            .collect())
    }
}
