//! File-backed task store using JSON lines.
//!
//! Every upsert appends the full record as one line. On open the file is replayed
//! (the last line for an id wins) and rewritten with one line per record. Once
//! superseded lines outnumber live records the file is compacted again, so a
//! recurring task firing for weeks does not grow it without bound.
//!
//! File I/O runs on tokio's blocking pool, never on an async worker.

use std::collections::HashMap;
use std::fs::{create_dir_all, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::core::{ScheduledStatus, ScheduledTask, SchedulerError, TaskStore};

/// Lines tolerated before compaction is considered at all.
const COMPACT_MIN_LINES: usize = 256;

fn store_err(e: impl std::fmt::Display) -> SchedulerError {
    SchedulerError::Store(e.to_string())
}

struct JournalState {
    records: HashMap<String, ScheduledTask>,
    /// Lines currently in the file, live or superseded.
    lines: usize,
}

impl JournalState {
    fn needs_compaction(&self) -> bool {
        self.lines > COMPACT_MIN_LINES && self.lines > self.records.len() * 2
    }
}

struct Journal {
    file_path: PathBuf,
    state: Mutex<JournalState>,
}

impl Journal {
    fn load(file_path: &Path) -> Result<HashMap<String, ScheduledTask>, SchedulerError> {
        let mut records = HashMap::new();
        if !file_path.exists() {
            return Ok(records);
        }
        let file = OpenOptions::new()
            .read(true)
            .open(file_path)
            .map_err(store_err)?;
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(store_err)?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ScheduledTask>(&line) {
                Ok(task) => {
                    records.insert(task.task_id.clone(), task);
                }
                // A torn trailing write must not make the whole store unreadable.
                Err(e) => warn!(line = lineno + 1, error = %e, "skipping unreadable store record"),
            }
        }
        Ok(records)
    }

    fn append(&self, task: &ScheduledTask) -> Result<(), SchedulerError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)
            .map_err(store_err)?;
        let line = serde_json::to_string(task).map_err(store_err)?;
        writeln!(file, "{line}").map_err(store_err)
    }

    fn rewrite(&self, state: &mut JournalState) -> Result<(), SchedulerError> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.file_path)
            .map_err(store_err)?;
        for task in state.records.values() {
            let line = serde_json::to_string(task).map_err(store_err)?;
            writeln!(file, "{line}").map_err(store_err)?;
        }
        state.lines = state.records.len();
        Ok(())
    }

    /// Blocking write path: append, record, compact when due.
    fn write(&self, task: ScheduledTask) -> Result<(), SchedulerError> {
        let mut state = self.state.lock();
        self.append(&task)?;
        state.lines += 1;
        state.records.insert(task.task_id.clone(), task);
        if state.needs_compaction() {
            debug!(lines = state.lines, records = state.records.len(), "compacting jsonl store");
            self.rewrite(&mut state)?;
        }
        Ok(())
    }
}

/// Durable store backed by a single JSONL file.
pub struct JsonlStore {
    journal: Arc<Journal>,
}

impl JsonlStore {
    /// Open (or create) the store at `file_path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Store`] if the file cannot be read or compacted.
    pub fn open(file_path: impl AsRef<Path>) -> Result<Self, SchedulerError> {
        let file_path = file_path.as_ref().to_path_buf();
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir_all(parent).map_err(store_err)?;
        }
        let journal = Journal {
            state: Mutex::new(JournalState {
                records: Journal::load(&file_path)?,
                lines: 0,
            }),
            file_path,
        };
        {
            let mut state = journal.state.lock();
            journal.rewrite(&mut state)?;
        }

        let store = Self {
            journal: Arc::new(journal),
        };
        debug!(path = %store.path().display(), records = store.len(), "opened jsonl store");
        Ok(store)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.journal.file_path
    }

    /// Number of stored records, in any status.
    pub fn len(&self) -> usize {
        self.journal.state.lock().records.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.journal.state.lock().records.is_empty()
    }
}

#[async_trait]
impl TaskStore for JsonlStore {
    async fn upsert(&self, task: &ScheduledTask) -> Result<(), SchedulerError> {
        let journal = Arc::clone(&self.journal);
        let task = task.clone();
        tokio::task::spawn_blocking(move || journal.write(task))
            .await
            .map_err(store_err)?
    }

    async fn get(&self, task_id: &str) -> Result<Option<ScheduledTask>, SchedulerError> {
        Ok(self.journal.state.lock().records.get(task_id).cloned())
    }

    async fn list_by_status(
        &self,
        status: ScheduledStatus,
    ) -> Result<Vec<ScheduledTask>, SchedulerError> {
        Ok(self
            .journal
            .state
            .lock()
            .records
            .values()
            .filter(|task| task.status == status)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Priority, ScheduleSpec};

    fn sample(name: &str) -> ScheduledTask {
        ScheduledTask::new(
            "owner",
            name,
            "prompt",
            ScheduleSpec::Recurring("0 9 * * 1".into()),
            Priority::Medium,
        )
    }

    #[tokio::test]
    async fn test_last_write_wins_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tasks.jsonl");

        let mut task = sample("standup");
        {
            let store = JsonlStore::open(&path).unwrap();
            store.upsert(&task).await.unwrap();
            task.status = ScheduledStatus::Cancelled;
            store.upsert(&task).await.unwrap();
            store.upsert(&sample("other")).await.unwrap();
        }

        let reopened = JsonlStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        let loaded = reopened.get(&task.task_id).await.unwrap().unwrap();
        assert_eq!(loaded.status, ScheduledStatus::Cancelled);
        assert_eq!(
            reopened
                .list_by_status(ScheduledStatus::Pending)
                .await
                .unwrap()
                .len(),
            1
        );

        // Compaction leaves one line per record.
        let lines = std::fs::read_to_string(&path).unwrap().lines().count();
        assert_eq!(lines, 2);
    }

    #[tokio::test]
    async fn test_skips_torn_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.jsonl");
        let task = sample("kept");
        std::fs::write(
            &path,
            format!("{}\n{{\"taskId\":\"trunc", serde_json::to_string(&task).unwrap()),
        )
        .unwrap();

        let store = JsonlStore::open(&path).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get(&task.task_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_repeated_upserts_trigger_compaction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.jsonl");
        let store = JsonlStore::open(&path).unwrap();

        let mut task = sample("heartbeat");
        for _ in 0..(COMPACT_MIN_LINES * 2) {
            task.executed_at = Some(chrono::Utc::now());
            store.upsert(&task).await.unwrap();
        }

        let lines = std::fs::read_to_string(&path).unwrap().lines().count();
        assert!(lines <= COMPACT_MIN_LINES, "file kept {lines} lines");

        let reopened = JsonlStore::open(&path).unwrap();
        let loaded = reopened.get(&task.task_id).await.unwrap().unwrap();
        assert_eq!(loaded.executed_at, task.executed_at);
    }
}
