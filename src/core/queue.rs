//! Priority queue for pending orchestrator tasks.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::{Priority, Task};

/// Heap entry ordered by priority (most urgent first), then FIFO by sequence.
struct QueuedTask {
    task: Task,
    seq: u64,
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: the lower priority value and the lower sequence must compare greater.
        other
            .task
            .priority
            .cmp(&self.task.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Unbounded priority queue with a monotonic sequence tie-break.
///
/// Equal-priority tasks dequeue in the order they were pushed. A task pushed back
/// after a failed dispatch attempt receives a new sequence number.
#[derive(Default)]
pub struct DispatchQueue {
    tasks: BinaryHeap<QueuedTask>,
    next_seq: u64,
}

impl DispatchQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a task. O(log n).
    pub fn push(&mut self, task: Task) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.tasks.push(QueuedTask { task, seq });
    }

    /// Pop the most urgent task. O(log n).
    pub fn pop(&mut self) -> Option<Task> {
        self.tasks.pop().map(|queued| queued.task)
    }

    /// Priority of the task that would be popped next.
    pub fn peek_priority(&self) -> Option<Priority> {
        self.tasks.peek().map(|queued| queued.task.priority)
    }

    /// Drop every queued task and return how many were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.tasks.len();
        self.tasks.clear();
        removed
    }

    /// Current depth.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn make_task(name: &str, priority: Priority) -> Task {
        Task::new(
            priority,
            name,
            Arc::new(|| async { Ok::<(), anyhow::Error>(()) }),
            true,
        )
    }

    fn drain_names(q: &mut DispatchQueue) -> Vec<String> {
        std::iter::from_fn(|| q.pop()).map(|t| t.name).collect()
    }

    #[test]
    fn test_priority_ordering() {
        let mut q = DispatchQueue::new();

        q.push(make_task("low", Priority::Low));
        q.push(make_task("urgent", Priority::Urgent));
        q.push(make_task("background", Priority::Background));
        q.push(make_task("medium", Priority::Medium));
        q.push(make_task("high", Priority::High));

        assert_eq!(q.peek_priority(), Some(Priority::Urgent));
        assert_eq!(
            drain_names(&mut q),
            vec!["urgent", "high", "medium", "low", "background"]
        );
    }

    #[test]
    fn test_fifo_within_priority() {
        let mut q = DispatchQueue::new();

        q.push(make_task("first", Priority::Medium));
        q.push(make_task("second", Priority::Medium));
        q.push(make_task("urgent", Priority::Urgent));
        q.push(make_task("third", Priority::Medium));

        assert_eq!(
            drain_names(&mut q),
            vec!["urgent", "first", "second", "third"]
        );
    }

    #[test]
    fn test_clear_reports_removed() {
        let mut q = DispatchQueue::new();
        q.push(make_task("a", Priority::Low));
        q.push(make_task("b", Priority::High));

        assert_eq!(q.clear(), 2);
        assert!(q.is_empty());
        assert!(q.pop().is_none());
    }

    #[test]
    fn test_empty_queue() {
        let mut q = DispatchQueue::new();
        assert!(q.pop().is_none());
        assert_eq!(q.len(), 0);
        assert_eq!(q.peek_priority(), None);
    }
}
