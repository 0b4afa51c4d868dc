//! In-memory priority queue backend.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use crate::core::ordering::{compare_schedule, ScheduleKey};
use crate::core::{SchedulerError, Task, TaskQueue};

/// Heap entry ordered so the max-heap pops the task that schedules first.
struct PriorityTask {
    key: ScheduleKey,
    task: Arc<Task>,
}

impl PartialEq for PriorityTask {
    fn eq(&self, other: &Self) -> bool {
        self.key.seq == other.key.seq
    }
}

impl Eq for PriorityTask {}

impl PartialOrd for PriorityTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PriorityTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap pops the greatest element.
        compare_schedule(&other.key, &self.key)
    }
}

/// In-memory queue storing tasks in a binary heap.
/// O(log n) enqueue and dequeue.
pub struct InMemoryQueue {
    max_depth: usize,
    next_seq: u64,
    tasks: BinaryHeap<PriorityTask>,
}

impl InMemoryQueue {
    /// Create a queue holding at most `max_depth` tasks.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            next_seq: 0,
            tasks: BinaryHeap::with_capacity(max_depth.min(1024)),
        }
    }

    /// Create a queue with no practical depth limit.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::new(usize::MAX)
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl TaskQueue for InMemoryQueue {
    fn enqueue(&mut self, task: Arc<Task>) -> Result<(), SchedulerError> {
        if self.len() >= self.max_depth() {
            return Err(SchedulerError::QueueFull("max queue depth reached".into()));
        }
        let key = ScheduleKey::of(&task, self.next_seq);
        self.next_seq += 1;
        self.tasks.push(PriorityTask { key, task });
        Ok(())
    }

    fn dequeue(&mut self) -> Option<Arc<Task>> {
        self.tasks.pop().map(|pt| pt.task)
    }

    fn snapshot(&self) -> Vec<Arc<Task>> {
        let mut entries: Vec<&PriorityTask> = self.tasks.iter().collect();
        entries.sort_by(|a, b| compare_schedule(&a.key, &b.key));
        entries.into_iter().map(|pt| Arc::clone(&pt.task)).collect()
    }

    fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn len(&self) -> usize {
        self.tasks.len()
    }
}
