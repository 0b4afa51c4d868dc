//! Scheduling order: status rank, then priority (highest first), then FIFO.

use std::cmp::Ordering;

use crate::core::{Task, TaskStatus};
use crate::util::serde::Priority;

/// Sort key captured when a task is enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleKey {
    /// Status at enqueue time.
    pub status: TaskStatus,
    /// Task priority.
    pub priority: Priority,
    /// Insertion sequence number, the final tie-break.
    pub seq: u64,
}

impl ScheduleKey {
    /// Capture the key of `task` with insertion number `seq`.
    #[must_use]
    pub fn of(task: &Task, seq: u64) -> Self {
        Self {
            status: task.status(),
            priority: task.priority(),
            seq,
        }
    }
}

/// Compare two keys. `Ordering::Less` means `a` is dequeued before `b`.
#[must_use]
pub fn compare_schedule(a: &ScheduleKey, b: &ScheduleKey) -> Ordering {
    a.status
        .rank()
        .cmp(&b.status.rank())
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| a.seq.cmp(&b.seq))
}
