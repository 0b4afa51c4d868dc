//! Execution engine: admission and incremental resource consumption.
//!
//! A task moves `Pending -> Admitting -> Running -> {Completed, Failed}`.
//! Admission checks all three requirements at once against the pool; on
//! success the task becomes `InProgress` and consumes a proportional share of
//! its requirements on each tick of its duration.
//!
//! # Serialization
//!
//! The whole execution of a task, from the admission check to the terminal
//! transition, runs under one exclusive execution lock. No two tasks ever
//! consume resources concurrently, so admission cannot be invalidated by
//! another task between the check and the first tick. Running tasks in
//! parallel would require replacing per-tick `try_consume_all` with a
//! reservation/commit protocol.
//!
//! Shares already consumed are never refunded, even if a later tick fails.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::audit::{build_audit_event, AuditAction, AuditSink};
use crate::core::{ResourcePool, SchedulerError, Task, TaskStatus};
use crate::util::clock::{SystemTickClock, TickClock};
use crate::util::serde::TaskId;

/// Audit sink shared between the engine and the scheduler facade.
pub type SharedAuditSink = Arc<Mutex<Box<dyn AuditSink>>>;

/// Engine statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Tasks handed to the engine in `Pending` status.
    pub executed: u64,
    /// Tasks that consumed every tick.
    pub completed: u64,
    /// Tasks rejected at admission.
    pub rejected: u64,
    /// Tasks that ran short after admission.
    pub failed: u64,
    /// Ticks consumed across all tasks.
    pub ticks: u64,
    /// Non-pending tasks discarded by the worker loop.
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct EngineCounters {
    executed: AtomicU64,
    completed: AtomicU64,
    rejected: AtomicU64,
    failed: AtomicU64,
    ticks: AtomicU64,
    dropped: AtomicU64,
}

impl EngineCounters {
    fn snapshot(&self) -> EngineStats {
        EngineStats {
            executed: self.executed.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            ticks: self.ticks.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Runs admitted tasks against a shared resource pool.
pub struct ExecutionEngine<C: TickClock = SystemTickClock> {
    pool: Arc<ResourcePool>,
    clock: C,
    exec_lock: Mutex<()>,
    audit: Option<SharedAuditSink>,
    counters: EngineCounters,
}

impl<C: TickClock> ExecutionEngine<C> {
    /// Create an engine drawing from `pool` and pacing ticks with `clock`.
    pub fn new(pool: Arc<ResourcePool>, clock: C) -> Self {
        Self {
            pool,
            clock,
            exec_lock: Mutex::new(()),
            audit: None,
            counters: EngineCounters::default(),
        }
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: SharedAuditSink) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Pool this engine draws from.
    pub const fn pool(&self) -> &Arc<ResourcePool> {
        &self.pool
    }

    /// Current statistics.
    pub fn stats(&self) -> EngineStats {
        self.counters.snapshot()
    }

    /// Admit and run `task` to a terminal status.
    ///
    /// Returns `Ok(TaskStatus::Completed)` when every tick succeeded.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::InsufficientResource` when admission or a tick falls
    ///   short; the task is `Failed` and carries the same error
    /// - `SchedulerError::InvalidTask` when the task is not `Pending`; the task
    ///   is left untouched
    pub fn execute(&self, task: &Task) -> Result<TaskStatus, SchedulerError> {
        let _exclusive = self.exec_lock.lock();
        let task_id = task.id();

        let status = task.status();
        if status != TaskStatus::Pending {
            warn!(task_id, ?status, "refusing to execute non-pending task");
            return Err(SchedulerError::InvalidTask(format!(
                "task {task_id} is {status:?}, expected Pending"
            )));
        }
        self.counters.executed.fetch_add(1, Ordering::Relaxed);

        debug!(task_id, requirements = %task.requirements(), "admitting task");
        if let Err(err) = self.pool.check_available(task.requirements()) {
            warn!(task_id, error = %err, "task rejected at admission");
            task.fail(err.clone())?;
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            self.record(task_id, AuditAction::Reject, Some(err.to_string()));
            return Err(err);
        }
        task.transition(TaskStatus::InProgress)?;
        info!(
            task_id,
            kind = %task.kind(),
            priority = task.priority(),
            duration = task.duration(),
            "task started"
        );
        self.record(task_id, AuditAction::Admit, None);

        let duration = task.duration();
        for tick in 1..=duration {
            let share = task.requirements().tick_share(tick, duration);
            if let Err(err) = self.pool.try_consume_all(&share) {
                warn!(task_id, tick, duration, error = %err, "task ran short mid-execution");
                task.fail(err.clone())?;
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                self.record(task_id, AuditAction::Fail, Some(err.to_string()));
                return Err(err);
            }
            task.record_tick();
            self.counters.ticks.fetch_add(1, Ordering::Relaxed);
            self.clock.tick();
            debug!(task_id, tick, duration, "progress");
            self.record(task_id, AuditAction::Tick, Some(format!("{tick}/{duration}")));
        }

        task.transition(TaskStatus::Completed)?;
        self.counters.completed.fetch_add(1, Ordering::Relaxed);
        info!(task_id, kind = %task.kind(), "task completed");
        self.record(task_id, AuditAction::Complete, None);
        Ok(TaskStatus::Completed)
    }

    /// Account for a task the worker discarded without executing.
    pub(crate) fn note_dropped(&self, task: &Task) {
        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
        self.record(task.id(), AuditAction::Drop, Some(format!("{:?}", task.status())));
    }

    fn record(&self, task_id: TaskId, action: AuditAction, detail: Option<String>) {
        if let Some(audit) = &self.audit {
            audit.lock().record(build_audit_event(task_id, action, detail));
        }
    }
}
