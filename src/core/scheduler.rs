//! Scheduler facade owning the pool, queue, engine, worker and task sources.
//!
//! Collaborators submit [`TaskSpec`]s and observe task views, resource
//! snapshots, statistics and the audit log. Nothing outside this module
//! touches the pool or a task's status.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::SchedulerConfig;
use crate::core::audit::{build_audit_event, AuditAction, AuditEvent, InMemoryAuditSink};
use crate::core::engine::{EngineStats, SharedAuditSink};
use crate::core::registry::TaskRegistry;
use crate::core::source::{spawn_periodic_source, PeriodicSourceHandle, Submit, TaskFactory};
use crate::core::worker::{spawn_worker, WorkerHandle};
use crate::core::{
    ExecutionEngine, ResourcePool, ResourceSnapshot, SchedulerError, SchedulerQueue, Task,
    TaskSpec, TaskView,
};
use crate::infra::queue::InMemoryQueue;
use crate::util::clock::{SystemTickClock, TickClock};
use crate::util::serde::TaskId;

/// Aggregate scheduler statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Engine counters.
    pub engine: EngineStats,
    /// Tasks accepted since construction.
    pub submitted: usize,
    /// Tasks currently waiting in the queue.
    pub queued: usize,
}

/// Shared state reachable from the worker and source threads.
struct SchedulerCore<C: TickClock> {
    queue: Arc<SchedulerQueue<InMemoryQueue>>,
    engine: Arc<ExecutionEngine<C>>,
    factory: TaskFactory,
    registry: RwLock<TaskRegistry>,
    submitted: AtomicUsize,
    audit: SharedAuditSink,
}

impl<C: TickClock> SchedulerCore<C> {
    fn accept(&self, task: Arc<Task>) -> Result<(), SchedulerError> {
        {
            // Enqueue under the audit lock: the worker cannot log Admit or
            // Reject for this task before its Enqueue event is recorded.
            let mut audit = self.audit.lock();
            self.queue.enqueue(Arc::clone(&task))?;
            audit.record(build_audit_event(
                task.id(),
                AuditAction::Enqueue,
                Some(format!("priority={}", task.priority())),
            ));
        }
        self.registry.write().insert(task);
        self.submitted.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

impl<C: TickClock> Submit for SchedulerCore<C> {
    fn submit(&self, spec: TaskSpec) -> Result<Arc<Task>, SchedulerError> {
        let task = Arc::new(self.factory.create(spec)?);
        self.accept(Arc::clone(&task))?;
        Ok(task)
    }
}

/// Progress of [`Scheduler::start`], kept across failed attempts.
#[derive(Debug, Default)]
struct StartState {
    started: bool,
    /// Initial tasks already queued.
    initial_queued: usize,
}

/// Resource-constrained priority scheduler.
pub struct Scheduler<C: TickClock = SystemTickClock> {
    config: SchedulerConfig,
    core: Arc<SchedulerCore<C>>,
    start_state: Mutex<StartState>,
    worker: Mutex<Option<WorkerHandle<InMemoryQueue>>>,
    source: Mutex<Option<PeriodicSourceHandle>>,
}

impl Scheduler<SystemTickClock> {
    /// Build a scheduler whose ticks sleep for `config.tick_interval_ms`.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Config` when the configuration is invalid.
    pub fn from_config(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        let clock = SystemTickClock::new(Duration::from_millis(config.tick_interval_ms));
        Self::new(config, clock)
    }
}

impl<C: TickClock> Scheduler<C> {
    /// Build a scheduler with an explicit tick clock. Nothing runs until
    /// [`Scheduler::start`].
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Config` when the configuration is invalid.
    pub fn new(config: SchedulerConfig, clock: C) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::Config)?;

        let pool = match config.initial_levels {
            Some(levels) => ResourcePool::with_levels(config.capacity, levels)?,
            None => ResourcePool::new(config.capacity),
        };
        let sink: Box<dyn crate::core::AuditSink> =
            Box::new(InMemoryAuditSink::new(config.audit_capacity));
        let audit: SharedAuditSink = Arc::new(Mutex::new(sink));
        let engine = ExecutionEngine::new(Arc::new(pool), clock).with_audit(Arc::clone(&audit));
        let queue = SchedulerQueue::new(InMemoryQueue::new(config.max_queue_depth));
        let registry = TaskRegistry::new(config.registry_capacity);

        Ok(Self {
            config,
            core: Arc::new(SchedulerCore {
                queue: Arc::new(queue),
                engine: Arc::new(engine),
                factory: TaskFactory::default(),
                registry: RwLock::new(registry),
                submitted: AtomicUsize::new(0),
                audit,
            }),
            start_state: Mutex::new(StartState::default()),
            worker: Mutex::new(None),
            source: Mutex::new(None),
        })
    }

    /// Queue the configured initial batch, then start the worker and, if
    /// configured, the periodic task source. Once it has succeeded, calling
    /// it again does nothing.
    ///
    /// The whole initial batch is queued before the worker starts, so it is
    /// dequeued in exact scheduling order. A failed start leaves the
    /// scheduler stopped; retrying resumes without queuing any initial task
    /// twice.
    ///
    /// # Errors
    ///
    /// `Shutdown` after [`Scheduler::shutdown`], `QueueFull` if the queue has
    /// no room for the rest of the initial batch, `Spawn` if a thread cannot
    /// be started.
    pub fn start(&self) -> Result<(), SchedulerError> {
        let mut state = self.start_state.lock();
        if state.started {
            warn!("scheduler already started");
            return Ok(());
        }
        if self.core.queue.is_closed() {
            return Err(SchedulerError::Shutdown);
        }
        self.queue_initial_batch(&mut state)?;

        {
            let mut worker = self.worker.lock();
            if worker.is_none() {
                *worker = Some(spawn_worker(
                    Arc::clone(&self.core.queue),
                    Arc::clone(&self.core.engine),
                )?);
            }
        }
        if let Some(generator) = &self.config.generator {
            let mut source = self.source.lock();
            if source.is_none() {
                let submitter: Arc<dyn Submit> = self.core.clone();
                *source = Some(spawn_periodic_source(submitter, generator.clone())?);
            }
        }

        state.started = true;
        info!(
            initial_tasks = self.config.initial_tasks.len(),
            capacity = %self.config.capacity,
            "scheduler started"
        );
        Ok(())
    }

    fn queue_initial_batch(&self, state: &mut StartState) -> Result<(), SchedulerError> {
        let remaining = &self.config.initial_tasks[state.initial_queued..];
        let room = self
            .config
            .max_queue_depth
            .saturating_sub(self.core.queue.len());
        if remaining.len() > room {
            warn!(remaining = remaining.len(), room, "initial batch does not fit the queue");
            return Err(SchedulerError::QueueFull(format!(
                "initial batch needs {} slots, {room} free",
                remaining.len()
            )));
        }
        for spec in remaining {
            self.core.submit(spec.clone())?;
            state.initial_queued += 1;
        }
        Ok(())
    }

    /// Create a task from `spec` and queue it.
    ///
    /// # Errors
    ///
    /// `InvalidTask`, `QueueFull` or `Shutdown`.
    pub fn submit(&self, spec: TaskSpec) -> Result<Arc<Task>, SchedulerError> {
        self.core.submit(spec)
    }

    /// Queue a task built elsewhere. The caller is responsible for id uniqueness.
    ///
    /// # Errors
    ///
    /// `QueueFull` or `Shutdown`.
    pub fn submit_task(&self, task: Arc<Task>) -> Result<(), SchedulerError> {
        self.core.accept(task)
    }

    /// Views of retained tasks, in submission order.
    ///
    /// Unfinished tasks are always retained. Beyond
    /// `SchedulerConfig::registry_capacity` the oldest terminal tasks are
    /// forgotten.
    pub fn tasks(&self) -> Vec<TaskView> {
        self.core.registry.read().iter().map(|t| t.view()).collect()
    }

    /// Look up a task by id.
    pub fn task(&self, id: TaskId) -> Option<Arc<Task>> {
        self.core.registry.read().get(id)
    }

    /// Views of queued tasks in the order they will be dequeued.
    pub fn pending(&self) -> Vec<TaskView> {
        self.core
            .queue
            .pending_snapshot()
            .iter()
            .map(|t| t.view())
            .collect()
    }

    /// Current resource levels.
    pub fn resources(&self) -> ResourceSnapshot {
        self.core.engine.pool().snapshot()
    }

    /// Aggregate statistics.
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            engine: self.core.engine.stats(),
            submitted: self.core.submitted.load(Ordering::Acquire),
            queued: self.core.queue.len(),
        }
    }

    /// Retained audit events, oldest first.
    pub fn audit_events(&self) -> Vec<AuditEvent> {
        self.core.audit.lock().events()
    }

    /// Whether the worker thread is alive.
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|w| !w.is_finished())
    }

    /// Wait until every accepted task is terminal.
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let tasks = self.core.registry.read().unfinished();
        tasks.iter().all(|task| {
            let left = deadline.saturating_duration_since(Instant::now());
            task.wait_terminal(left).is_some()
        })
    }

    /// Stop the task source and the worker. Queued tasks stay `Pending`.
    pub fn shutdown(&self) {
        // Joins happen after the handle locks are released.
        let source = self.source.lock().take();
        if let Some(mut source) = source {
            source.shutdown();
        }
        self.core.queue.close();
        let worker = self.worker.lock().take();
        if let Some(mut worker) = worker {
            worker.shutdown();
        }
    }
}

impl<C: TickClock> Drop for Scheduler<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
