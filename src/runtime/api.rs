//! API-facing request/response models.

use serde::{Deserialize, Serialize};

use crate::core::{ResourceSnapshot, Scheduler, Task, TaskSpec, TaskStatus};
use crate::util::clock::TickClock;
use crate::util::serde::{Priority, Resources, TaskId, TaskKind};

/// Task submission payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSubmission {
    /// Descriptive category.
    pub kind: TaskKind,
    /// Priority; higher runs first.
    pub priority: Priority,
    /// Total resources drawn over the task's run.
    pub requirements: Resources,
    /// Run length in ticks.
    pub duration: u32,
}

impl From<TaskSubmission> for TaskSpec {
    fn from(req: TaskSubmission) -> Self {
        Self::new(req.kind, req.priority, req.requirements, req.duration)
    }
}

/// Task status response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    /// Task identifier.
    pub task_id: TaskId,
    /// Current status.
    pub status: TaskStatus,
    /// Ticks consumed so far.
    pub ticks_completed: u32,
    /// Optional reason for failure.
    pub reason: Option<String>,
}

impl From<&Task> for TaskStatusResponse {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id(),
            status: task.status(),
            ticks_completed: task.ticks_completed(),
            reason: task.error().map(|e| e.to_string()),
        }
    }
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
    /// Whether the worker thread is alive.
    pub worker_running: bool,
    /// Tasks waiting in the queue.
    pub queued: usize,
}

/// Submit a task and report its initial status.
///
/// # Errors
///
/// Returns the scheduler's refusal rendered as text.
pub fn submit_task<C: TickClock>(
    scheduler: &Scheduler<C>,
    req: TaskSubmission,
) -> Result<TaskStatusResponse, String> {
    scheduler
        .submit(req.into())
        .map(|task| TaskStatusResponse::from(task.as_ref()))
        .map_err(|e| e.to_string())
}

/// Current status of task `id`, if the scheduler knows it.
pub fn status_of<C: TickClock>(scheduler: &Scheduler<C>, id: TaskId) -> Option<TaskStatusResponse> {
    scheduler.task(id).map(|task| TaskStatusResponse::from(task.as_ref()))
}

/// Current resource levels.
pub fn resources<C: TickClock>(scheduler: &Scheduler<C>) -> ResourceSnapshot {
    scheduler.resources()
}

/// Return a health payload. Healthy means the worker is running.
pub fn health<C: TickClock>(scheduler: &Scheduler<C>) -> Health {
    let worker_running = scheduler.is_running();
    Health {
        ok: worker_running,
        worker_running,
        queued: scheduler.stats().queued,
    }
}

/// Wait without blocking the async runtime until task `id` is terminal.
///
/// Returns `None` for unknown ids; otherwise the task's status when the wait
/// ended, which may still be non-terminal if `timeout` elapsed.
#[cfg(feature = "tokio-runtime")]
pub async fn await_task<C: TickClock>(
    scheduler: &Scheduler<C>,
    id: TaskId,
    timeout: std::time::Duration,
) -> Option<TaskStatusResponse> {
    let task = scheduler.task(id)?;
    task.clone().wait_terminal_async(timeout).await;
    Some(TaskStatusResponse::from(task.as_ref()))
}
