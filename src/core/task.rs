//! Task entity: immutable requirements plus a monotone status.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};

use crate::core::SchedulerError;
use crate::util::serde::{Priority, Resources, TaskId, TaskKind};

/// Status of a task in the scheduler lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting in the queue.
    Pending,
    /// Admitted and consuming resources.
    InProgress,
    /// Every tick consumed its share.
    Completed,
    /// Rejected at admission or ran short mid-execution.
    Failed,
}

impl TaskStatus {
    /// Ordering rank: non-terminal statuses sort before terminal ones.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::InProgress => 1,
            Self::Completed => 2,
            Self::Failed => 3,
        }
    }

    /// `Completed` or `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `self -> next` is a legal lifecycle step.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InProgress | Self::Failed)
                | (Self::InProgress, Self::Completed | Self::Failed)
        )
    }
}

/// Caller-supplied description of a task, without an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Descriptive category.
    pub kind: TaskKind,
    /// Higher is more urgent.
    pub priority: Priority,
    /// Total amount of each resource consumed over the whole duration.
    pub requirements: Resources,
    /// Number of execution ticks, must be positive.
    pub duration: u32,
}

impl TaskSpec {
    /// Describe a task; see [`TaskSpec::validate`] for the accepted values.
    #[must_use]
    pub const fn new(kind: TaskKind, priority: Priority, requirements: Resources, duration: u32) -> Self {
        Self {
            kind,
            priority,
            requirements,
            duration,
        }
    }

    /// Reject specs that can never run.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidTask` when `duration` is zero.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.duration == 0 {
            return Err(SchedulerError::InvalidTask(
                "duration must be at least one tick".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct TaskState {
    status: TaskStatus,
    error: Option<SchedulerError>,
    ticks_completed: u32,
}

/// Serializable view of a task for observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskView {
    /// Task identifier.
    pub id: TaskId,
    /// Descriptive category.
    pub kind: TaskKind,
    /// Priority.
    pub priority: Priority,
    /// Total requirements.
    pub requirements: Resources,
    /// Declared duration in ticks.
    pub duration: u32,
    /// Current status.
    pub status: TaskStatus,
    /// Ticks consumed so far.
    pub ticks_completed: u32,
    /// Failure reason, if any.
    pub error: Option<String>,
}

/// A schedulable task.
///
/// Identity and requirements are fixed at construction. The status is the
/// only mutable state and follows `Pending -> InProgress -> {Completed, Failed}`
/// (or `Pending -> Failed` on rejected admission). Terminal statuses are final.
#[derive(Debug)]
pub struct Task {
    id: TaskId,
    kind: TaskKind,
    priority: Priority,
    requirements: Resources,
    duration: u32,
    state: Mutex<TaskState>,
    settled: Condvar,
}

impl Task {
    /// Create a pending task.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidTask` when `duration` is zero.
    pub fn new(
        id: TaskId,
        kind: TaskKind,
        priority: Priority,
        requirements: Resources,
        duration: u32,
    ) -> Result<Self, SchedulerError> {
        Self::from_spec(id, TaskSpec::new(kind, priority, requirements, duration))
    }

    /// Create a pending task from a spec.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidTask` when `spec` is invalid.
    pub fn from_spec(id: TaskId, spec: TaskSpec) -> Result<Self, SchedulerError> {
        spec.validate()?;
        Ok(Self {
            id,
            kind: spec.kind,
            priority: spec.priority,
            requirements: spec.requirements,
            duration: spec.duration,
            state: Mutex::new(TaskState {
                status: TaskStatus::Pending,
                error: None,
                ticks_completed: 0,
            }),
            settled: Condvar::new(),
        })
    }

    /// Task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Descriptive category.
    #[must_use]
    pub const fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Total requirements.
    #[must_use]
    pub const fn requirements(&self) -> &Resources {
        &self.requirements
    }

    /// Declared duration in ticks.
    #[must_use]
    pub const fn duration(&self) -> u32 {
        self.duration
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.state.lock().status
    }

    /// Error attached on failure.
    #[must_use]
    pub fn error(&self) -> Option<SchedulerError> {
        self.state.lock().error.clone()
    }

    /// Ticks consumed so far.
    #[must_use]
    pub fn ticks_completed(&self) -> u32 {
        self.state.lock().ticks_completed
    }

    /// Whether the task reached `Completed` or `Failed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// Move to `next`, enforcing the lifecycle.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidTransition` for any step not allowed by
    /// [`TaskStatus::can_transition_to`]; the status is left unchanged.
    pub(crate) fn transition(&self, next: TaskStatus) -> Result<(), SchedulerError> {
        let mut state = self.state.lock();
        Self::apply(&mut state, next)?;
        drop(state);
        if next.is_terminal() {
            self.settled.notify_all();
        }
        Ok(())
    }

    /// Move to `Failed` and attach `error`.
    pub(crate) fn fail(&self, error: SchedulerError) -> Result<(), SchedulerError> {
        let mut state = self.state.lock();
        Self::apply(&mut state, TaskStatus::Failed)?;
        state.error = Some(error);
        drop(state);
        self.settled.notify_all();
        Ok(())
    }

    pub(crate) fn record_tick(&self) {
        let mut state = self.state.lock();
        if state.status == TaskStatus::InProgress {
            state.ticks_completed += 1;
        }
    }

    fn apply(state: &mut TaskState, next: TaskStatus) -> Result<(), SchedulerError> {
        if !state.status.can_transition_to(next) {
            return Err(SchedulerError::InvalidTransition {
                from: state.status,
                to: next,
            });
        }
        state.status = next;
        Ok(())
    }

    /// Block until the task is terminal or `timeout` elapses.
    ///
    /// Returns the terminal status, or `None` on timeout.
    pub fn wait_terminal(&self, timeout: Duration) -> Option<TaskStatus> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !state.status.is_terminal() {
            if self.settled.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        state.status.is_terminal().then_some(state.status)
    }

    /// Async variant of [`Task::wait_terminal`].
    ///
    /// The condvar wait runs on tokio's blocking thread pool so the caller's
    /// runtime is never blocked.
    #[cfg(feature = "tokio-runtime")]
    pub async fn wait_terminal_async(
        self: std::sync::Arc<Self>,
        timeout: Duration,
    ) -> Option<TaskStatus> {
        tokio::task::spawn_blocking(move || self.wait_terminal(timeout))
            .await
            .ok()
            .flatten()
    }

    /// Observer snapshot.
    #[must_use]
    pub fn view(&self) -> TaskView {
        let state = self.state.lock();
        TaskView {
            id: self.id,
            kind: self.kind,
            priority: self.priority,
            requirements: self.requirements,
            duration: self.duration,
            status: state.status,
            ticks_completed: state.ticks_completed,
            error: state.error.as_ref().map(ToString::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn task() -> Task {
        Task::new(1, TaskKind::Navigation, 3, Resources::units(1, 1, 1), 2).unwrap()
    }

    #[test]
    fn test_new_task_is_pending() {
        let t = task();
        assert_eq!(t.status(), TaskStatus::Pending);
        assert!(t.error().is_none());
        assert_eq!(t.ticks_completed(), 0);
    }

    #[test]
    fn test_zero_duration_rejected() {
        let err = Task::new(1, TaskKind::Navigation, 1, Resources::default(), 0).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidTask(_)));
    }

    #[test]
    fn test_terminal_status_is_final() {
        let t = task();
        t.transition(TaskStatus::InProgress).unwrap();
        t.transition(TaskStatus::Completed).unwrap();

        for next in [TaskStatus::Pending, TaskStatus::InProgress, TaskStatus::Failed] {
            assert!(t.transition(next).is_err());
        }
        assert!(t.fail(SchedulerError::Shutdown).is_err());
        assert_eq!(t.status(), TaskStatus::Completed);
        assert!(t.error().is_none());
    }

    #[test]
    fn test_pending_cannot_complete_directly() {
        let t = task();
        assert!(matches!(
            t.transition(TaskStatus::Completed),
            Err(SchedulerError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_ticks_only_count_while_running() {
        let t = task();
        t.record_tick();
        assert_eq!(t.ticks_completed(), 0);
        t.transition(TaskStatus::InProgress).unwrap();
        t.record_tick();
        assert_eq!(t.ticks_completed(), 1);
    }

    #[test]
    fn test_wait_terminal_wakes_on_fail() {
        let t = Arc::new(task());
        let waiter = {
            let t = Arc::clone(&t);
            thread::spawn(move || t.wait_terminal(Duration::from_secs(5)))
        };
        thread::sleep(Duration::from_millis(20));
        t.fail(SchedulerError::Shutdown).unwrap();
        assert_eq!(waiter.join().unwrap(), Some(TaskStatus::Failed));
        assert_eq!(t.view().error.as_deref(), Some("scheduler shut down"));
    }

    #[test]
    fn test_wait_terminal_times_out() {
        let t = task();
        assert_eq!(t.wait_terminal(Duration::from_millis(10)), None);
    }
}
