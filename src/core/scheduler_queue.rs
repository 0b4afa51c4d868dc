//! Thread-safe blocking scheduler queue.
//!
//! Wraps a [`TaskQueue`] backend in a `parking_lot::Mutex` and pairs it with a
//! `Condvar` so an idle consumer sleeps until work arrives. Waiters always
//! re-check the backend under the lock before sleeping, so a notification
//! sent between "queue became non-empty" and "waiter parks" is never lost.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::core::{SchedulerError, Task};
use crate::infra::queue::InMemoryQueue;

/// Abstraction for non-blocking queue backends.
pub trait TaskQueue: Send {
    /// Insert a task, keeping scheduling order.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::QueueFull` when the backend is at capacity.
    fn enqueue(&mut self, task: Arc<Task>) -> Result<(), SchedulerError>;
    /// Remove and return the task that schedules first.
    fn dequeue(&mut self) -> Option<Arc<Task>>;
    /// Queued tasks in scheduling order, without removing them.
    fn snapshot(&self) -> Vec<Arc<Task>>;
    /// Maximum depth allowed for this queue.
    fn max_depth(&self) -> usize;
    /// Current depth.
    fn len(&self) -> usize;
    /// Whether no task is queued.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct QueueState<Q> {
    backend: Q,
    closed: bool,
}

/// Priority-ordered queue shared by producers and the single consumer.
pub struct SchedulerQueue<Q: TaskQueue = InMemoryQueue> {
    state: Mutex<QueueState<Q>>,
    available: Condvar,
}

impl Default for SchedulerQueue<InMemoryQueue> {
    fn default() -> Self {
        Self::new(InMemoryQueue::unbounded())
    }
}

impl<Q: TaskQueue> SchedulerQueue<Q> {
    /// Wrap a backend.
    pub fn new(backend: Q) -> Self {
        Self {
            state: Mutex::new(QueueState {
                backend,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Insert a task and wake one waiting consumer. Never blocks on consumers.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::Shutdown` once the queue is closed
    /// - `SchedulerError::QueueFull` when the backend is at capacity
    pub fn enqueue(&self, task: Arc<Task>) -> Result<(), SchedulerError> {
        let task_id = task.id();
        let depth = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(SchedulerError::Shutdown);
            }
            state.backend.enqueue(task)?;
            state.backend.len()
        };
        self.available.notify_one();
        debug!(task_id, depth, "task enqueued");
        Ok(())
    }

    /// Block until a task is available and return it.
    ///
    /// Returns `None` once the queue has been closed.
    pub fn dequeue_blocking(&self) -> Option<Arc<Task>> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return None;
            }
            if let Some(task) = state.backend.dequeue() {
                return Some(task);
            }
            self.available.wait(&mut state);
        }
    }

    /// Like [`SchedulerQueue::dequeue_blocking`] but gives up after `timeout`.
    pub fn dequeue_timeout(&self, timeout: Duration) -> Option<Arc<Task>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return None;
            }
            if let Some(task) = state.backend.dequeue() {
                return Some(task);
            }
            if self.available.wait_until(&mut state, deadline).timed_out() {
                return if state.closed {
                    None
                } else {
                    state.backend.dequeue()
                };
            }
        }
    }

    /// Non-blocking dequeue.
    pub fn try_dequeue(&self) -> Option<Arc<Task>> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }
        state.backend.dequeue()
    }

    /// Diagnostic snapshot; do not use for control decisions.
    pub fn is_empty(&self) -> bool {
        self.state.lock().backend.is_empty()
    }

    /// Diagnostic snapshot of the depth.
    pub fn len(&self) -> usize {
        self.state.lock().backend.len()
    }

    /// Queued tasks in scheduling order.
    pub fn pending_snapshot(&self) -> Vec<Arc<Task>> {
        self.state.lock().backend.snapshot()
    }

    /// Refuse further work and wake every waiter.
    ///
    /// Tasks still queued stay `Pending` and are not executed.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.available.notify_all();
    }

    /// Whether [`SchedulerQueue::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}
