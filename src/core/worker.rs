//! The single consumer that drains the scheduler queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::core::{ExecutionEngine, SchedulerError, SchedulerQueue, TaskQueue, TaskStatus};
use crate::util::clock::TickClock;

/// Drain `queue` until it is closed or `cancel` is set.
///
/// Pending tasks go to the engine. Anything else is logged and dropped, never
/// requeued, so a terminal task cannot bounce around the queue forever.
/// Task failures are local to the task and never stop the loop.
pub fn run_worker_loop<Q, C>(queue: &SchedulerQueue<Q>, engine: &ExecutionEngine<C>, cancel: &AtomicBool)
where
    Q: TaskQueue,
    C: TickClock,
{
    while !cancel.load(Ordering::Acquire) {
        let Some(task) = queue.dequeue_blocking() else {
            debug!("queue closed, worker loop exiting");
            break;
        };

        let status = task.status();
        if status != TaskStatus::Pending {
            warn!(task_id = task.id(), ?status, "dropping non-pending task");
            engine.note_dropped(&task);
            continue;
        }

        debug!(task_id = task.id(), priority = task.priority(), "processing task");
        if let Err(err) = engine.execute(&task) {
            debug!(task_id = task.id(), error = %err, "task did not complete");
        }
    }
}

/// Handle to a running worker thread.
pub struct WorkerHandle<Q: TaskQueue + 'static> {
    queue: Arc<SchedulerQueue<Q>>,
    cancel: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl<Q: TaskQueue + 'static> WorkerHandle<Q> {
    /// Whether the worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop the worker and wait for it to exit.
    ///
    /// The task being executed, if any, runs to its terminal status first.
    /// Tasks still queued remain `Pending`.
    pub fn shutdown(&mut self) {
        self.cancel.store(true, Ordering::Release);
        self.queue.close();
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                warn!("worker thread panicked");
            } else {
                info!("worker stopped");
            }
        }
    }
}

impl<Q: TaskQueue + 'static> Drop for WorkerHandle<Q> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Spawn the worker loop on a dedicated named thread.
///
/// # Errors
///
/// Returns `SchedulerError::Spawn` if the OS refuses to spawn the thread.
pub fn spawn_worker<Q, C>(
    queue: Arc<SchedulerQueue<Q>>,
    engine: Arc<ExecutionEngine<C>>,
) -> Result<WorkerHandle<Q>, SchedulerError>
where
    Q: TaskQueue + 'static,
    C: TickClock,
{
    let cancel = Arc::new(AtomicBool::new(false));
    let join = {
        let queue = Arc::clone(&queue);
        let cancel = Arc::clone(&cancel);
        thread::Builder::new()
            .name("ship-worker".into())
            .spawn(move || {
                debug!("worker thread started");
                run_worker_loop(&queue, &engine, &cancel);
                debug!("worker thread exiting");
            })
            .map_err(|e| {
                warn!(error = %e, "failed to spawn worker thread");
                SchedulerError::spawn("ship-worker", &e)
            })?
    };
    info!("worker started");
    Ok(WorkerHandle {
        queue,
        cancel,
        join: Some(join),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ResourcePool, Task};
    use crate::util::clock::ManualClock;
    use crate::util::serde::{Resources, TaskKind};
    use std::time::Duration;

    fn setup() -> (Arc<SchedulerQueue>, Arc<ExecutionEngine<ManualClock>>) {
        let pool = Arc::new(ResourcePool::new(Resources::units(100, 100, 100)));
        (
            Arc::new(SchedulerQueue::default()),
            Arc::new(ExecutionEngine::new(pool, ManualClock::new())),
        )
    }

    #[test]
    fn test_worker_runs_and_stops() {
        let (queue, engine) = setup();
        let mut worker = spawn_worker(Arc::clone(&queue), Arc::clone(&engine)).unwrap();

        let task = Arc::new(Task::new(1, TaskKind::Navigation, 1, Resources::units(10, 10, 10), 2).unwrap());
        queue.enqueue(Arc::clone(&task)).unwrap();
        assert_eq!(task.wait_terminal(Duration::from_secs(5)), Some(TaskStatus::Completed));

        worker.shutdown();
        assert!(worker.is_finished());
    }

    #[test]
    fn test_terminal_task_is_dropped_not_requeued() {
        let (queue, engine) = setup();
        let task = Arc::new(Task::new(1, TaskKind::Navigation, 1, Resources::units(1, 1, 1), 1).unwrap());
        engine.execute(&task).unwrap();

        queue.enqueue(Arc::clone(&task)).unwrap();
        let mut worker = spawn_worker(Arc::clone(&queue), Arc::clone(&engine)).unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while engine.stats().dropped == 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(engine.stats().dropped, 1);
        assert!(queue.is_empty());

        let follow_up = Arc::new(Task::new(2, TaskKind::Navigation, 1, Resources::units(1, 1, 1), 1).unwrap());
        queue.enqueue(Arc::clone(&follow_up)).unwrap();
        assert_eq!(follow_up.wait_terminal(Duration::from_secs(5)), Some(TaskStatus::Completed));

        worker.shutdown();
        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(engine.stats().executed, 2);
        assert_eq!(engine.stats().dropped, 1);
    }

    #[test]
    fn test_failure_does_not_stop_loop() {
        let (queue, engine) = setup();
        let mut worker = spawn_worker(Arc::clone(&queue), Arc::clone(&engine)).unwrap();

        let greedy = Arc::new(Task::new(1, TaskKind::Navigation, 9, Resources::units(500, 0, 0), 1).unwrap());
        let modest = Arc::new(Task::new(2, TaskKind::Navigation, 1, Resources::units(5, 5, 5), 1).unwrap());
        queue.enqueue(Arc::clone(&greedy)).unwrap();
        queue.enqueue(Arc::clone(&modest)).unwrap();

        assert_eq!(greedy.wait_terminal(Duration::from_secs(5)), Some(TaskStatus::Failed));
        assert_eq!(modest.wait_terminal(Duration::from_secs(5)), Some(TaskStatus::Completed));
        worker.shutdown();
    }
}
