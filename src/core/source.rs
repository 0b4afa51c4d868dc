//! Task sources: id assignment, synthetic generation and periodic producers.
//!
//! Sources only ever submit work; they never read or change the resource
//! pool or a task's status.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Sender};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::{SchedulerError, SchedulerQueue, Task, TaskQueue, TaskSpec};
use crate::util::serde::{Priority, Resources, TaskId, TaskKind, MAX_UNITS};

/// Assigns unique, increasing task ids.
#[derive(Debug)]
pub struct TaskFactory {
    next_id: AtomicU64,
}

impl Default for TaskFactory {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl TaskFactory {
    /// Factory whose first id is `first`.
    #[must_use]
    pub const fn starting_at(first: TaskId) -> Self {
        Self {
            next_id: AtomicU64::new(first),
        }
    }

    /// Build a pending task from `spec` with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidTask` when `spec` is invalid; no id
    /// is consumed in that case.
    pub fn create(&self, spec: TaskSpec) -> Result<Task, SchedulerError> {
        spec.validate()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        Task::from_spec(id, spec)
    }
}

/// Anything that accepts task specs and queues them.
pub trait Submit: Send + Sync {
    /// Turn `spec` into a task and queue it.
    ///
    /// # Errors
    ///
    /// Implementation-specific; typically `InvalidTask`, `QueueFull` or `Shutdown`.
    fn submit(&self, spec: TaskSpec) -> Result<Arc<Task>, SchedulerError>;
}

/// Bare submitter over a queue and a factory.
pub struct QueueSubmitter<Q: TaskQueue> {
    queue: Arc<SchedulerQueue<Q>>,
    factory: Arc<TaskFactory>,
}

impl<Q: TaskQueue> QueueSubmitter<Q> {
    /// Submit into `queue` with ids from `factory`.
    pub const fn new(queue: Arc<SchedulerQueue<Q>>, factory: Arc<TaskFactory>) -> Self {
        Self { queue, factory }
    }
}

impl<Q: TaskQueue> Submit for QueueSubmitter<Q> {
    fn submit(&self, spec: TaskSpec) -> Result<Arc<Task>, SchedulerError> {
        let task = Arc::new(self.factory.create(spec)?);
        self.queue.enqueue(Arc::clone(&task))?;
        Ok(task)
    }
}

/// Bounds for synthetic task generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Milliseconds between generated tasks.
    pub interval_ms: u64,
    /// Priorities are drawn from `1..=max_priority`.
    pub max_priority: Priority,
    /// Per-resource upper bound (whole units) for requirements.
    pub max_requirement: u64,
    /// Durations are drawn from `1..=max_duration`.
    pub max_duration: u32,
    /// Optional RNG seed for reproducible traffic.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5_000,
            max_priority: 5,
            max_requirement: 50,
            max_duration: 10,
            seed: None,
        }
    }
}

impl GeneratorConfig {
    /// Validate generator bounds.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.interval_ms == 0 {
            return Err("interval_ms must be greater than 0".into());
        }
        if self.max_priority < 1 {
            return Err("max_priority must be at least 1".into());
        }
        if self.max_duration == 0 {
            return Err("max_duration must be greater than 0".into());
        }
        if self.max_requirement > MAX_UNITS {
            return Err(format!("max_requirement must be at most {MAX_UNITS}"));
        }
        Ok(())
    }
}

/// Produces random task specs within configured bounds.
pub struct RandomTaskGenerator {
    config: GeneratorConfig,
    rng: StdRng,
}

impl RandomTaskGenerator {
    /// Create a generator; seeded from `config.seed` when present.
    #[must_use]
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = config
            .seed
            .map_or_else(|| StdRng::from_rng(&mut rand::rng()), StdRng::seed_from_u64);
        Self { config, rng }
    }

    /// Draw one task spec.
    pub fn generate(&mut self) -> TaskSpec {
        let kind = *TaskKind::ALL
            .choose(&mut self.rng)
            .unwrap_or(&TaskKind::Communication);
        let max_req = self.config.max_requirement;
        let requirements = Resources::units(
            self.rng.random_range(0..=max_req),
            self.rng.random_range(0..=max_req),
            self.rng.random_range(0..=max_req),
        );
        TaskSpec {
            kind,
            priority: self.rng.random_range(1..=self.config.max_priority.max(1)),
            requirements,
            duration: self.rng.random_range(1..=self.config.max_duration.max(1)),
        }
    }
}

/// Handle to a running periodic source thread.
pub struct PeriodicSourceHandle {
    stop: Option<Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl PeriodicSourceHandle {
    /// Stop generating and wait for the thread to exit.
    pub fn shutdown(&mut self) {
        // Dropping the sender disconnects the stop channel.
        self.stop.take();
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                warn!("task source thread panicked");
            }
        }
    }
}

impl Drop for PeriodicSourceHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Spawn a thread that submits one generated task every `interval_ms`.
///
/// The thread exits when the handle is shut down or the submitter reports
/// `SchedulerError::Shutdown`.
///
/// # Errors
///
/// Returns `SchedulerError::Config` for invalid generator bounds and
/// `SchedulerError::Spawn` if the thread cannot be spawned.
pub fn spawn_periodic_source(
    submitter: Arc<dyn Submit>,
    config: GeneratorConfig,
) -> Result<PeriodicSourceHandle, SchedulerError> {
    config.validate().map_err(SchedulerError::Config)?;
    let interval_ms = config.interval_ms;
    let interval = Duration::from_millis(interval_ms);
    let (stop_tx, stop_rx) = bounded::<()>(0);
    let mut generator = RandomTaskGenerator::new(config);

    let join = thread::Builder::new()
        .name("ship-task-source".into())
        .spawn(move || {
            let ticker = tick(interval);
            loop {
                let keep_going = select! {
                    recv(stop_rx) -> _ => false,
                    recv(ticker) -> _ => {
                        match submitter.submit(generator.generate()) {
                            Ok(task) => {
                                debug!(task_id = task.id(), "synthetic task submitted");
                                true
                            }
                            Err(SchedulerError::Shutdown) => false,
                            Err(err) => {
                                warn!(error = %err, "synthetic task not submitted");
                                true
                            }
                        }
                    }
                };
                if !keep_going {
                    break;
                }
            }
            debug!("task source exiting");
        })
        .map_err(|e| {
            warn!(error = %e, "failed to spawn task source thread");
            SchedulerError::spawn("ship-task-source", &e)
        })?;

    info!(interval_ms, "periodic task source started");
    Ok(PeriodicSourceHandle {
        stop: Some(stop_tx),
        join: Some(join),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(seed: u64) -> GeneratorConfig {
        GeneratorConfig {
            interval_ms: 5,
            max_priority: 3,
            max_requirement: 10,
            max_duration: 4,
            seed: Some(seed),
        }
    }

    #[test]
    fn test_factory_ids_unique_and_increasing() {
        let factory = TaskFactory::default();
        let spec = TaskSpec::new(TaskKind::Navigation, 1, Resources::units(1, 1, 1), 1);
        let a = factory.create(spec.clone()).unwrap();
        let b = factory.create(spec).unwrap();
        assert_eq!(a.id(), 1);
        assert_eq!(b.id(), 2);
    }

    #[test]
    fn test_factory_invalid_spec_keeps_id() {
        let factory = TaskFactory::starting_at(10);
        let bad = TaskSpec::new(TaskKind::Navigation, 1, Resources::default(), 0);
        assert!(factory.create(bad).is_err());
        let ok = TaskSpec::new(TaskKind::Navigation, 1, Resources::default(), 1);
        assert_eq!(factory.create(ok).unwrap().id(), 10);
    }

    #[test]
    fn test_generator_respects_bounds() {
        let mut generator = RandomTaskGenerator::new(seeded(7));
        for _ in 0..200 {
            let spec = generator.generate();
            assert!((1..=3).contains(&spec.priority));
            assert!((1..=4).contains(&spec.duration));
            assert!(spec.requirements.energy <= crate::util::serde::Quantity::units(10));
            assert!(spec.validate().is_ok());
        }
    }

    #[test]
    fn test_generator_seed_is_reproducible() {
        let mut a = RandomTaskGenerator::new(seeded(42));
        let mut b = RandomTaskGenerator::new(seeded(42));
        for _ in 0..10 {
            assert_eq!(a.generate(), b.generate());
        }
    }

    #[test]
    fn test_generator_config_validation() {
        assert!(GeneratorConfig::default().validate().is_ok());
        let mut cfg = GeneratorConfig::default();
        cfg.interval_ms = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_generator_requirement_bound() {
        let huge = GeneratorConfig {
            max_requirement: u64::MAX,
            ..seeded(3)
        };
        assert!(huge.validate().unwrap_err().contains("max_requirement"));
        let queue: Arc<SchedulerQueue> = Arc::new(SchedulerQueue::default());
        let submitter: Arc<dyn Submit> =
            Arc::new(QueueSubmitter::new(queue, Arc::new(TaskFactory::default())));
        assert!(matches!(
            spawn_periodic_source(submitter, huge),
            Err(SchedulerError::Config(_))
        ));

        let mut generator = RandomTaskGenerator::new(GeneratorConfig {
            max_requirement: MAX_UNITS,
            ..seeded(3)
        });
        for _ in 0..50 {
            let spec = generator.generate();
            assert!(spec.requirements.energy <= crate::util::serde::Quantity::units(MAX_UNITS));
        }
    }

    #[test]
    fn test_periodic_source_feeds_queue() {
        let queue: Arc<SchedulerQueue> = Arc::new(SchedulerQueue::default());
        let submitter: Arc<dyn Submit> =
            Arc::new(QueueSubmitter::new(Arc::clone(&queue), Arc::new(TaskFactory::default())));
        let mut handle = spawn_periodic_source(submitter, seeded(1)).unwrap();

        let first = queue.dequeue_timeout(Duration::from_secs(5));
        handle.shutdown();
        assert!(first.is_some());
    }

    #[test]
    fn test_periodic_source_exits_when_queue_closed() {
        let queue: Arc<SchedulerQueue> = Arc::new(SchedulerQueue::default());
        queue.close();
        let submitter: Arc<dyn Submit> =
            Arc::new(QueueSubmitter::new(Arc::clone(&queue), Arc::new(TaskFactory::default())));
        let mut handle = spawn_periodic_source(submitter, seeded(1)).unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(handle.join.as_ref().is_some_and(JoinHandle::is_finished));
        handle.shutdown();
    }
}
