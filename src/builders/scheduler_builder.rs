//! Fluent construction of a [`Scheduler`] on top of [`SchedulerConfig`].

use std::time::Duration;

use crate::config::SchedulerConfig;
use crate::core::source::GeneratorConfig;
use crate::core::{Scheduler, SchedulerError, TaskSpec};
use crate::util::clock::{SystemTickClock, TickClock};
use crate::util::serde::Resources;

/// Builder for schedulers.
#[derive(Debug, Clone, Default)]
pub struct SchedulerBuilder {
    config: SchedulerConfig,
}

impl SchedulerBuilder {
    /// Start from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    #[must_use]
    pub const fn from_config(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Configuration built so far.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Set resource capacities.
    #[must_use]
    pub const fn capacity(mut self, capacity: Resources) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// Start below capacity.
    #[must_use]
    pub const fn initial_levels(mut self, levels: Resources) -> Self {
        self.config.initial_levels = Some(levels);
        self
    }

    /// Set the wall-clock tick interval used by [`SchedulerBuilder::build`].
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn tick_interval(mut self, interval: Duration) -> Self {
        self.config.tick_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Limit the queue depth.
    #[must_use]
    pub const fn max_queue_depth(mut self, depth: usize) -> Self {
        self.config.max_queue_depth = depth;
        self
    }

    /// Bound how many tasks are retained for lookup.
    #[must_use]
    pub const fn registry_capacity(mut self, capacity: usize) -> Self {
        self.config.registry_capacity = capacity;
        self
    }

    /// Append a task to the initial batch.
    #[must_use]
    pub fn initial_task(mut self, spec: TaskSpec) -> Self {
        self.config.initial_tasks.push(spec);
        self
    }

    /// Enable synthetic task generation.
    #[must_use]
    pub fn generator(mut self, generator: GeneratorConfig) -> Self {
        self.config.generator = Some(generator);
        self
    }

    /// Build with a sleeping wall-clock tick.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Config` when the configuration is invalid.
    pub fn build(self) -> Result<Scheduler<SystemTickClock>, SchedulerError> {
        Scheduler::from_config(self.config)
    }

    /// Build with a caller-supplied tick clock.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Config` when the configuration is invalid.
    pub fn build_with_clock<C: TickClock>(self, clock: C) -> Result<Scheduler<C>, SchedulerError> {
        Scheduler::new(self.config, clock)
    }
}
