//! Configuration models for resource capacities, pacing and task sources.

pub mod scheduler;

pub use scheduler::SchedulerConfig;
