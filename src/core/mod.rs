//! Core scheduling abstractions and resource accounting.

pub mod audit;
pub mod engine;
pub mod error;
pub mod ordering;
pub mod registry;
pub mod resource_pool;
pub mod scheduler;
pub mod scheduler_queue;
pub mod source;
pub mod task;
pub mod worker;

pub use audit::{build_audit_event, AuditAction, AuditEvent, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use engine::{EngineStats, ExecutionEngine, SharedAuditSink};
pub use error::{AppResult, SchedulerError};
pub use ordering::{compare_schedule, ScheduleKey};
pub use registry::TaskRegistry;
pub use resource_pool::{ResourcePool, ResourceSnapshot};
pub use scheduler::{Scheduler, SchedulerStats};
pub use scheduler_queue::{SchedulerQueue, TaskQueue};
pub use source::{
    spawn_periodic_source, GeneratorConfig, PeriodicSourceHandle, QueueSubmitter, RandomTaskGenerator,
    Submit, TaskFactory,
};
pub use task::{Task, TaskSpec, TaskStatus, TaskView};
pub use worker::{run_worker_loop, spawn_worker, WorkerHandle};
