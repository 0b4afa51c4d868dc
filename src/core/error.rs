//! Error types for scheduler operations.

use thiserror::Error;

use crate::core::TaskStatus;
use crate::util::serde::{Quantity, ResourceKind};

/// Errors produced by scheduler components.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// A resource level is below what was requested.
    #[error("insufficient {resource}: required {required}, available {available}")]
    InsufficientResource {
        /// Resource that ran short.
        resource: ResourceKind,
        /// Amount requested.
        required: Quantity,
        /// Amount available at the time of the check.
        available: Quantity,
    },
    /// Task definition or state is not acceptable.
    #[error("invalid task: {0}")]
    InvalidTask(String),
    /// Illegal status change.
    #[error("invalid status transition {from:?} -> {to:?}")]
    InvalidTransition {
        /// Status before the attempted change.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
    },
    /// Queue is full.
    #[error("queue full: {0}")]
    QueueFull(String),
    /// Scheduler or queue has been shut down.
    #[error("scheduler shut down")]
    Shutdown,
    /// Configuration failed validation or parsing.
    #[error("config error: {0}")]
    Config(String),
    /// The OS refused to start a scheduler thread.
    #[error("failed to spawn {thread} thread: {reason}")]
    Spawn {
        /// Name of the thread that could not be started.
        thread: String,
        /// Underlying I/O error message.
        reason: String,
    },
}

impl SchedulerError {
    /// Wrap a thread-spawn failure.
    #[must_use]
    pub fn spawn(thread: &str, err: &std::io::Error) -> Self {
        Self::Spawn {
            thread: thread.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
