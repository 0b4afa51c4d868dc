//! Task lifecycle audit log.
//!
//! Observers (dashboards, log shippers) read this instead of reaching into
//! scheduler internals.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::util::clock::now_ms;
use crate::util::serde::TaskId;

/// Lifecycle step recorded by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Task entered the scheduler queue.
    Enqueue,
    /// Admission check passed; task is running.
    Admit,
    /// Admission check failed.
    Reject,
    /// One tick's share was consumed.
    Tick,
    /// All ticks consumed.
    Complete,
    /// Ran short mid-execution.
    Fail,
    /// Dequeued in a non-pending status and discarded.
    Drop,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Enqueue => "enqueue",
            Self::Admit => "admit",
            Self::Reject => "reject",
            Self::Tick => "tick",
            Self::Complete => "complete",
            Self::Fail => "fail",
            Self::Drop => "drop",
        };
        f.write_str(s)
    }
}

/// Audit event structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: String,
    /// Related task identifier.
    pub task_id: TaskId,
    /// Action taken.
    pub action: AuditAction,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
    /// Additional context.
    pub detail: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
    /// Recorded events, oldest first. Sinks that forward elsewhere return nothing.
    fn events(&self) -> Vec<AuditEvent> {
        Vec::new()
    }
}

/// In-memory audit sink with a bounded buffer.
pub struct InMemoryAuditSink {
    events: VecDeque<AuditEvent>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink keeping at most `max_events`.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events.min(4096)),
            max_events,
        }
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    fn events(&self) -> Vec<AuditEvent> {
        self.events.iter().cloned().collect()
    }
}

/// Sink that forwards every event to `tracing` at debug level and keeps nothing.
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&mut self, event: AuditEvent) {
        tracing::debug!(
            task_id = event.task_id,
            action = %event.action,
            detail = event.detail.as_deref().unwrap_or(""),
            "audit"
        );
    }
}

/// Helper to build an audit event stamped with a fresh id and the current time.
pub fn build_audit_event(task_id: TaskId, action: AuditAction, detail: Option<String>) -> AuditEvent {
    AuditEvent {
        event_id: uuid::Uuid::new_v4().to_string(),
        task_id,
        action,
        created_at_ms: now_ms(),
        detail,
    }
}
