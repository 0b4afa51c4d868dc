//! API surface for embedding the scheduler in a host application.

pub mod api;

pub use api::{health, resources, status_of, submit_task, Health, TaskStatusResponse, TaskSubmission};
#[cfg(feature = "tokio-runtime")]
pub use api::await_task;
