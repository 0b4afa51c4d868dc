//! # Starship Scheduler
//!
//! A resource-constrained priority task scheduler for a spacecraft's shared
//! supplies of energy, fuel and oxygen.
//!
//! Tasks declare how much of each resource they need and how many ticks they
//! run for. A single worker thread takes the most urgent pending task from a
//! blocking priority queue, admits it only if the pool can cover the whole
//! requirement, and then draws the requirement down in equal per-tick shares.
//!
//! ## Key Features
//!
//! - **All-or-nothing admission**: a task starts only if every resource covers it
//! - **Exact accounting**: per-tick shares are fixed-point and sum to the requirement
//! - **Deterministic ordering**: status, then priority, then submission order
//! - **Observable state**: task views, resource snapshots, statistics and an audit log
//! - **Pluggable time**: a [`util::clock::TickClock`] paces ticks; tests use a manual clock
//!
//! ```rust,ignore
//! use starship_scheduler::config::SchedulerConfig;
//! use starship_scheduler::core::{Scheduler, TaskSpec};
//! use starship_scheduler::util::serde::{Resources, TaskKind};
//! use std::time::Duration;
//!
//! let scheduler = Scheduler::from_config(SchedulerConfig::default())?;
//! scheduler.start()?;
//! let task = scheduler.submit(TaskSpec::new(
//!     TaskKind::Navigation,
//!     5,
//!     Resources::units(15, 10, 5),
//!     3,
//! ))?;
//! task.wait_terminal(Duration::from_secs(10));
//! println!("{}", scheduler.resources());
//! scheduler.shutdown();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions and resource accounting.
pub mod core;
/// Configuration models for capacities, pacing and task sources.
pub mod config;
/// Builders to construct schedulers from configuration.
pub mod builders;
/// Infrastructure adapters for queue backends.
pub mod infra;
/// API surface for embedding the scheduler.
pub mod runtime;
/// Shared utilities.
pub mod util;
