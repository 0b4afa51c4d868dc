//! Mission control: runs the configured task batch against the ship's
//! reserves and prints the outcome.
//!
//! Configuration comes from `STARSHIP_CONFIG` (a JSON file) or the stock
//! mission, with `STARSHIP_ENERGY`, `STARSHIP_FUEL`, `STARSHIP_OXYGEN` and
//! `STARSHIP_TICK_MS` overrides. A `.env` file is honoured.

use std::time::Duration;

use anyhow::Context;
use starship_scheduler::builders::SchedulerBuilder;
use starship_scheduler::config::SchedulerConfig;
use starship_scheduler::core::AppResult;
use starship_scheduler::util::telemetry::init_tracing;
use tracing::{info, warn};

fn main() -> AppResult<()> {
    init_tracing();

    let config = SchedulerConfig::from_env().context("loading scheduler configuration")?;
    let batch = config.initial_tasks.len();
    let max_ticks: u64 = config.initial_tasks.iter().map(|t| u64::from(t.duration)).sum();
    let budget = Duration::from_millis(config.tick_interval_ms.saturating_mul(max_ticks + 1))
        + Duration::from_secs(5);

    for spec in &config.initial_tasks {
        println!(
            "  planned {} (priority {}, {} over {} ticks)",
            spec.kind, spec.priority, spec.requirements, spec.duration
        );
    }
    let scheduler = SchedulerBuilder::from_config(config).build()?;
    println!("Initial reserves: {}", scheduler.resources());

    scheduler.start()?;
    info!(batch, "waiting for initial batch");
    if !scheduler.wait_idle(budget) {
        warn!(?budget, "batch did not finish in time");
    }

    println!("Final reserves:   {}", scheduler.resources());
    for view in scheduler.tasks() {
        match view.error {
            Some(reason) => println!("  #{} {}: {:?} ({reason})", view.id, view.kind, view.status),
            None => println!("  #{} {}: {:?}", view.id, view.kind, view.status),
        }
    }
    let stats = scheduler.stats();
    println!(
        "executed={} completed={} rejected={} failed={}",
        stats.engine.executed, stats.engine.completed, stats.engine.rejected, stats.engine.failed
    );

    scheduler.shutdown();
    Ok(())
}
