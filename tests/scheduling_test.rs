//! End-to-end scheduling through the public `Scheduler` facade.
//!
//! This test validates:
//! 1. Higher-priority tasks run first, ties run in submission order
//! 2. Admission is all-or-nothing and leaves the pool untouched on rejection
//! 3. Completed tasks draw exactly their requirements
//! 4. Resource levels stay within `0..=capacity` while tasks run
//! 5. Every task is logged as enqueued before it is admitted or rejected

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use starship_scheduler::config::SchedulerConfig;
use starship_scheduler::core::{
    AuditAction, GeneratorConfig, Scheduler, SchedulerError, TaskSpec, TaskStatus,
};
use starship_scheduler::util::clock::ManualClock;
use starship_scheduler::util::serde::{Quantity, ResourceKind, Resources, TaskKind};

const WAIT: Duration = Duration::from_secs(10);

fn config(capacity: Resources, initial_tasks: Vec<TaskSpec>) -> SchedulerConfig {
    SchedulerConfig {
        capacity,
        initial_tasks,
        ..SchedulerConfig::default()
    }
}

fn admitted_order(sched: &Scheduler<ManualClock>) -> Vec<u64> {
    sched
        .audit_events()
        .into_iter()
        .filter(|e| matches!(e.action, AuditAction::Admit | AuditAction::Reject))
        .map(|e| e.task_id)
        .collect()
}

#[test]
fn test_two_task_mission() {
    let sched = Scheduler::new(
        config(
            Resources::units(200, 100, 80),
            vec![
                TaskSpec::new(TaskKind::Communication, 3, Resources::units(10, 20, 30), 6),
                TaskSpec::new(TaskKind::LifeResearch, 5, Resources::units(15, 10, 5), 3),
            ],
        ),
        ManualClock::new(),
    )
    .unwrap();
    sched.start().unwrap();
    assert!(sched.wait_idle(WAIT));

    assert_eq!(admitted_order(&sched), vec![2, 1]);
    for view in sched.tasks() {
        assert_eq!(view.status, TaskStatus::Completed);
        assert_eq!(view.ticks_completed, view.duration);
    }
    assert_eq!(sched.resources().available, Resources::units(175, 70, 45));
    sched.shutdown();
}

#[test]
fn test_higher_priority_dequeued_first() {
    let sched = Scheduler::new(
        config(
            Resources::units(100, 100, 100),
            vec![
                TaskSpec::new(TaskKind::Navigation, 5, Resources::units(1, 1, 1), 1),
                TaskSpec::new(TaskKind::Navigation, 9, Resources::units(1, 1, 1), 1),
                TaskSpec::new(TaskKind::Navigation, 5, Resources::units(1, 1, 1), 1),
            ],
        ),
        ManualClock::new(),
    )
    .unwrap();
    sched.start().unwrap();
    assert!(sched.wait_idle(WAIT));
    assert_eq!(admitted_order(&sched), vec![2, 1, 3]);
}

#[test]
fn test_oversized_task_rejected_others_continue() {
    let sched = Scheduler::new(
        config(
            Resources::units(100, 100, 100),
            vec![
                TaskSpec::new(TaskKind::SampleCollection, 9, Resources::units(150, 0, 0), 2),
                TaskSpec::new(TaskKind::Navigation, 1, Resources::units(10, 10, 10), 2),
            ],
        ),
        ManualClock::new(),
    )
    .unwrap();
    sched.start().unwrap();
    assert!(sched.wait_idle(WAIT));

    let rejected = sched.task(1).unwrap();
    assert_eq!(rejected.status(), TaskStatus::Failed);
    assert_eq!(rejected.ticks_completed(), 0);
    assert_eq!(
        rejected.error(),
        Some(SchedulerError::InsufficientResource {
            resource: ResourceKind::Energy,
            required: Quantity::units(150),
            available: Quantity::units(100),
        })
    );
    assert_eq!(sched.task(2).unwrap().status(), TaskStatus::Completed);
    assert_eq!(sched.resources().available, Resources::units(90, 90, 90));

    let stats = sched.stats();
    assert_eq!(stats.engine.rejected, 1);
    assert_eq!(stats.engine.completed, 1);
}

#[test]
fn test_submissions_after_start_are_executed() {
    let sched = Scheduler::new(SchedulerConfig::default(), ManualClock::new()).unwrap();
    sched.start().unwrap();
    let tasks: Vec<_> = (0..5)
        .map(|i| {
            sched
                .submit(TaskSpec::new(TaskKind::ScientificAnalysis, i, Resources::units(2, 2, 2), 2))
                .unwrap()
        })
        .collect();
    for task in &tasks {
        assert_eq!(task.wait_terminal(WAIT), Some(TaskStatus::Completed));
    }
    assert_eq!(sched.resources().available, Resources::units(190, 90, 70));
}

#[test]
fn test_levels_stay_within_capacity() {
    let capacity = Resources::units(60, 60, 60);
    let sched = Arc::new(
        Scheduler::new(
            config(
                capacity,
                (0..12)
                    .map(|i| TaskSpec::new(TaskKind::TrajectoryAdjustment, i % 4, Resources::units(7, 11, 13), 5))
                    .collect(),
            ),
            ManualClock::new(),
        )
        .unwrap(),
    );
    let done = Arc::new(AtomicBool::new(false));
    let observer = {
        let sched = Arc::clone(&sched);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut samples = 0_u32;
            while !done.load(Ordering::Acquire) {
                let snap = sched.resources();
                for kind in ResourceKind::ALL {
                    assert!(snap.available.get(kind) <= snap.capacity.get(kind));
                }
                samples += 1;
            }
            samples
        })
    };

    sched.start().unwrap();
    assert!(sched.wait_idle(WAIT));
    done.store(true, Ordering::Release);
    assert!(observer.join().unwrap() > 0);

    let stats = sched.stats();
    assert_eq!(stats.engine.executed, 12);
    // Oxygen runs out first: four tasks of 13 fit in 60.
    assert_eq!(stats.engine.completed, 4);
    assert_eq!(stats.engine.rejected, 8);
    assert_eq!(sched.resources().available, Resources::units(32, 16, 8));
}

#[test]
fn test_shutdown_leaves_queued_tasks_pending() {
    let sched = Scheduler::new(SchedulerConfig::default(), ManualClock::new()).unwrap();
    let task = sched
        .submit(TaskSpec::new(TaskKind::Navigation, 1, Resources::units(1, 1, 1), 1))
        .unwrap();
    sched.shutdown();
    assert_eq!(task.status(), TaskStatus::Pending);
    assert_eq!(task.wait_terminal(Duration::from_millis(20)), None);
}

#[test]
fn test_enqueue_logged_before_admission() {
    let cfg = SchedulerConfig {
        audit_capacity: 10_000,
        max_queue_depth: 1_000,
        ..SchedulerConfig::default()
    };
    let sched = Scheduler::new(cfg, ManualClock::new()).unwrap();
    sched.start().unwrap();
    let ids: Vec<u64> = (0..200)
        .map(|_| {
            sched
                .submit(TaskSpec::new(TaskKind::Navigation, 1, Resources::units(1, 1, 1), 1))
                .unwrap()
                .id()
        })
        .collect();
    assert!(sched.wait_idle(WAIT));
    sched.shutdown();

    let events = sched.audit_events();
    for id in ids {
        let position = |wanted: fn(&AuditAction) -> bool| {
            events
                .iter()
                .position(|e| e.task_id == id && wanted(&e.action))
                .unwrap()
        };
        let enqueued = position(|a| matches!(a, AuditAction::Enqueue));
        let decided = position(|a| matches!(a, AuditAction::Admit | AuditAction::Reject));
        assert!(enqueued < decided, "task {id}: enqueue at {enqueued}, decision at {decided}");
    }
}

#[test]
fn test_generated_traffic_keeps_registry_bounded() {
    let cfg = SchedulerConfig {
        max_queue_depth: 4,
        registry_capacity: 8,
        generator: Some(GeneratorConfig {
            interval_ms: 1,
            seed: Some(11),
            ..GeneratorConfig::default()
        }),
        ..SchedulerConfig::default()
    };
    let sched = Scheduler::new(cfg, ManualClock::new()).unwrap();
    sched.start().unwrap();
    thread::sleep(Duration::from_millis(300));
    sched.shutdown();

    let stats = sched.stats();
    assert!(stats.submitted > 8, "only {} tasks generated", stats.submitted);
    assert!(sched.tasks().len() <= 8);
}
