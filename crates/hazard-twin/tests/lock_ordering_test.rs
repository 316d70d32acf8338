//! Integration Test: Lock-Ordering Deadlock Reproduction
//!
//! Real OS threads, real mutexes. The rendezvous latch must make the AB-BA
//! deadlock reproduce on every run.

use hazard_twin::adapters::{LockOrderingHarness, Rendezvous, TASK1, TASK2};
use hazard_twin::{LockOrderingConfig, Outcome, ResourceId, TaskState};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

#[test]
fn test_barrier_deadlock_is_deterministic() {
    let harness = LockOrderingHarness::new(LockOrderingConfig::default());
    let expected = Outcome::DeadlockDetected(BTreeSet::from([TASK1, TASK2]));

    for round in 0..3 {
        let run = harness.run(Duration::from_millis(1000)).unwrap();
        assert_eq!(run.outcome, expected, "round {} did not deadlock", round);
    }
}

#[test]
fn test_deadlock_snapshot_is_a_thread_dump() {
    let harness = LockOrderingHarness::new(LockOrderingConfig::default());
    let run = harness.run(Duration::from_millis(1000)).unwrap();

    let task1 = run.snapshot.task(TASK1).unwrap();
    assert_eq!(task1.name, "lock-ordering-task1");
    assert_eq!(task1.plan, vec![ResourceId::A, ResourceId::B]);
    assert_eq!(
        task1.state,
        TaskState::HoldingAndBlocked {
            held: ResourceId::A,
            waiting_for: ResourceId::B
        }
    );

    let task2 = run.snapshot.task(TASK2).unwrap();
    assert_eq!(task2.plan, vec![ResourceId::B, ResourceId::A]);
    assert_eq!(run.snapshot.holder(ResourceId::A), Some(TASK1));
    assert_eq!(run.snapshot.holder(ResourceId::B), Some(TASK2));
}

#[test]
fn test_run_returns_within_timeout() {
    let harness = LockOrderingHarness::new(LockOrderingConfig::default());

    let started = Instant::now();
    let _run = harness.run(Duration::from_millis(1000)).unwrap();

    // Detection completes without joining the deadlocked workers
    assert!(started.elapsed() < Duration::from_millis(1000));
}

#[test]
fn test_short_acquire_bound_surfaces_as_no_deadlock() {
    // Workers give up after 5ms and release what they hold long before the
    // first 100ms poll, so there is nothing left to detect.
    let config = LockOrderingConfig::default()
        .with_acquire_bound(Duration::from_millis(5))
        .with_poll_interval(Duration::from_millis(100))
        .with_grace_delay(Duration::from_millis(300));
    let harness = LockOrderingHarness::new(config);

    let run = harness.run(Duration::from_millis(1000)).unwrap();

    assert_eq!(run.outcome, Outcome::NoDeadlockObserved);
    assert_eq!(run.rendezvous, Rendezvous::AllFinished);
    assert!(run
        .snapshot
        .tasks()
        .any(|t| matches!(t.state, TaskState::TimedOut { .. })));
    assert!(run.warnings.iter().any(|w| w.contains("gave up")));
}

#[test]
fn test_without_barrier_any_outcome_is_valid() {
    let config = LockOrderingConfig::default()
        .with_barrier(false)
        .with_grace_delay(Duration::from_millis(100));
    let harness = LockOrderingHarness::new(config);

    let run = harness.run(Duration::from_millis(500)).unwrap();

    match run.outcome {
        Outcome::DeadlockDetected(tasks) => {
            assert_eq!(tasks, BTreeSet::from([TASK1, TASK2]));
        }
        Outcome::NoDeadlockObserved => {}
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn test_timeout_shorter_than_grace_still_terminates() {
    let config = LockOrderingConfig::default().with_grace_delay(Duration::from_secs(5));
    let harness = LockOrderingHarness::new(config);

    let started = Instant::now();
    let run = harness.run(Duration::from_millis(200)).unwrap();

    assert!(started.elapsed() < Duration::from_millis(1000));
    assert!(matches!(
        run.outcome,
        Outcome::DeadlockDetected(_) | Outcome::NoDeadlockObserved
    ));
}
