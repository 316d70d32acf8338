//! Lock-Ordering Harness
//!
//! # Scenario
//!
//! ```text
//! Task1: lock(A) ── rendezvous ── lock(B)   (blocks: B held by Task2)
//! Task2: lock(B) ── rendezvous ── lock(A)   (blocks: A held by Task1)
//! ```
//!
//! The rendezvous guarantees that both tasks hold their first resource
//! before either requests its second, so the AB-BA cycle forms on every run.
//! The harness never joins its workers: it snapshots the registry, runs the
//! detector and returns. Each worker gives up after its acquisition bound,
//! releases what it holds and exits on its own.

use super::registry::LiveRegistry;
use super::resource::{ResourceGuard, TrackedResource};
use super::sync::CountdownLatch;
use crate::domain::{
    DeadlockDetector, HarnessError, HarnessKind, HarnessReport, HarnessResult, Outcome,
    ResourceId, Snapshot, TaskId, TaskState,
};
use crate::infrastructure::config::duration_ms;
use crate::infrastructure::LockOrderingConfig;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// First worker
pub const TASK1: TaskId = TaskId(1);

/// Second worker
pub const TASK2: TaskId = TaskId(2);

/// How the wait before snapshotting ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rendezvous {
    /// Both tasks reported `HoldingAndBlocked`
    AllBlocked,
    /// Both tasks reached a terminal state
    AllFinished,
    /// The grace delay elapsed first
    GraceElapsed,
    /// The run timeout elapsed first
    DeadlineReached,
}

/// Result of one lock-ordering run
#[derive(Debug, Clone)]
pub struct LockOrderingRun {
    /// Terminal outcome
    pub outcome: Outcome,
    /// Snapshot the detector ran on
    pub snapshot: Snapshot,
    /// Witness cycles
    pub cycles: Vec<Vec<TaskId>>,
    /// How the pre-snapshot wait ended
    pub rendezvous: Rendezvous,
    /// Reliability warnings
    pub warnings: Vec<String>,
}

impl LockOrderingRun {
    /// Convert into a report
    pub fn into_report(self, elapsed: Duration) -> HarnessReport {
        HarnessReport {
            harness: HarnessKind::LockOrdering,
            outcome: self.outcome,
            elapsed_ms: duration_ms(elapsed),
            tasks: self.snapshot.tasks().cloned().collect(),
            cycles: self.cycles,
            warnings: self.warnings,
            notes: Vec::new(),
        }
    }
}

/// Two tasks, two resources, reversed acquisition order
pub struct LockOrderingHarness {
    config: LockOrderingConfig,
}

impl LockOrderingHarness {
    /// Create a harness
    pub fn new(config: LockOrderingConfig) -> Self {
        Self { config }
    }

    /// Harness settings
    pub fn config(&self) -> &LockOrderingConfig {
        &self.config
    }

    /// Run the scenario and detect the deadlock
    ///
    /// Never blocks past `timeout` (plus one poll interval).
    ///
    /// # Errors
    /// - `Spawn`: a worker thread could not be started
    /// - `DetectorInputInvariantViolation`: the registry produced a self-wait
    pub fn run(&self, timeout: Duration) -> HarnessResult<LockOrderingRun> {
        let started = Instant::now();
        let registry = Arc::new(LiveRegistry::new());
        let a = Arc::new(TrackedResource::new(ResourceId::A, Arc::clone(&registry)));
        let b = Arc::new(TrackedResource::new(ResourceId::B, Arc::clone(&registry)));
        let latch = self
            .config
            .use_barrier
            .then(|| Arc::new(CountdownLatch::new(2)));

        info!(
            barrier = self.config.use_barrier,
            timeout_ms = duration_ms(timeout),
            "🔒 starting lock-ordering run"
        );

        self.spawn_worker(TASK1, [Arc::clone(&a), Arc::clone(&b)], latch.clone(), &registry)?;
        self.spawn_worker(TASK2, [b, a], latch, &registry)?;

        let rendezvous = self.await_rendezvous(&registry, started, timeout);
        let snapshot = registry.snapshot();
        let detection = DeadlockDetector::new().analyze(&snapshot)?;
        debug!(?rendezvous, tasks = snapshot.len(), "snapshot taken");

        let mut warnings = Vec::new();
        if rendezvous == Rendezvous::DeadlineReached && !detection.has_deadlock() {
            let timeout_error = HarnessError::HarnessTimeout {
                harness: HarnessKind::LockOrdering,
                timeout_ms: duration_ms(timeout),
            };
            warn!(error = %timeout_error, "detection may be premature");
            warnings.push(format!("{}; detection may be premature", timeout_error));
        }
        for task in snapshot.tasks() {
            if let TaskState::TimedOut { waiting_for } = task.state {
                warnings.push(format!(
                    "{} gave up waiting for {} before the snapshot",
                    task.id, waiting_for
                ));
            }
        }

        let outcome = if detection.has_deadlock() {
            info!(tasks = ?detection.deadlocked, "💀 deadlock detected");
            Outcome::DeadlockDetected(detection.deadlocked)
        } else {
            warn!("no deadlock observed; the repro did not trigger");
            Outcome::NoDeadlockObserved
        };

        Ok(LockOrderingRun {
            outcome,
            snapshot,
            cycles: detection.cycles,
            rendezvous,
            warnings,
        })
    }

    fn spawn_worker(
        &self,
        id: TaskId,
        plan: [Arc<TrackedResource>; 2],
        latch: Option<Arc<CountdownLatch>>,
        registry: &Arc<LiveRegistry>,
    ) -> HarnessResult<()> {
        let name = format!("lock-ordering-task{}", id.as_usize());
        registry.register_task(id, name.clone(), plan.iter().map(|r| r.id()).collect());

        let worker = Worker {
            id,
            plan,
            latch,
            registry: Arc::clone(registry),
            acquire_bound: self.config.acquire_bound(),
        };

        // Detached: a deadlocked worker must never be joined
        thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker.run())
            .map(drop)
            .map_err(|source| HarnessError::Spawn { name, source })
    }

    fn await_rendezvous(
        &self,
        registry: &LiveRegistry,
        started: Instant,
        timeout: Duration,
    ) -> Rendezvous {
        let grace = self.config.grace_delay().min(timeout);
        let poll = self.config.poll_interval();

        loop {
            thread::sleep(poll.min(grace.saturating_sub(started.elapsed())));

            if registry.all_tasks(|s| matches!(s, TaskState::HoldingAndBlocked { .. })) {
                return Rendezvous::AllBlocked;
            }
            if registry.all_tasks(TaskState::is_terminal) {
                return Rendezvous::AllFinished;
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                return Rendezvous::DeadlineReached;
            }
            if elapsed >= grace {
                return Rendezvous::GraceElapsed;
            }
        }
    }
}

/// One worker thread's program
struct Worker {
    id: TaskId,
    plan: [Arc<TrackedResource>; 2],
    latch: Option<Arc<CountdownLatch>>,
    registry: Arc<LiveRegistry>,
    acquire_bound: Duration,
}

impl Worker {
    /// Task boundary: every failure ends as a task state, never a panic
    fn run(self) {
        match self.acquire_in_order() {
            Ok(()) => {
                self.registry.set_state(self.id, TaskState::Completed);
                info!(task = %self.id, "acquired both resources");
            }
            Err(err) => {
                debug!(task = %self.id, error = %err, "task gave up");
            }
        }
    }

    fn acquire_in_order(&self) -> HarnessResult<()> {
        let [first, second] = &self.plan;

        self.registry.set_state(
            self.id,
            TaskState::BlockedOn {
                waiting_for: first.id(),
            },
        );
        let _first = self.acquire(first)?;

        if let Some(latch) = &self.latch {
            latch.count_down();
            if !latch.wait_for(self.acquire_bound) {
                self.give_up(second.id());
                return Err(HarnessError::RendezvousTimeout {
                    task: self.id,
                    waited_ms: duration_ms(self.acquire_bound),
                });
            }
        }

        self.registry.set_state(
            self.id,
            TaskState::HoldingAndBlocked {
                held: first.id(),
                waiting_for: second.id(),
            },
        );
        let _second = self.acquire(second)?;

        Ok(())
    }

    fn acquire<'r>(&self, resource: &'r TrackedResource) -> HarnessResult<ResourceGuard<'r>> {
        resource
            .acquire(self.id, self.acquire_bound, TaskState::Running)
            .map_err(|err| {
                self.give_up(resource.id());
                err
            })
    }

    fn give_up(&self, waiting_for: ResourceId) {
        self.registry
            .set_state(self.id, TaskState::TimedOut { waiting_for });
    }
}
