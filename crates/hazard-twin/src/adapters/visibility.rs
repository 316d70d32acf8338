//! Visibility Hazard Harness
//!
//! # Scenario
//!
//! ```text
//! producer: counter += 1 ... (warm-up) ... flag = true
//! consumer: while !flag {}  ->  observed(counter)
//! ```
//!
//! Both threads touch the shared [`VisibilityFlag`] with relaxed loads and
//! stores only: no fence, no read-modify-write, no lock, no yield. Nothing
//! orders the producer's write before any of the consumer's reads, so the
//! consumer may see the flip late, see a stale counter, or never see it at
//! all. All of those are valid results; the harness only guarantees that it
//! returns within `timeout`.

use super::sync::Completion;
use crate::domain::{HarnessError, HarnessKind, HarnessReport, HarnessResult, Outcome};
use crate::infrastructure::config::duration_ms;
use crate::infrastructure::VisibilityConfig;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Producer increments between two clock reads
const INCREMENTS_PER_CLOCK_CHECK: u32 = 1024;

/// Shared flag and counter with no ordering discipline
///
/// Every access is `Ordering::Relaxed`, the Rust spelling of "plain access
/// without a memory-ordering primitive" that stays free of data-race UB.
#[derive(Debug, Default)]
pub struct VisibilityFlag {
    flag: AtomicBool,
    counter: AtomicU64,
}

impl VisibilityFlag {
    /// Flag down, counter zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag
    pub fn raise(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Read the flag
    pub fn is_raised(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Unsynchronized increment: a separate load and store, not an RMW
    pub fn bump(&self) {
        let current = self.counter.load(Ordering::Relaxed);
        self.counter.store(current.wrapping_add(1), Ordering::Relaxed);
    }

    /// Read the counter
    pub fn counter(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

/// Result of one visibility run
#[derive(Debug, Clone)]
pub struct VisibilityRun {
    /// Terminal outcome
    pub outcome: Outcome,
    /// Reliability warnings
    pub warnings: Vec<String>,
    /// Informational remarks
    pub notes: Vec<String>,
}

impl VisibilityRun {
    /// Convert into a report
    pub fn into_report(self, elapsed: Duration) -> HarnessReport {
        HarnessReport {
            harness: HarnessKind::Visibility,
            outcome: self.outcome,
            elapsed_ms: duration_ms(elapsed),
            tasks: Vec::new(),
            cycles: Vec::new(),
            warnings: self.warnings,
            notes: self.notes,
        }
    }
}

/// One producer, one spinning consumer, one unsynchronized flag
pub struct VisibilityHazardHarness {
    config: VisibilityConfig,
}

impl VisibilityHazardHarness {
    /// Create a harness
    pub fn new(config: VisibilityConfig) -> Self {
        Self { config }
    }

    /// Harness settings
    pub fn config(&self) -> &VisibilityConfig {
        &self.config
    }

    /// Run the scenario
    ///
    /// Waits at most `timeout` from the start of the run for the consumer.
    /// A consumer that has not stopped by then is abandoned, never joined.
    ///
    /// # Errors
    /// - `Spawn`: a thread could not be started
    pub fn run(&self, timeout: Duration) -> HarnessResult<VisibilityRun> {
        let started = Instant::now();
        let shared = Arc::new(VisibilityFlag::new());
        let observed = Arc::new(Completion::new());

        info!(
            warm_up_ms = self.config.warm_up_ms,
            timeout_ms = duration_ms(timeout),
            "👀 starting visibility run"
        );

        spawn("visibility-consumer", {
            let shared = Arc::clone(&shared);
            let observed = Arc::clone(&observed);
            move || {
                // Tight loop: no hint, no yield, no fence
                while !shared.is_raised() {}
                observed.complete(shared.counter());
            }
        })?;

        let warm_up = self.config.warm_up();
        let producer = spawn("visibility-producer", {
            let shared = Arc::clone(&shared);
            move || {
                let until = Instant::now() + warm_up;
                while Instant::now() < until {
                    for _ in 0..INCREMENTS_PER_CLOCK_CHECK {
                        shared.bump();
                    }
                }
                shared.raise();
                debug!(counter = shared.counter(), "flag raised");
            }
        });
        if let Err(err) = producer {
            // Let the consumer out of its loop before bailing
            shared.raise();
            return Err(err);
        }

        let remaining = timeout.saturating_sub(started.elapsed());
        let run = match observed.wait_for(remaining) {
            Some(counter) => {
                info!(counter, "consumer observed the flag");
                VisibilityRun {
                    outcome: Outcome::VisibilityObserved(counter),
                    warnings: Vec::new(),
                    notes: vec![
                        "hazard did not reproduce this run; re-run several times".to_string(),
                    ],
                }
            }
            None => {
                let timeout_error = HarnessError::HarnessTimeout {
                    harness: HarnessKind::Visibility,
                    timeout_ms: duration_ms(timeout),
                };
                warn!(error = %timeout_error, "consumer never observed the flag; abandoning it");
                VisibilityRun {
                    outcome: Outcome::VisibilityHung,
                    warnings: vec![timeout_error.to_string()],
                    notes: vec![
                        "consumer thread abandoned as a background leak".to_string(),
                    ],
                }
            }
        };

        Ok(run)
    }
}

fn spawn(name: &str, body: impl FnOnce() + Send + 'static) -> HarnessResult<()> {
    thread::Builder::new()
        .name(name.to_string())
        .spawn(body)
        .map(drop)
        .map_err(|source| HarnessError::Spawn {
            name: name.to_string(),
            source,
        })
}
