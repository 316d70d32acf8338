//! Hazard Driver - Sequential, Hard-Timed Harness Runs
//!
//! Each harness runs on its own `harness-<name>` thread. The driver waits on
//! that thread's [`Completion`] for `timeout + grace_margin`; if nothing
//! arrives, or the harness errors or panics, the driver synthesizes the
//! harness's fallback outcome. A report is produced for every requested
//! harness, always.

use super::lock_ordering::LockOrderingHarness;
use super::sync::Completion;
use super::visibility::VisibilityHazardHarness;
use crate::domain::{HarnessError, HarnessKind, HarnessReport, HarnessResult, Outcome};
use crate::infrastructure::config::duration_ms;
use crate::infrastructure::HazardConfig;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Runs harnesses one after another
pub struct HazardDriver {
    config: HazardConfig,
}

impl HazardDriver {
    /// Create a driver
    pub fn new(config: HazardConfig) -> Self {
        Self { config }
    }

    /// Driver settings
    pub fn config(&self) -> &HazardConfig {
        &self.config
    }

    /// Run each selected harness in order
    pub fn run(&self, selection: &[HarnessKind]) -> Vec<HarnessReport> {
        selection.iter().map(|&kind| self.run_one(kind)).collect()
    }

    /// Run one harness under a hard timeout
    pub fn run_one(&self, kind: HarnessKind) -> HarnessReport {
        let started = Instant::now();
        let timeout = self.config.timeout_for(kind);
        let hard_limit = timeout + self.config.driver.grace_margin();
        let slot: Arc<Completion<HarnessResult<HarnessReport>>> = Arc::new(Completion::new());

        info!(harness = %kind, timeout_ms = duration_ms(timeout), "▶ running harness");

        let spawned = thread::Builder::new()
            .name(format!("harness-{}", kind))
            .spawn({
                let slot = Arc::clone(&slot);
                let config = self.config.clone();
                move || {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| {
                        execute(kind, &config, timeout, started)
                    }))
                    .unwrap_or(Err(HarnessError::WorkerPanicked { harness: kind }));
                    slot.complete(result);
                }
            });

        if let Err(source) = spawned {
            let err = HarnessError::Spawn {
                name: format!("harness-{}", kind),
                source,
            };
            return fallback(kind, started, &err);
        }

        match slot.wait_for(hard_limit) {
            Some(Ok(report)) => {
                info!(
                    harness = %kind,
                    outcome = %report.outcome,
                    reproduced = report.outcome.is_hazard_reproduced(),
                    "■ harness finished"
                );
                report
            }
            Some(Err(err)) => fallback(kind, started, &err),
            None => {
                let err = HarnessError::HarnessTimeout {
                    harness: kind,
                    timeout_ms: duration_ms(timeout),
                };
                fallback(kind, started, &err)
            }
        }
    }
}

fn execute(
    kind: HarnessKind,
    config: &HazardConfig,
    timeout: Duration,
    started: Instant,
) -> HarnessResult<HarnessReport> {
    match kind {
        HarnessKind::LockOrdering => LockOrderingHarness::new(config.lock_ordering.clone())
            .run(timeout)
            .map(|run| run.into_report(started.elapsed())),
        HarnessKind::Visibility => VisibilityHazardHarness::new(config.visibility.clone())
            .run(timeout)
            .map(|run| run.into_report(started.elapsed())),
    }
}

/// Outcome used when a harness could not produce one itself
pub fn fallback_outcome(kind: HarnessKind) -> Outcome {
    match kind {
        HarnessKind::LockOrdering => Outcome::NoDeadlockObserved,
        HarnessKind::Visibility => Outcome::VisibilityHung,
    }
}

fn fallback(kind: HarnessKind, started: Instant, err: &HarnessError) -> HarnessReport {
    if err.is_fatal() {
        error!(harness = %kind, error = %err, "harness failed an internal invariant");
    } else if err.is_timeout() {
        warn!(harness = %kind, error = %err, "harness overran; abandoning its thread");
    } else {
        warn!(harness = %kind, error = %err, "harness did not finish; using fallback outcome");
    }

    let mut report = HarnessReport::new(kind, fallback_outcome(kind))
        .with_elapsed_ms(duration_ms(started.elapsed()))
        .with_warning(err.to_string());
    if kind == HarnessKind::LockOrdering {
        report = report.with_warning("could not determine deadlock state; detection may be premature");
    }
    report
}
