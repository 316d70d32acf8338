//! Concurrency Hazard Twin
//!
//! # Overview
//!
//! `hazard-twin` deliberately reproduces two classic multi-threaded
//! correctness failures and reports on them as structured outcomes:
//!
//! - **Lock-ordering deadlock**: two tasks take resources `A` and `B` in
//!   opposite order behind a rendezvous latch, so the AB-BA cycle forms on
//!   every run. A wait-for graph built from an explicit snapshot of task
//!   states and resource holders then finds the cycle.
//! - **Visibility hazard**: a producer flips a flag that a spinning consumer
//!   reads with no ordering discipline. Observing the flip and never
//!   observing it are both valid results.
//!
//! # Trinity Architecture
//!
//! - **Domain**: pure model (tasks, resources, snapshots, wait-for graph,
//!   outcomes, errors)
//! - **Infrastructure**: configuration and logging
//! - **Adapters**: real OS threads, the live registry, harnesses, driver
//!
//! # Invariants
//!
//! - A resource has at most one holder at any instant (enforced by its
//!   mutex, not by the detector).
//! - The wait-for graph is rebuilt from scratch on every detection pass.
//! - Detection is a pure function of its snapshot.
//! - The driver produces an outcome for every harness, even when the harness
//!   overruns, errors or panics.
//!
//! # Usage
//!
//! ```rust,no_run
//! use hazard_twin::{HarnessKind, HazardConfig, HazardDriver};
//!
//! let driver = HazardDriver::new(HazardConfig::default());
//! for report in driver.run(&HarnessKind::ALL) {
//!     print!("{}", report);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

// Trinity Architecture Layers
pub mod adapters;
pub mod domain;
pub mod infrastructure;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Re-export Primary Types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

// Model
pub use domain::{
    DeadlockDetector,
    Detection,
    HarnessError,
    HarnessKind,
    HarnessReport,
    HarnessResult,
    Outcome,
    ResourceId,
    Snapshot,
    TaskId,
    TaskSnapshot,
    TaskState,
    WaitForGraph,
};

// Harnesses
pub use adapters::{HazardDriver, LockOrderingHarness, VisibilityHazardHarness};

// Configuration
pub use infrastructure::{DriverConfig, HazardConfig, LockOrderingConfig, VisibilityConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
