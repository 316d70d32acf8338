//! Domain Layer - Pure Hazard Model
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Domain Layer                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  Types                         Detector                     │
//! │  ├─ TaskId / ResourceId        ├─ WaitForGraph              │
//! │  ├─ TaskState                  ├─ DeadlockDetector          │
//! │  └─ Snapshot                   └─ Detection                 │
//! │                                                             │
//! │  Outcome                       Error                        │
//! │  ├─ Outcome                    └─ HarnessError              │
//! │  ├─ HarnessKind                                             │
//! │  └─ HarnessReport                                           │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing in this layer spawns threads or reads clocks. Detection is a pure
//! function of a [`Snapshot`], so it is testable without real scheduling.
//!
//! ```rust
//! use hazard_twin::domain::*;
//!
//! let snapshot = Snapshot::new()
//!     .with_task(TaskId(1), TaskState::HoldingAndBlocked {
//!         held: ResourceId::A,
//!         waiting_for: ResourceId::B,
//!     })
//!     .with_task(TaskId(2), TaskState::HoldingAndBlocked {
//!         held: ResourceId::B,
//!         waiting_for: ResourceId::A,
//!     });
//!
//! let deadlocked = DeadlockDetector::new().detect(&snapshot).unwrap();
//! assert_eq!(deadlocked.len(), 2);
//! ```

pub mod detector;
pub mod error;
pub mod outcome;
pub mod types;

pub use detector::{DeadlockDetector, Detection, WaitForGraph};
pub use error::{HarnessError, HarnessResult};
pub use outcome::{format_cycle, HarnessKind, HarnessReport, Outcome};
pub use types::{ResourceId, Snapshot, TaskId, TaskSnapshot, TaskState};
