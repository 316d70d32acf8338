//! Adapters Layer
//!
//! Everything that touches real OS threads: tracked resources, the live
//! registry the detector reads from, the two harnesses and the driver that
//! sequences them.

pub mod driver;
pub mod lock_ordering;
pub mod registry;
pub mod resource;
pub mod sync;
pub mod visibility;

pub use driver::{fallback_outcome, HazardDriver};
pub use lock_ordering::{LockOrderingHarness, LockOrderingRun, Rendezvous, TASK1, TASK2};
pub use registry::LiveRegistry;
pub use resource::{ResourceGuard, TrackedResource};
pub use sync::{Completion, CountdownLatch};
pub use visibility::{VisibilityFlag, VisibilityHazardHarness, VisibilityRun};
