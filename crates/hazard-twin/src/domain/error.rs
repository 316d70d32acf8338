//! Domain Model: Harness Error Types
//!
//! None of these ever crash a run. Task-level failures become task states,
//! harness-level failures become fallback outcomes in the driver.

use super::outcome::HarnessKind;
use super::types::{ResourceId, TaskId};

/// Result alias used across the harness crate
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Failures raised while running a hazard harness
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Task Boundary
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// A task waited past its acquisition bound
    #[error("{task} gave up acquiring resource {resource} after {waited_ms}ms")]
    AcquisitionTimeout {
        /// The task that gave up
        task: TaskId,
        /// The resource it could not acquire
        resource: ResourceId,
        /// How long it waited
        waited_ms: u64,
    },

    /// A task's rendezvous partner never arrived
    #[error("{task} waited {waited_ms}ms at the rendezvous without its partner arriving")]
    RendezvousTimeout {
        /// The task left waiting
        task: TaskId,
        /// How long it waited
        waited_ms: u64,
    },

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Harness Boundary
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// The harness exceeded its allotted time
    #[error("{harness} harness exceeded its {timeout_ms}ms timeout")]
    HarnessTimeout {
        /// Which harness overran
        harness: HarnessKind,
        /// The limit it overran
        timeout_ms: u64,
    },

    /// A task waits on a resource it already holds
    ///
    /// Resources are exclusive and non-reentrant, so the live registry can
    /// never produce this.
    #[error("detector input invariant violated: {task} waits on resource {resource} which it holds")]
    DetectorInputInvariantViolation {
        /// The offending task
        task: TaskId,
        /// The resource it both holds and waits for
        resource: ResourceId,
    },

    /// The OS refused to start a thread
    #[error("failed to spawn thread {name}: {source}")]
    Spawn {
        /// Thread name that was requested
        name: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// The harness thread panicked before producing a result
    #[error("{harness} harness thread panicked")]
    WorkerPanicked {
        /// Which harness died
        harness: HarnessKind,
    },

    /// Invalid or unreadable configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl HarnessError {
    /// `true` for errors that signal a broken internal invariant
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DetectorInputInvariantViolation { .. } | Self::WorkerPanicked { .. }
        )
    }

    /// `true` for errors caused by a bound elapsing
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::AcquisitionTimeout { .. }
                | Self::RendezvousTimeout { .. }
                | Self::HarnessTimeout { .. }
        )
    }
}
