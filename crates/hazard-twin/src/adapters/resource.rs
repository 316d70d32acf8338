//! Tracked exclusive resources
//!
//! The `parking_lot::Mutex` is what actually enforces "at most one holder";
//! the registry entry only mirrors it for the detector. The holder entry is
//! written after the lock is taken and cleared before it is released, so the
//! registry never shows two holders at once. The entry is published together
//! with the acquiring task's next state, so the registry never shows a task
//! waiting on a resource it already holds.

use super::registry::LiveRegistry;
use crate::domain::{HarnessError, HarnessResult, ResourceId, TaskId, TaskState};
use crate::infrastructure::config::duration_ms;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// An exclusive, non-reentrant resource that reports its holder
pub struct TrackedResource {
    id: ResourceId,
    lock: Mutex<()>,
    registry: Arc<LiveRegistry>,
}

impl TrackedResource {
    /// Create a resource reporting into `registry`
    pub fn new(id: ResourceId, registry: Arc<LiveRegistry>) -> Self {
        Self {
            id,
            lock: Mutex::new(()),
            registry,
        }
    }

    /// Resource identifier
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Acquire exclusively, waiting at most `bound`, then move `task` to
    /// `then` in the same registry step
    ///
    /// # Errors
    /// - `AcquisitionTimeout`: the resource stayed held for the whole bound
    pub fn acquire(
        &self,
        task: TaskId,
        bound: Duration,
        then: TaskState,
    ) -> HarnessResult<ResourceGuard<'_>> {
        let guard = self.lock.try_lock_for(bound).ok_or_else(|| {
            HarnessError::AcquisitionTimeout {
                task,
                resource: self.id,
                waited_ms: duration_ms(bound),
            }
        })?;

        self.registry.record_acquired(self.id, task, then);
        trace!(%task, resource = %self.id, "acquired");

        Ok(ResourceGuard {
            resource: self,
            task,
            _lock: guard,
        })
    }
}

/// Held resource; releases on drop
pub struct ResourceGuard<'a> {
    resource: &'a TrackedResource,
    task: TaskId,
    _lock: MutexGuard<'a, ()>,
}

impl ResourceGuard<'_> {
    /// The held resource
    pub fn resource(&self) -> ResourceId {
        self.resource.id
    }
}

impl Drop for ResourceGuard<'_> {
    fn drop(&mut self) {
        // Runs before `_lock` is dropped
        self.resource.registry.mark_released(self.resource.id, self.task);
        trace!(task = %self.task, resource = %self.resource.id, "released");
    }
}
