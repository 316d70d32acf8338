//! Live Registry - Task States & Resource Holders
//!
//! Worker threads write their own state and holder entries here as they run;
//! the harness reads it back as an immutable [`Snapshot`].
//!
//! # Consistency
//!
//! Writers share the read side of `gate`; [`LiveRegistry::snapshot`] takes
//! the write side. An acquisition publishes its holder entry and the task's
//! next state under one read guard, so no snapshot can see the resource held
//! while its holder still waits for it.

use crate::domain::{ResourceId, Snapshot, TaskId, TaskSnapshot, TaskState};
use dashmap::DashMap;
use parking_lot::RwLock;

#[derive(Debug, Clone)]
struct TaskRecord {
    name: String,
    state: TaskState,
    plan: Vec<ResourceId>,
}

/// Concurrent registry of live task states and resource holders
#[derive(Debug, Default)]
pub struct LiveRegistry {
    tasks: DashMap<TaskId, TaskRecord>,
    holders: DashMap<ResourceId, TaskId>,
    gate: RwLock<()>,
}

impl LiveRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task before it starts running
    pub fn register_task(&self, id: TaskId, name: impl Into<String>, plan: Vec<ResourceId>) {
        let _gate = self.gate.read();
        self.tasks.insert(
            id,
            TaskRecord {
                name: name.into(),
                state: TaskState::Running,
                plan,
            },
        );
    }

    /// Record a state transition
    pub fn set_state(&self, id: TaskId, state: TaskState) {
        let _gate = self.gate.read();
        self.update_state(id, state);
    }

    fn update_state(&self, id: TaskId, state: TaskState) {
        if let Some(mut record) = self.tasks.get_mut(&id) {
            record.state = state;
        }
    }

    /// Current state of a task
    pub fn state(&self, id: TaskId) -> Option<TaskState> {
        self.tasks.get(&id).map(|r| r.state)
    }

    /// Record `task` as holder of `resource` and move it to `state`
    ///
    /// Both writes become visible to snapshots together.
    pub fn record_acquired(&self, resource: ResourceId, task: TaskId, state: TaskState) {
        let _gate = self.gate.read();
        self.holders.insert(resource, task);
        self.update_state(task, state);
    }

    /// Clear the holder entry, but only if `task` is still the holder
    pub fn mark_released(&self, resource: ResourceId, task: TaskId) {
        let _gate = self.gate.read();
        self.holders.remove_if(&resource, |_, holder| *holder == task);
    }

    /// Current holder of a resource
    pub fn holder(&self, resource: ResourceId) -> Option<TaskId> {
        self.holders.get(&resource).map(|h| *h)
    }

    /// `true` if every registered task satisfies `predicate`
    ///
    /// An empty registry never matches.
    pub fn all_tasks(&self, predicate: impl Fn(&TaskState) -> bool) -> bool {
        !self.tasks.is_empty() && self.tasks.iter().all(|entry| predicate(&entry.state))
    }

    /// Copy the registry into an immutable snapshot
    ///
    /// Blocks writers for the duration of the copy.
    pub fn snapshot(&self) -> Snapshot {
        let _gate = self.gate.write();
        let tasks: Vec<TaskSnapshot> = self
            .tasks
            .iter()
            .map(|entry| TaskSnapshot {
                id: *entry.key(),
                name: entry.name.clone(),
                state: entry.state,
                plan: entry.plan.clone(),
            })
            .collect();
        let holders: Vec<(ResourceId, TaskId)> = self
            .holders
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();

        Snapshot::from_parts(tasks, holders)
    }
}
