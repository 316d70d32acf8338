//! Core Types for Task & Resource Introspection
//!
//! Tasks and resources are modelled as plain data so that deadlock detection
//! runs over an explicit [`Snapshot`] instead of a runtime thread inspector.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Identifiers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Task identifier, rendered as `Task1`, `Task2`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub usize);

impl TaskId {
    /// Create a new task identifier
    #[inline(always)]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Get the underlying usize value
    #[inline(always)]
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task{}", self.0)
    }
}

impl Serialize for TaskId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Exclusive-access resource identifier (`A`, `B`, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub char);

impl ResourceId {
    /// First resource of the lock-ordering pair
    pub const A: Self = Self('A');

    /// Second resource of the lock-ordering pair
    pub const B: Self = Self('B');

    /// Create a new resource identifier
    #[inline(always)]
    pub const fn new(id: char) -> Self {
        Self(id)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for ResourceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Task State
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Observable state of a task at snapshot time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskState {
    /// Task is executing (it may hold resources)
    Running,

    /// Task is waiting for a resource while holding none
    BlockedOn {
        /// The resource being requested
        waiting_for: ResourceId,
    },

    /// Task holds one resource and is waiting for another
    HoldingAndBlocked {
        /// Resource currently held
        held: ResourceId,
        /// Resource being requested
        waiting_for: ResourceId,
    },

    /// Task finished normally and released everything
    Completed,

    /// Task gave up after its acquisition bound and released everything
    TimedOut {
        /// The resource it was waiting for when it gave up
        waiting_for: ResourceId,
    },
}

impl TaskState {
    /// The resource this task is currently waiting for, if any
    pub const fn waiting_for(&self) -> Option<ResourceId> {
        match self {
            Self::BlockedOn { waiting_for } | Self::HoldingAndBlocked { waiting_for, .. } => {
                Some(*waiting_for)
            }
            _ => None,
        }
    }

    /// The resource this task reports holding while blocked, if any
    pub const fn held(&self) -> Option<ResourceId> {
        match self {
            Self::HoldingAndBlocked { held, .. } => Some(*held),
            _ => None,
        }
    }

    /// `true` once the task can no longer change state
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::TimedOut { .. })
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::BlockedOn { waiting_for } => write!(f, "blocked, waiting for {}", waiting_for),
            Self::HoldingAndBlocked { held, waiting_for } => {
                write!(f, "holds {}, waiting for {}", held, waiting_for)
            }
            Self::Completed => write!(f, "completed"),
            Self::TimedOut { waiting_for } => write!(f, "timed out waiting for {}", waiting_for),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Snapshots
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Point-in-time view of a single task (one entry of the thread dump)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSnapshot {
    /// Task identifier
    pub id: TaskId,

    /// OS thread name the task runs on
    pub name: String,

    /// State at snapshot time
    pub state: TaskState,

    /// Resources the task intends to acquire, in order
    pub plan: Vec<ResourceId>,
}

impl fmt::Display for TaskSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} \"{}\" {}", self.id, self.name, self.state)
    }
}

/// Immutable snapshot of every task and every resource holder
///
/// Ordered maps keep every traversal deterministic, which makes detection a
/// pure function of the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    tasks: BTreeMap<TaskId, TaskSnapshot>,
    holders: BTreeMap<ResourceId, TaskId>,
}

impl Snapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task with the given state
    ///
    /// A `HoldingAndBlocked` state also records the task as holder of `held`.
    #[must_use]
    pub fn with_task(mut self, id: TaskId, state: TaskState) -> Self {
        if let Some(held) = state.held() {
            self.holders.insert(held, id);
        }
        self.tasks.insert(
            id,
            TaskSnapshot {
                id,
                name: id.to_string(),
                state,
                plan: Vec::new(),
            },
        );
        self
    }

    /// Record `task` as the current holder of `resource`
    #[must_use]
    pub fn with_holder(mut self, resource: ResourceId, task: TaskId) -> Self {
        self.holders.insert(resource, task);
        self
    }

    /// Assemble a snapshot from already collected parts
    pub fn from_parts(
        tasks: impl IntoIterator<Item = TaskSnapshot>,
        holders: impl IntoIterator<Item = (ResourceId, TaskId)>,
    ) -> Self {
        Self {
            tasks: tasks.into_iter().map(|t| (t.id, t)).collect(),
            holders: holders.into_iter().collect(),
        }
    }

    /// Current holder of a resource
    pub fn holder(&self, resource: ResourceId) -> Option<TaskId> {
        self.holders.get(&resource).copied()
    }

    /// Look up one task
    pub fn task(&self, id: TaskId) -> Option<&TaskSnapshot> {
        self.tasks.get(&id)
    }

    /// All tasks in id order
    pub fn tasks(&self) -> impl Iterator<Item = &TaskSnapshot> {
        self.tasks.values()
    }

    /// All `(resource, holder)` pairs in resource order
    pub fn holders(&self) -> impl Iterator<Item = (ResourceId, TaskId)> + '_ {
        self.holders.iter().map(|(r, t)| (*r, *t))
    }

    /// Number of tasks in the snapshot
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// `true` if no task was captured
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
