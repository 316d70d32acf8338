//! Deadlock Detector - Wait-For Graph Analysis
//!
//! # Model
//!
//! ```text
//! WaitForGraph: Task -> {Task}
//!     t1 -> t2  iff  t1 waits for a resource whose holder is t2
//!
//! Deadlocked == { t : t reaches itself in WaitForGraph }
//! ```
//!
//! The graph is rebuilt from a [`Snapshot`] on every pass and never patched.
//! Detection observes cycles; it never breaks them.

use super::error::{HarnessError, HarnessResult};
use super::types::{Snapshot, TaskId};
use std::collections::{BTreeMap, BTreeSet};

/// Directed wait-for graph derived from one snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitForGraph {
    edges: BTreeMap<TaskId, BTreeSet<TaskId>>,
}

impl WaitForGraph {
    /// Build the graph for a snapshot
    ///
    /// Every waiting task gets an edge to the holder of the resource it
    /// waits for. Unheld resources contribute no edge. Tasks that hold
    /// nothing are never edge targets, so counting `BlockedOn` waiters does
    /// not change which tasks end up on a cycle.
    ///
    /// # Errors
    /// - `DetectorInputInvariantViolation`: a task waits on a resource it holds
    pub fn from_snapshot(snapshot: &Snapshot) -> HarnessResult<Self> {
        let mut edges: BTreeMap<TaskId, BTreeSet<TaskId>> = BTreeMap::new();

        for task in snapshot.tasks() {
            let Some(wanted) = task.state.waiting_for() else {
                continue;
            };
            let Some(holder) = snapshot.holder(wanted) else {
                continue;
            };
            if holder == task.id {
                return Err(HarnessError::DetectorInputInvariantViolation {
                    task: task.id,
                    resource: wanted,
                });
            }
            edges.entry(task.id).or_default().insert(holder);
        }

        Ok(Self { edges })
    }

    /// Add a single edge (used to build synthetic graphs)
    pub fn add_edge(&mut self, from: TaskId, to: TaskId) {
        self.edges.entry(from).or_default().insert(to);
    }

    /// Tasks that `task` waits for
    pub fn successors(&self, task: TaskId) -> impl Iterator<Item = TaskId> + '_ {
        self.edges.get(&task).into_iter().flatten().copied()
    }

    /// Total number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    /// `true` if nobody waits on anybody
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Find a cycle that starts and ends at `start`
    ///
    /// Returns the path `start, ..., last` where `last -> start` closes the
    /// cycle.
    pub fn cycle_through(&self, start: TaskId) -> Option<Vec<TaskId>> {
        let mut visited = BTreeSet::from([start]);
        let mut path = Vec::new();

        if self.dfs_cycle(start, start, &mut visited, &mut path) {
            Some(path)
        } else {
            None
        }
    }

    fn dfs_cycle(
        &self,
        current: TaskId,
        target: TaskId,
        visited: &mut BTreeSet<TaskId>,
        path: &mut Vec<TaskId>,
    ) -> bool {
        path.push(current);

        for next in self.successors(current) {
            if next == target {
                return true;
            }
            if visited.insert(next) && self.dfs_cycle(next, target, visited, path) {
                return true;
            }
        }

        path.pop();
        false
    }

    /// Every task that lies on at least one cycle
    pub fn deadlocked(&self) -> BTreeSet<TaskId> {
        self.edges
            .keys()
            .copied()
            .filter(|&task| self.cycle_through(task).is_some())
            .collect()
    }

    /// One witness per distinct cycle, rotated so its smallest id leads
    pub fn cycles(&self) -> Vec<Vec<TaskId>> {
        let mut seen = BTreeSet::new();

        for &start in self.edges.keys() {
            if let Some(mut cycle) = self.cycle_through(start) {
                let lead = cycle
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, task)| **task)
                    .map_or(0, |(i, _)| i);
                cycle.rotate_left(lead);
                seen.insert(cycle);
            }
        }

        seen.into_iter().collect()
    }
}

/// Result of one detection pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    /// Tasks on a cycle
    pub deadlocked: BTreeSet<TaskId>,
    /// Witness cycles
    pub cycles: Vec<Vec<TaskId>>,
}

impl Detection {
    /// `true` if at least one cycle was found
    pub fn has_deadlock(&self) -> bool {
        !self.deadlocked.is_empty()
    }
}

/// Stateless deadlock detector over snapshots
#[derive(Debug, Clone, Copy, Default)]
pub struct DeadlockDetector;

impl DeadlockDetector {
    /// Create a detector
    pub const fn new() -> Self {
        Self
    }

    /// Deadlocked task ids for a snapshot
    ///
    /// Pure: identical snapshots always yield identical sets.
    ///
    /// # Errors
    /// - `DetectorInputInvariantViolation`: a task waits on a resource it holds
    pub fn detect(&self, snapshot: &Snapshot) -> HarnessResult<BTreeSet<TaskId>> {
        Ok(WaitForGraph::from_snapshot(snapshot)?.deadlocked())
    }

    /// Deadlocked set plus witness cycles
    ///
    /// # Errors
    /// - `DetectorInputInvariantViolation`: a task waits on a resource it holds
    pub fn analyze(&self, snapshot: &Snapshot) -> HarnessResult<Detection> {
        let graph = WaitForGraph::from_snapshot(snapshot)?;
        Ok(Detection {
            deadlocked: graph.deadlocked(),
            cycles: graph.cycles(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{ResourceId, TaskState};

    const T1: TaskId = TaskId(1);
    const T2: TaskId = TaskId(2);
    const T3: TaskId = TaskId(3);

    fn holding(held: ResourceId, waiting_for: ResourceId) -> TaskState {
        TaskState::HoldingAndBlocked { held, waiting_for }
    }

    fn ab_ba() -> Snapshot {
        Snapshot::new()
            .with_task(T1, holding(ResourceId::A, ResourceId::B))
            .with_task(T2, holding(ResourceId::B, ResourceId::A))
    }

    #[test]
    fn test_ab_ba_deadlock_detection() {
        let deadlocked = DeadlockDetector::new().detect(&ab_ba()).unwrap();
        assert_eq!(deadlocked, BTreeSet::from([T1, T2]));
    }

    #[test]
    fn test_detection_is_pure() {
        let snapshot = ab_ba();
        let detector = DeadlockDetector::new();

        let first = detector.analyze(&snapshot).unwrap();
        let second = detector.analyze(&snapshot).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_waiters_means_no_deadlock() {
        let snapshot = Snapshot::new()
            .with_task(T1, TaskState::Running)
            .with_task(T2, TaskState::Completed)
            .with_holder(ResourceId::A, T1);

        assert!(DeadlockDetector::new().detect(&snapshot).unwrap().is_empty());
    }

    #[test]
    fn test_holder_not_blocked_means_no_cycle() {
        // Task2 holds B but is not waiting on anything
        let snapshot = Snapshot::new()
            .with_task(T1, holding(ResourceId::A, ResourceId::B))
            .with_task(T2, TaskState::Running)
            .with_holder(ResourceId::B, T2);

        let graph = WaitForGraph::from_snapshot(&snapshot).unwrap();
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.deadlocked().is_empty());
    }

    #[test]
    fn test_unheld_resource_contributes_no_edge() {
        let snapshot = Snapshot::new().with_task(T1, holding(ResourceId::A, ResourceId::B));

        let graph = WaitForGraph::from_snapshot(&snapshot).unwrap();
        assert!(graph.is_empty());
    }

    #[test]
    fn test_self_wait_is_rejected() {
        let snapshot = Snapshot::new()
            .with_task(T1, TaskState::BlockedOn { waiting_for: ResourceId::A })
            .with_holder(ResourceId::A, T1);

        let result = DeadlockDetector::new().detect(&snapshot);
        assert!(matches!(
            result,
            Err(HarnessError::DetectorInputInvariantViolation { task: T1, .. })
        ));
    }

    #[test]
    fn test_three_task_ring() {
        let c = ResourceId::new('C');
        let snapshot = Snapshot::new()
            .with_task(T1, holding(ResourceId::A, ResourceId::B))
            .with_task(T2, holding(ResourceId::B, c))
            .with_task(T3, holding(c, ResourceId::A));

        let detection = DeadlockDetector::new().analyze(&snapshot).unwrap();
        assert_eq!(detection.deadlocked, BTreeSet::from([T1, T2, T3]));
        assert_eq!(detection.cycles, vec![vec![T1, T2, T3]]);
    }

    #[test]
    fn test_tail_waiter_is_not_deadlocked() {
        // Task3 waits on Task1, which is stuck in the Task1/Task2 cycle,
        // but Task3 itself is not on the cycle.
        let c = ResourceId::new('C');
        let snapshot = ab_ba()
            .with_task(T3, holding(c, ResourceId::A));

        let detection = DeadlockDetector::new().analyze(&snapshot).unwrap();
        assert_eq!(detection.deadlocked, BTreeSet::from([T1, T2]));
        assert_eq!(detection.cycles, vec![vec![T1, T2]]);
    }

    #[test]
    fn test_blocked_on_waiter_joins_graph() {
        let snapshot = Snapshot::new()
            .with_task(T1, TaskState::BlockedOn { waiting_for: ResourceId::A })
            .with_task(T2, TaskState::Running)
            .with_holder(ResourceId::A, T2);

        let graph = WaitForGraph::from_snapshot(&snapshot).unwrap();
        assert_eq!(graph.successors(T1).collect::<Vec<_>>(), vec![T2]);
        assert!(graph.deadlocked().is_empty());
    }

    #[test]
    fn test_cycles_are_deduplicated() {
        let mut graph = WaitForGraph::default();
        graph.add_edge(T2, T1);
        graph.add_edge(T1, T2);

        assert_eq!(graph.cycles(), vec![vec![T1, T2]]);
        assert_eq!(graph.cycle_through(T2), Some(vec![T2, T1]));
    }
}
