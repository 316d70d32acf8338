//! Domain Model: Outcomes & Reports
//!
//! An [`Outcome`] is created once per harness run and never mutated. A
//! [`HarnessReport`] wraps it with the thread dump and diagnostics that the
//! CLI prints.

use super::types::{TaskId, TaskSnapshot};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Harness Kind
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The two hazard harnesses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HarnessKind {
    /// Reversed lock acquisition between two tasks
    LockOrdering,
    /// Unsynchronized flag publication between producer and consumer
    Visibility,
}

impl HarnessKind {
    /// Every harness, in the order the driver runs them
    pub const ALL: [Self; 2] = [Self::LockOrdering, Self::Visibility];

    /// Stable command-line name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LockOrdering => "lock-ordering",
            Self::Visibility => "visibility",
        }
    }
}

impl fmt::Display for HarnessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Outcome
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Terminal result of one harness run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "value")]
pub enum Outcome {
    /// The wait-for graph contained a cycle through these tasks
    DeadlockDetected(BTreeSet<TaskId>),

    /// No cycle was found, so the repro did not trigger
    NoDeadlockObserved,

    /// The consumer saw the flag flip; carries the counter it read then
    VisibilityObserved(u64),

    /// The consumer never saw the flag flip within the timeout
    VisibilityHung,
}

impl Outcome {
    /// Variant name as printed in reports
    pub const fn name(&self) -> &'static str {
        match self {
            Self::DeadlockDetected(_) => "DeadlockDetected",
            Self::NoDeadlockObserved => "NoDeadlockObserved",
            Self::VisibilityObserved(_) => "VisibilityObserved",
            Self::VisibilityHung => "VisibilityHung",
        }
    }

    /// `true` if the hazard under test actually reproduced
    pub const fn is_hazard_reproduced(&self) -> bool {
        matches!(self, Self::DeadlockDetected(_) | Self::VisibilityHung)
    }

    /// Deadlocked task ids, empty for every other variant
    pub fn deadlocked_tasks(&self) -> Vec<TaskId> {
        match self {
            Self::DeadlockDetected(tasks) => tasks.iter().copied().collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeadlockDetected(tasks) => {
                write!(f, "DeadlockDetected: [")?;
                for (i, task) in tasks.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", task)?;
                }
                write!(f, "]")
            }
            Self::VisibilityObserved(counter) => write!(f, "VisibilityObserved: counter={}", counter),
            other => f.write_str(other.name()),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Report
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Structured per-harness report
///
/// `Display` renders the line-oriented text form; `Serialize` backs the JSON
/// form (one report per line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarnessReport {
    /// Which harness produced this report
    pub harness: HarnessKind,

    /// The outcome of the run
    pub outcome: Outcome,

    /// Wall time from harness start to outcome
    pub elapsed_ms: u64,

    /// Thread dump captured at detection time
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<TaskSnapshot>,

    /// Witness cycles from the wait-for graph
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cycles: Vec<Vec<TaskId>>,

    /// Conditions that make the outcome less trustworthy
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,

    /// Informational remarks
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl HarnessReport {
    /// Create a bare report for an outcome
    pub fn new(harness: HarnessKind, outcome: Outcome) -> Self {
        Self {
            harness,
            outcome,
            elapsed_ms: 0,
            tasks: Vec::new(),
            cycles: Vec::new(),
            warnings: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Set the elapsed wall time
    #[must_use]
    pub fn with_elapsed_ms(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    /// Append a warning
    #[must_use]
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

/// Render a cycle as `Task1 -> Task2 -> Task1`
pub fn format_cycle(cycle: &[TaskId]) -> String {
    let mut out = cycle
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ");
    if let Some(first) = cycle.first() {
        out.push_str(&format!(" -> {}", first));
    }
    out
}

impl fmt::Display for HarnessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "[{}] {} (elapsed {}ms)",
            self.harness, self.outcome, self.elapsed_ms
        )?;
        for task in &self.tasks {
            writeln!(f, "  {}", task)?;
        }
        for cycle in &self.cycles {
            writeln!(f, "  cycle: {}", format_cycle(cycle))?;
        }
        for warning in &self.warnings {
            writeln!(f, "  warning: {}", warning)?;
        }
        for note in &self.notes {
            writeln!(f, "  note: {}", note)?;
        }
        Ok(())
    }
}
