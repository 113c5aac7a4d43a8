//! Tick results and counters.

use serde::Serialize;

use crate::task::StatusReason;

/// What happened during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickOutcome {
    /// No tree installed, or the tree already finished
    Idle,
    /// The tree advanced or is waiting
    Running,
    /// A node in the active chain was restarted
    Restarted,
    /// The root finished during this tick
    TreeCompleted(StatusReason),
}

impl TickOutcome {
    /// Returns true if the tree has nothing left to do.
    pub fn is_finished(&self) -> bool {
        matches!(self, TickOutcome::Idle | TickOutcome::TreeCompleted(_))
    }
}

/// Counters kept across ticks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickStats {
    /// Number of ticks since creation
    pub tick_count: u64,
    /// Nodes finished normally
    pub completed: u64,
    /// Nodes finished through the ignored path
    pub ignored: u64,
    /// Nodes finished by timeout, cascades included
    pub timeouts: u64,
    /// Restarts, including sequence loop-backs
    pub restarts: u64,
    /// Nodes interrupted by root replacement or ancestor restart
    pub interrupts: u64,
    /// Hook errors absorbed by the timeout-task policy
    pub hook_failures: u64,
}

impl TickStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new tick
    pub fn tick(&mut self) {
        self.tick_count += 1;
    }

    pub(crate) fn record_finish(&mut self, reason: StatusReason) {
        match reason {
            StatusReason::Completed => self.completed += 1,
            StatusReason::Ignored => self.ignored += 1,
            StatusReason::Timeout => self.timeouts += 1,
            StatusReason::Interrupted => self.interrupts += 1,
        }
    }
}
