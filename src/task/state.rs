//! Lifecycle state carried by every node.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::TaskOptions;

/// Lifecycle status of a task.
///
/// ```text
/// NotStarted -> AwaitingDelayBeforeStart -> Running
///   Running -> AwaitingDelayToComplete -> Completed
///   Running -> AwaitingManualTermination -> Completed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not visited yet in this attempt
    NotStarted,
    /// Activated, waiting for `delay_before_start`
    AwaitingDelayBeforeStart,
    /// Executing; polled each tick
    Running,
    /// `did` returned true, waiting for `delay_after_complete`
    AwaitingDelayToComplete,
    /// Internally complete, waiting for external confirmation
    AwaitingManualTermination,
    /// Terminal for this instance
    Completed,
}

impl TaskStatus {
    /// Returns true if the task has finished.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }

    /// Returns true if the task is waiting across ticks without running.
    pub fn is_waiting(&self) -> bool {
        matches!(
            self,
            TaskStatus::AwaitingDelayBeforeStart
                | TaskStatus::AwaitingDelayToComplete
                | TaskStatus::AwaitingManualTermination
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::NotStarted => "not started",
            TaskStatus::AwaitingDelayBeforeStart => "awaiting start delay",
            TaskStatus::Running => "running",
            TaskStatus::AwaitingDelayToComplete => "awaiting completion delay",
            TaskStatus::AwaitingManualTermination => "awaiting manual termination",
            TaskStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Why a task reached its current terminal or parked state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusReason {
    /// Finished normally
    Completed,
    /// Skipped by `should_ignore`
    Ignored,
    /// Timed out, directly or through a cascade
    Timeout,
    /// Discarded by a root replacement or ancestor restart
    Interrupted,
}

impl StatusReason {
    /// Stable lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusReason::Completed => "completed",
            StatusReason::Ignored => "ignored",
            StatusReason::Timeout => "timeout",
            StatusReason::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for StatusReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bookkeeping for one task instance.
#[derive(Debug, Clone)]
pub struct TaskState {
    pub status: TaskStatus,
    pub reason: Option<StatusReason>,
    pub created_at: Instant,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
    pub options: TaskOptions,
    pub is_root: bool,
    pub retry_count: u32,
}

impl TaskState {
    /// Fresh state for a task created at `now`.
    pub fn new(options: TaskOptions, now: Instant) -> Self {
        Self {
            status: TaskStatus::NotStarted,
            reason: None,
            created_at: now,
            started_at: None,
            finished_at: None,
            options,
            is_root: false,
            retry_count: 0,
        }
    }

    /// Record the start of a new attempt.
    pub(crate) fn begin_attempt(&mut self, now: Instant) {
        self.started_at = Some(now);
        self.finished_at = None;
        self.reason = None;
    }

    /// Back to `NotStarted` for another attempt.
    pub(crate) fn reset_for_restart(&mut self) {
        self.status = TaskStatus::NotStarted;
        self.reason = None;
        self.started_at = None;
        self.finished_at = None;
        self.retry_count += 1;
    }

    pub(crate) fn park(&mut self, now: Instant) {
        self.status = TaskStatus::AwaitingManualTermination;
        self.finished_at.get_or_insert(now);
    }

    pub(crate) fn complete(&mut self, now: Instant, reason: StatusReason) {
        self.status = TaskStatus::Completed;
        self.reason = Some(reason);
        self.finished_at.get_or_insert(now);
    }

    /// Time since the current attempt started.
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.started_at.map(|started| now.saturating_duration_since(started))
    }

    /// True once `delay_before_start` has passed since activation.
    pub fn start_delay_elapsed(&self, now: Instant) -> bool {
        self.elapsed(now)
            .is_some_and(|elapsed| elapsed >= self.options.delay_before_start)
    }

    /// True once `delay_after_complete` has passed since `did`.
    pub fn complete_delay_elapsed(&self, now: Instant) -> bool {
        self.finished_at
            .is_some_and(|finished| now.saturating_duration_since(finished) >= self.options.delay_after_complete)
    }

    /// True if the attempt has run past its timeout.
    pub fn timed_out(&self, now: Instant) -> bool {
        match (self.options.timeout, self.elapsed(now)) {
            (Some(timeout), Some(elapsed)) => elapsed >= timeout,
            _ => false,
        }
    }
}
