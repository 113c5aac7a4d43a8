//! Scheduler settings and policy switches.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which nodes of the active chain are polled for `should_restart` each tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartScope {
    /// The active leaf and every ancestor up to the root.
    #[default]
    Chain,
    /// Only the active leaf.
    Leaf,
}

/// How far a tree-aborting timeout travels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeoutCascade {
    /// Once triggered, every ancestor up to the root times out.
    #[default]
    ToRoot,
    /// Each timed-out node's own `timeout_tree` flag decides whether its
    /// parent times out too.
    UntilUnflagged,
}

/// What `tick` does when a task hook returns an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookErrorPolicy {
    /// Return the error from `tick`; the tree is left as-is.
    #[default]
    Propagate,
    /// Finish the failing node through the timeout path and carry on.
    TimeoutTask,
}

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SchedulerConfig {
    /// Control loop cadence in milliseconds.
    pub tick_interval_ms: u64,

    /// Restart polling scope.
    pub restart_scope: RestartScope,

    /// Timeout propagation policy.
    pub timeout_cascade: TimeoutCascade,

    /// Hook failure policy.
    pub hook_errors: HookErrorPolicy,

    /// Stop the control loop once the tree finishes.
    pub stop_when_finished: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 50,
            restart_scope: RestartScope::default(),
            timeout_cascade: TimeoutCascade::default(),
            hook_errors: HookErrorPolicy::default(),
            stop_when_finished: true,
        }
    }
}

impl SchedulerConfig {
    /// Tick interval as a duration.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Set the tick interval.
    pub fn with_tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval_ms = ms;
        self
    }

    /// Set the restart scope.
    pub fn with_restart_scope(mut self, scope: RestartScope) -> Self {
        self.restart_scope = scope;
        self
    }

    /// Set the timeout cascade policy.
    pub fn with_timeout_cascade(mut self, cascade: TimeoutCascade) -> Self {
        self.timeout_cascade = cascade;
        self
    }

    /// Set the hook error policy.
    pub fn with_hook_errors(mut self, policy: HookErrorPolicy) -> Self {
        self.hook_errors = policy;
        self
    }
}
