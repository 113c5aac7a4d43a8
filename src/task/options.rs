//! Delay, timeout and termination options for a task.

use std::time::{Duration, TryFromFloatSecsError};

use log::warn;
use serde::{Deserialize, Serialize};

use super::TaskKind;
use crate::config::ConfigResolver;

/// Per-task scheduling options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOptions {
    /// Wait this long after activation before the first `execute`.
    pub delay_before_start: Duration,
    /// Wait this long after `did` before finishing.
    pub delay_after_complete: Duration,
    /// Abort the task after this long; `None` never times out.
    pub timeout: Option<Duration>,
    /// Finish when `did` returns true. Non-terminable tasks only end by
    /// timeout, restart or interrupt.
    pub terminable: bool,
    /// Park after internal completion until `should_manually_complete`.
    pub manually_terminable: bool,
    /// A timeout here aborts the ancestor chain as well.
    pub timeout_tree: bool,
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            delay_before_start: Duration::ZERO,
            delay_after_complete: Duration::ZERO,
            timeout: None,
            terminable: true,
            manually_terminable: false,
            timeout_tree: false,
        }
    }
}

impl TaskOptions {
    /// Set the delay before start.
    pub fn with_delay_before_start(mut self, delay: Duration) -> Self {
        self.delay_before_start = delay;
        self
    }

    /// Set the delay after completion.
    pub fn with_delay_after_complete(mut self, delay: Duration) -> Self {
        self.delay_after_complete = delay;
        self
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the timeout from seconds; `<= 0` disables it. Values too large
    /// for a `Duration` are logged and leave the timeout unchanged.
    pub fn with_timeout_secs(mut self, secs: f64) -> Self {
        match timeout_from_secs(secs) {
            Ok(timeout) => self.timeout = timeout,
            Err(e) => warn!("Ignoring timeout of {}s: {}", secs, e),
        }
        self
    }

    /// Only finish through timeout, restart or interrupt.
    pub fn non_terminable(mut self) -> Self {
        self.terminable = false;
        self
    }

    /// Require external confirmation after internal completion.
    pub fn manually_terminable(mut self) -> Self {
        self.manually_terminable = true;
        self
    }

    /// Abort the ancestor chain when this task times out.
    pub fn timeout_tree(mut self) -> Self {
        self.timeout_tree = true;
        self
    }

    /// Apply per-kind overrides from settings and environment.
    ///
    /// Looks up `tasks.<kind>.timeout-secs` (env `TASKTREE_<KIND>_TIMEOUT_SECS`)
    /// and the two delay keys, keeping current values when nothing is set
    /// or the value does not fit a `Duration`.
    pub fn apply_overrides(&mut self, resolver: &ConfigResolver, kind: TaskKind) {
        let key = kind.config_key();
        let env = kind.env_prefix();

        let timeout_secs = resolver.resolve(
            &format!("tasks.{}.timeout-secs", key),
            &format!("{}_TIMEOUT_SECS", env),
            self.timeout.map(|t| t.as_secs_f64()).unwrap_or(0.0),
        );
        match timeout_from_secs(timeout_secs) {
            Ok(timeout) => self.timeout = timeout,
            Err(e) => warn!("Ignoring {} timeout of {}s: {}", key, timeout_secs, e),
        }

        let before = resolver.resolve(
            &format!("tasks.{}.delay-before-start-secs", key),
            &format!("{}_DELAY_BEFORE_START_SECS", env),
            self.delay_before_start.as_secs_f64(),
        );
        match delay_from_secs(before) {
            Ok(delay) => self.delay_before_start = delay,
            Err(e) => warn!("Ignoring {} delay-before-start of {}s: {}", key, before, e),
        }

        let after = resolver.resolve(
            &format!("tasks.{}.delay-after-complete-secs", key),
            &format!("{}_DELAY_AFTER_COMPLETE_SECS", env),
            self.delay_after_complete.as_secs_f64(),
        );
        match delay_from_secs(after) {
            Ok(delay) => self.delay_after_complete = delay,
            Err(e) => warn!("Ignoring {} delay-after-complete of {}s: {}", key, after, e),
        }
    }
}

/// `<= 0` and infinity mean no timeout.
fn timeout_from_secs(secs: f64) -> Result<Option<Duration>, TryFromFloatSecsError> {
    if secs.is_nan() || secs <= 0.0 || secs == f64::INFINITY {
        return Ok(None);
    }
    Duration::try_from_secs_f64(secs).map(Some)
}

/// `<= 0` means no delay.
fn delay_from_secs(secs: f64) -> Result<Duration, TryFromFloatSecsError> {
    if secs.is_nan() || secs <= 0.0 {
        return Ok(Duration::ZERO);
    }
    Duration::try_from_secs_f64(secs)
}
