//! The hook contract every task implements.
//!
//! Hooks receive the shared context mutably and must return quickly: a
//! tick runs every hook it needs to completion before the next tick.
//! Resource bookkeeping (held keys and the like) belongs in the lifecycle
//! callbacks, which the scheduler calls on every exit path.

use std::fmt;

use eyre::Result;

use super::{TaskKind, TaskOptions};
use crate::config::TaskContext;

/// A schedulable unit of work.
pub trait Task<C: TaskContext> {
    /// Kind tag.
    fn kind(&self) -> TaskKind;

    /// Human-readable label for logs and snapshots.
    fn name(&self) -> String {
        self.kind().to_string()
    }

    /// Initial scheduling options, copied into the node when attached.
    fn options(&self) -> TaskOptions {
        TaskOptions::default()
    }

    /// Composites are descended through rather than stepped.
    fn is_composite(&self) -> bool {
        false
    }

    /// Children for this activation. Called once per activation or restart
    /// cycle, right after `on_before_start`.
    fn build_children(&mut self, _ctx: &mut C) -> Result<Vec<Box<dyn Task<C>>>> {
        Ok(Vec::new())
    }

    /// Resolve tunables from live configuration before activation and
    /// before each restart.
    fn apply_runtime_config(&mut self, ctx: &mut C, options: &mut TaskOptions) -> Result<()> {
        options.apply_overrides(ctx.resolver(), self.kind());
        Ok(())
    }

    /// Skip the task when its goal is already satisfied.
    fn should_ignore(&mut self, _ctx: &mut C) -> Result<bool> {
        Ok(false)
    }

    /// The work itself.
    fn execute(&mut self, _ctx: &mut C) -> Result<()> {
        Ok(())
    }

    /// Whether the task is logically complete.
    fn did(&mut self, _ctx: &mut C) -> Result<bool> {
        Ok(true)
    }

    /// Auxiliary update while running and not yet complete.
    fn ping(&mut self, _ctx: &mut C) -> Result<()> {
        Ok(())
    }

    fn should_restart(&mut self, _ctx: &mut C) -> Result<bool> {
        Ok(false)
    }

    /// External confirmation gate for manually terminable tasks.
    fn should_manually_complete(&mut self, _ctx: &mut C) -> Result<bool> {
        Ok(false)
    }

    /// Loop back to the first child instead of finishing.
    fn should_restart_after_all_children_complete(&mut self, _ctx: &mut C) -> Result<bool> {
        Ok(false)
    }

    fn on_before_start(&mut self, _ctx: &mut C) -> Result<()> {
        Ok(())
    }

    fn on_before_restart(&mut self, _ctx: &mut C) -> Result<()> {
        Ok(())
    }

    fn on_ignored(&mut self, _ctx: &mut C) -> Result<()> {
        Ok(())
    }

    fn on_interrupt(&mut self, _ctx: &mut C) -> Result<()> {
        Ok(())
    }

    fn on_complete(&mut self, _ctx: &mut C) -> Result<()> {
        Ok(())
    }

    fn on_timeout(&mut self, _ctx: &mut C) -> Result<()> {
        Ok(())
    }
}

/// Names of the hooks, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    BuildChildren,
    ApplyRuntimeConfig,
    ShouldIgnore,
    Execute,
    Did,
    Ping,
    ShouldRestart,
    ShouldManuallyComplete,
    ShouldRestartAfterAllChildrenComplete,
    OnBeforeStart,
    OnBeforeRestart,
    OnIgnored,
    OnInterrupt,
    OnComplete,
    OnTimeout,
}

impl Hook {
    pub fn as_str(&self) -> &'static str {
        match self {
            Hook::BuildChildren => "build_children",
            Hook::ApplyRuntimeConfig => "apply_runtime_config",
            Hook::ShouldIgnore => "should_ignore",
            Hook::Execute => "execute",
            Hook::Did => "did",
            Hook::Ping => "ping",
            Hook::ShouldRestart => "should_restart",
            Hook::ShouldManuallyComplete => "should_manually_complete",
            Hook::ShouldRestartAfterAllChildrenComplete => "should_restart_after_all_children_complete",
            Hook::OnBeforeStart => "on_before_start",
            Hook::OnBeforeRestart => "on_before_restart",
            Hook::OnIgnored => "on_ignored",
            Hook::OnInterrupt => "on_interrupt",
            Hook::OnComplete => "on_complete",
            Hook::OnTimeout => "on_timeout",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
