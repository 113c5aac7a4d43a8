//! Per-tick hook checks and the leaf state machine.

use std::time::{Duration, Instant};

use log::debug;

use crate::config::{RestartScope, TaskContext};
use crate::error::Result;
use crate::task::{Hook, TaskNode, TaskStatus};

use super::bubble::Finish;
use super::core::Orchestrator;
use super::tick::TickOutcome;

impl<C: TaskContext> Orchestrator<C> {
    /// Poll manual-completion and restart hooks from the leaf up.
    ///
    /// Returns an outcome when a hook fired; the tick ends there and the
    /// next one re-descends into the changed tree.
    pub(super) fn run_hook_checks(
        &mut self,
        root: &mut TaskNode<C>,
        ctx: &mut C,
        path: &[usize],
    ) -> Result<Option<TickOutcome>> {
        let highest = match self.config.restart_scope {
            RestartScope::Chain => 0,
            RestartScope::Leaf => path.len(),
        };

        for depth in (highest..=path.len()).rev() {
            let chain = &path[..depth];
            let node = root.descendant_mut(chain);
            match node.status() {
                TaskStatus::NotStarted | TaskStatus::Completed => continue,
                TaskStatus::AwaitingManualTermination => {
                    if node.hook(Hook::ShouldManuallyComplete, |task| task.should_manually_complete(ctx))? {
                        debug!("{} confirmed", node.label());
                        self.finish(root, ctx, chain, Finish::Completed { confirmed: true })?;
                        return Ok(Some(self.outcome(root, TickOutcome::Running)));
                    }
                }
                _ => {}
            }

            let node = root.descendant_mut(chain);
            if node.hook(Hook::ShouldRestart, |task| task.should_restart(ctx))? {
                self.restart(root, ctx, path, depth)?;
                return Ok(Some(TickOutcome::Restarted));
            }
        }
        Ok(None)
    }

    /// Advance the active leaf by one lifecycle step.
    pub(super) fn step(&mut self, root: &mut TaskNode<C>, ctx: &mut C, path: &[usize]) -> Result<TickOutcome> {
        let now = self.clock.now();
        let leaf = root.descendant_mut(path);

        // Only a leaf that was not started before this tick escaped the hook checks.
        let unpolled = leaf.status() == TaskStatus::NotStarted;
        if unpolled {
            leaf.state.begin_attempt(now);
            leaf.state.status = TaskStatus::AwaitingDelayBeforeStart;
            leaf.apply_runtime_config(ctx)?;
            leaf.hook(Hook::OnBeforeStart, |task| task.on_before_start(ctx))?;
            debug!("Started {}", leaf.label());
        }

        let mut fresh = false;
        if leaf.status() == TaskStatus::AwaitingDelayBeforeStart {
            if !leaf.state.start_delay_elapsed(now) {
                return Ok(TickOutcome::Running);
            }
            if leaf.hook(Hook::ShouldIgnore, |task| task.should_ignore(ctx))? {
                debug!("Ignoring {}", leaf.label());
                self.finish(root, ctx, path, Finish::Ignored)?;
                return Ok(self.outcome(root, TickOutcome::Running));
            }
            leaf.state.status = TaskStatus::Running;
            leaf.hook(Hook::Execute, |task| task.execute(ctx))?;
            fresh = true;
        }

        match leaf.status() {
            TaskStatus::Running => self.step_running(root, ctx, path, now, fresh, fresh && unpolled),
            TaskStatus::AwaitingDelayToComplete => {
                if leaf.state.complete_delay_elapsed(now) {
                    self.finish(root, ctx, path, Finish::Completed { confirmed: false })?;
                }
                Ok(self.outcome(root, TickOutcome::Running))
            }
            // Confirmation and restart were polled by the hook checks.
            TaskStatus::AwaitingManualTermination => Ok(TickOutcome::Running),
            TaskStatus::NotStarted | TaskStatus::AwaitingDelayBeforeStart | TaskStatus::Completed => {
                Ok(self.outcome(root, TickOutcome::Running))
            }
        }
    }

    /// `Running` branch. When `fresh`, `execute` has already run this tick.
    /// `poll_restart` is set when the hook checks skipped this leaf.
    fn step_running(
        &mut self,
        root: &mut TaskNode<C>,
        ctx: &mut C,
        path: &[usize],
        now: Instant,
        fresh: bool,
        poll_restart: bool,
    ) -> Result<TickOutcome> {
        let leaf = root.descendant_mut(path);

        // Non-terminable tasks never complete on their own but can still time out.
        if !leaf.options().terminable {
            if leaf.state.timed_out(now) {
                self.finish(root, ctx, path, Finish::Timeout { abort_tree: false })?;
                return Ok(self.outcome(root, TickOutcome::Running));
            }
            if !fresh {
                leaf.hook(Hook::Ping, |task| task.ping(ctx))?;
                leaf.hook(Hook::Execute, |task| task.execute(ctx))?;
            }
            return Ok(TickOutcome::Running);
        }

        if poll_restart && leaf.hook(Hook::ShouldRestart, |task| task.should_restart(ctx))? {
            self.restart(root, ctx, path, path.len())?;
            return Ok(TickOutcome::Restarted);
        }

        if leaf.state.timed_out(now) {
            self.finish(root, ctx, path, Finish::Timeout { abort_tree: false })?;
            return Ok(self.outcome(root, TickOutcome::Running));
        }

        if leaf.hook(Hook::Did, |task| task.did(ctx))? {
            leaf.state.finished_at = Some(now);
            if leaf.options().delay_after_complete > Duration::ZERO {
                leaf.state.status = TaskStatus::AwaitingDelayToComplete;
                debug!("{} done, waiting {:?}", leaf.label(), leaf.options().delay_after_complete);
                return Ok(TickOutcome::Running);
            }
            self.finish(root, ctx, path, Finish::Completed { confirmed: false })?;
            return Ok(self.outcome(root, TickOutcome::Running));
        }

        leaf.hook(Hook::Ping, |task| task.ping(ctx))?;
        Ok(TickOutcome::Running)
    }
}
