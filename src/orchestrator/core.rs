//! Orchestrator: owns the active tree and drives it one step per tick.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{HookErrorPolicy, SchedulerConfig, TaskContext};
use crate::diagnostics::{DiagnosticSink, TreeSnapshot};
use crate::error::{Result, TaskTreeError};
use crate::task::{Hook, StatusReason, Task, TaskNode, TaskStatus};

use super::bubble::Finish;
use super::tick::{TickOutcome, TickStats};

/// Drives exactly one task tree.
///
/// Each [`tick`](Orchestrator::tick):
/// 1. descends from the root through composites to the active leaf,
///    activating composites on the way
/// 2. polls restart and manual-completion hooks from the leaf up to the root
/// 3. aborts the whole tree if the root itself has timed out
/// 4. advances the leaf by one lifecycle step, bubbling any finish upward
///    within the same tick
pub struct Orchestrator<C: TaskContext> {
    pub(super) root: Option<TaskNode<C>>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) config: SchedulerConfig,
    pub(super) diagnostics: Option<Box<dyn DiagnosticSink>>,
    pub(super) stats: TickStats,
}

impl<C: TaskContext> Orchestrator<C> {
    /// Create an orchestrator with no tree, using the system clock.
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            root: None,
            clock: Arc::new(SystemClock),
            config,
            diagnostics: None,
            stats: TickStats::new(),
        }
    }

    /// Use a different clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Capture a snapshot into `sink` whenever a task times out.
    pub fn with_diagnostics(mut self, sink: Box<dyn DiagnosticSink>) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn stats(&self) -> &TickStats {
        &self.stats
    }

    /// The installed root, finished or not.
    pub fn root(&self) -> Option<&TaskNode<C>> {
        self.root.as_ref()
    }

    /// True while a tree is installed and its root has not finished.
    pub fn has_active_tree(&self) -> bool {
        self.root.as_ref().is_some_and(|root| !root.status().is_terminal())
    }

    /// Replace the active tree.
    ///
    /// The old tree's active chain is interrupted leaf first, root last,
    /// before the new root is installed. Every node in the chain gets its
    /// `on_interrupt` even if an earlier one fails; the first failure is
    /// returned after the new root is in place. `None` clears the tree.
    pub fn set_root_task(&mut self, ctx: &mut C, task: Option<Box<dyn Task<C>>>) -> Result<()> {
        let interrupted = match self.root.take() {
            Some(mut old) if !old.status().is_terminal() => {
                let path = old.active_path();
                info!("Interrupting tree {} ({} active node(s))", old.label(), path.len() + 1);
                self.interrupt_chain(&mut old, ctx, &path, 0)
            }
            _ => Ok(()),
        };

        self.root = task.map(|task| {
            let mut node = TaskNode::new(task, self.clock.now());
            node.state.is_root = true;
            info!("Installed root task {}", node.label());
            node
        });

        interrupted
    }

    /// Interrupt and drop the current tree.
    pub fn clear(&mut self, ctx: &mut C) -> Result<()> {
        self.set_root_task(ctx, None)
    }

    /// Active leaf, activating composites on the way down.
    ///
    /// Returns `None` when there is no tree or the root has finished.
    pub fn current_task(&mut self, ctx: &mut C) -> Result<Option<&TaskNode<C>>> {
        let Some(mut root) = self.root.take() else {
            return Ok(None);
        };
        let path = self.descend(&mut root, ctx);
        self.root = Some(root);

        Ok(path?.and_then(|path| self.root.as_ref().map(|root| root.descendant(&path))))
    }

    /// Active leaf as things stand, without activating anything.
    pub fn peek_current_task(&self) -> Option<&TaskNode<C>> {
        self.root
            .as_ref()
            .filter(|root| !root.status().is_terminal())
            .map(|root| root.descendant(&root.active_path()))
    }

    /// Snapshot of the installed tree.
    pub fn snapshot(&self, trigger: impl Into<String>) -> Option<TreeSnapshot> {
        self.root
            .as_ref()
            .map(|root| TreeSnapshot::capture(root, self.clock.now(), self.stats.tick_count, trigger))
    }

    /// Advance the tree by one step.
    pub fn tick(&mut self, ctx: &mut C) -> Result<TickOutcome> {
        self.stats.tick();
        ctx.begin_tick(self.stats.tick_count);
        let Some(mut root) = self.root.take() else {
            return Ok(TickOutcome::Idle);
        };

        let outcome = match self.tick_tree(&mut root, ctx) {
            Err(err) if self.config.hook_errors == HookErrorPolicy::TimeoutTask && err.task_id().is_some() => {
                self.recover_from_hook_error(&mut root, ctx, err)
            }
            other => other,
        };

        self.root = Some(root);
        outcome
    }

    fn tick_tree(&mut self, root: &mut TaskNode<C>, ctx: &mut C) -> Result<TickOutcome> {
        let Some(path) = self.descend(root, ctx)? else {
            return Ok(TickOutcome::Idle);
        };

        if let Some(outcome) = self.run_hook_checks(root, ctx, &path)? {
            return Ok(outcome);
        }

        // Composite roots never pass through the leaf timer, so guard them here.
        // The abort starts at the deepest node that has been started.
        if root.state.timed_out(self.clock.now()) {
            warn!("Root {} timed out, aborting tree", root.label());
            let started = (0..=path.len())
                .rev()
                .find(|&depth| root.descendant(&path[..depth]).status() != TaskStatus::NotStarted)
                .unwrap_or(0);
            self.finish(root, ctx, &path[..started], Finish::Timeout { abort_tree: true })?;
            return Ok(self.outcome(root, TickOutcome::Running));
        }

        self.step(root, ctx, &path)
    }

    /// Walk cursors from the root to the active leaf.
    pub(super) fn descend(&mut self, root: &mut TaskNode<C>, ctx: &mut C) -> Result<Option<Vec<usize>>> {
        if root.status().is_terminal() {
            return Ok(None);
        }

        let mut path = Vec::new();
        loop {
            let node = root.descendant_mut(&path);
            if !node.is_composite() {
                break;
            }
            if node.status() == TaskStatus::NotStarted {
                self.activate_composite(node, ctx)?;
            }
            if node.cursor >= node.children.len() {
                break;
            }
            path.push(node.cursor);
        }
        Ok(Some(path))
    }

    fn activate_composite(&mut self, node: &mut TaskNode<C>, ctx: &mut C) -> Result<()> {
        let now = self.clock.now();
        node.state.begin_attempt(now);
        node.apply_runtime_config(ctx)?;
        node.hook(Hook::OnBeforeStart, |task| task.on_before_start(ctx))?;
        node.rebuild_children(ctx, now)?;

        // Without children the composite is its own leaf and goes through
        // the regular start path.
        node.state.status = if node.children.is_empty() {
            TaskStatus::AwaitingDelayBeforeStart
        } else {
            TaskStatus::Running
        };
        debug!("Activated {} with {} child(ren)", node.label(), node.children.len());
        Ok(())
    }

    fn recover_from_hook_error(
        &mut self,
        root: &mut TaskNode<C>,
        ctx: &mut C,
        err: TaskTreeError,
    ) -> Result<TickOutcome> {
        let Some(path) = err.task_id().and_then(|id| root.path_to(id)) else {
            return Err(err);
        };
        self.stats.hook_failures += 1;
        if root.descendant(&path).status().is_terminal() {
            warn!("{} (task already finished)", err);
            return Ok(self.outcome(root, TickOutcome::Running));
        }

        warn!("{}; timing the task out", err);
        self.finish(root, ctx, &path, Finish::Timeout { abort_tree: false })?;
        Ok(self.outcome(root, TickOutcome::Running))
    }

    /// `TreeCompleted` if the root is done, `otherwise` if not.
    pub(super) fn outcome(&self, root: &TaskNode<C>, otherwise: TickOutcome) -> TickOutcome {
        if root.status().is_terminal() {
            TickOutcome::TreeCompleted(root.state.reason.unwrap_or(StatusReason::Completed))
        } else {
            otherwise
        }
    }
}
