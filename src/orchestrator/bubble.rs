//! Finishing, restarting and interrupting nodes.
//!
//! All three walk the ancestor chain iteratively over the index path, so
//! bubbling is depth first from the finishing node toward the root and
//! fully resolved within one tick.

use log::{debug, info, warn};

use crate::config::{TaskContext, TimeoutCascade};
use crate::diagnostics::TreeSnapshot;
use crate::error::{Result, TaskTreeError};
use crate::task::{Hook, StatusReason, TaskNode, TaskStatus};

use super::core::Orchestrator;

/// How a node is being finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Finish {
    /// Normal completion. `confirmed` skips the manual-termination gate.
    Completed { confirmed: bool },
    /// `should_ignore` returned true.
    Ignored,
    /// Timed out. `abort_tree` forces the cascade to the root regardless
    /// of flags (root timeout guard).
    Timeout { abort_tree: bool },
}

impl<C: TaskContext> Orchestrator<C> {
    /// Finish the node at `path` and bubble the result upward.
    ///
    /// A finished child advances its parent's cursor; the last child
    /// finishes the parent unless the parent loops. A cascading timeout
    /// times out the parent instead. Manually terminable nodes park on
    /// unconfirmed completion and stop the bubbling.
    ///
    /// Callback failures do not stop the bubbling: every transition is
    /// applied and the first error is returned afterwards. A failing
    /// `should_restart_after_all_children_complete` counts as `false`.
    pub(super) fn finish(&mut self, root: &mut TaskNode<C>, ctx: &mut C, path: &[usize], finish: Finish) -> Result<()> {
        let now = self.clock.now();
        let forced = matches!(finish, Finish::Timeout { abort_tree: true });
        let mut sticky = false;
        let mut trigger = None;
        let mut finish = finish;
        let mut depth = path.len();
        let mut first_error: Option<TaskTreeError> = None;

        loop {
            let node = root.descendant_mut(&path[..depth]);
            let reason = match finish {
                Finish::Completed { confirmed } => {
                    if node.options().manually_terminable && !confirmed {
                        node.state.park(now);
                        info!("{} awaiting manual termination", node.label());
                        break;
                    }
                    StatusReason::Completed
                }
                Finish::Ignored => {
                    keep_first(&mut first_error, node.hook(Hook::OnIgnored, |task| task.on_ignored(ctx)));
                    StatusReason::Ignored
                }
                Finish::Timeout { .. } => {
                    keep_first(&mut first_error, node.hook(Hook::OnTimeout, |task| task.on_timeout(ctx)));
                    StatusReason::Timeout
                }
            };

            node.state.complete(now, reason);
            keep_first(&mut first_error, node.hook(Hook::OnComplete, |task| task.on_complete(ctx)));
            self.stats.record_finish(reason);

            let cascade = match finish {
                Finish::Timeout { .. } => {
                    warn!("{} timed out", node.label());
                    trigger.get_or_insert_with(|| format!("timeout {}", node.label()));
                    match self.config.timeout_cascade {
                        TimeoutCascade::ToRoot => {
                            sticky |= node.options().timeout_tree;
                            forced || sticky
                        }
                        TimeoutCascade::UntilUnflagged => forced || node.options().timeout_tree,
                    }
                }
                _ => {
                    debug!("{} finished ({})", node.label(), reason);
                    false
                }
            };

            if depth == 0 {
                info!("Tree {} finished ({})", node.label(), reason);
                break;
            }
            depth -= 1;

            if cascade {
                finish = Finish::Timeout { abort_tree: forced };
                continue;
            }

            let parent = root.descendant_mut(&path[..depth]);
            parent.cursor += 1;
            if parent.cursor < parent.children.len() {
                debug!("{} moved to child {}", parent.label(), parent.cursor);
                break;
            }
            let again = parent.hook(Hook::ShouldRestartAfterAllChildrenComplete, |task| {
                task.should_restart_after_all_children_complete(ctx)
            });
            if keep_first(&mut first_error, again).unwrap_or(false) {
                let reset = self.reset_node(parent, ctx);
                keep_first(&mut first_error, reset);
                break;
            }
            finish = Finish::Completed { confirmed: false };
        }

        if let Some(trigger) = trigger {
            self.capture_diagnostics(root, &trigger);
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Restart the node at `path[..depth]`, interrupting its active
    /// descendants first (deepest first).
    pub(super) fn restart(&mut self, root: &mut TaskNode<C>, ctx: &mut C, path: &[usize], depth: usize) -> Result<()> {
        let interrupted = self.interrupt_chain(root, ctx, path, depth + 1);
        let node = root.descendant_mut(&path[..depth]);
        self.reset_node(node, ctx)?;
        interrupted
    }

    /// Back to `NotStarted` with the cursor at 0 and a fresh retry. Children
    /// are dropped and rebuilt at the next activation.
    fn reset_node(&mut self, node: &mut TaskNode<C>, ctx: &mut C) -> Result<()> {
        node.state.reset_for_restart();
        node.children.clear();
        node.cursor = 0;
        self.stats.restarts += 1;
        info!("Restarting {} (retry {})", node.label(), node.retry_count());

        node.apply_runtime_config(ctx)?;
        node.hook(Hook::OnBeforeRestart, |task| task.on_before_restart(ctx))
    }

    /// Call `on_interrupt` on `path[..depth]` for every depth from the leaf
    /// up to `shallowest`. Every started node is visited; the first error wins.
    pub(super) fn interrupt_chain(
        &mut self,
        root: &mut TaskNode<C>,
        ctx: &mut C,
        path: &[usize],
        shallowest: usize,
    ) -> Result<()> {
        let now = self.clock.now();
        let mut first_error: Option<TaskTreeError> = None;

        for depth in (shallowest..=path.len()).rev() {
            let node = root.descendant_mut(&path[..depth]);
            // Never-started nodes hold nothing to release.
            if matches!(node.status(), TaskStatus::NotStarted | TaskStatus::Completed) {
                continue;
            }
            keep_first(&mut first_error, node.hook(Hook::OnInterrupt, |task| task.on_interrupt(ctx)));
            node.state.complete(now, StatusReason::Interrupted);
            self.stats.record_finish(StatusReason::Interrupted);
            debug!("Interrupted {}", node.label());
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Hand a snapshot to the diagnostic sink. Failures are logged and dropped.
    fn capture_diagnostics(&mut self, root: &TaskNode<C>, trigger: &str) {
        let Some(sink) = self.diagnostics.as_mut() else {
            return;
        };
        let snapshot = TreeSnapshot::capture(root, self.clock.now(), self.stats.tick_count, trigger);
        if let Err(e) = sink.capture(&snapshot) {
            warn!("Diagnostic capture failed ({}): {}", trigger, e);
        }
    }
}

/// Log a failed callback and remember it if it is the first.
fn keep_first<T>(first: &mut Option<TaskTreeError>, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("{}", e);
            first.get_or_insert(e);
            None
        }
    }
}
