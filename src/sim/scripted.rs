//! Tasks driven by a scenario node.

use eyre::Result;

use super::{ScenarioNode, SimContext};
use crate::task::{Task, TaskKind, TaskOptions};

/// Plays back a [`ScenarioNode`] against a [`SimContext`].
///
/// Every hook call is written to the context journal under the node's
/// display name. Leaves answer `did` from a poll counter; composites build
/// a fresh `ScriptedTask` per child on each activation.
pub struct ScriptedTask {
    node: ScenarioNode,
    name: String,
    did_polls: u32,
    confirm_polls: u32,
    restart_polls: u32,
    restarts: u32,
    passes: u32,
}

impl ScriptedTask {
    pub fn new(node: ScenarioNode) -> Self {
        let name = node.display_name();
        Self {
            node,
            name,
            did_polls: 0,
            confirm_polls: 0,
            restart_polls: 0,
            restarts: 0,
            passes: 0,
        }
    }

    /// Boxed for use as a root or child.
    pub fn boxed(node: ScenarioNode) -> Box<dyn Task<SimContext>> {
        Box::new(Self::new(node))
    }

    fn release_key(&self, ctx: &mut SimContext) {
        if let Some(key) = &self.node.holds_key {
            ctx.key_up(&self.name, key);
        }
    }
}

impl Task<SimContext> for ScriptedTask {
    fn kind(&self) -> TaskKind {
        self.node.kind
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn options(&self) -> TaskOptions {
        self.node.options()
    }

    fn is_composite(&self) -> bool {
        self.node.is_composite()
    }

    fn build_children(&mut self, _ctx: &mut SimContext) -> Result<Vec<Box<dyn Task<SimContext>>>> {
        Ok(self.node.children.iter().cloned().map(ScriptedTask::boxed).collect())
    }

    fn should_ignore(&mut self, _ctx: &mut SimContext) -> Result<bool> {
        Ok(self.node.ignore)
    }

    fn execute(&mut self, ctx: &mut SimContext) -> Result<()> {
        if let Some(message) = &self.node.fail_execute {
            ctx.record(&self.name, "execute failed");
            eyre::bail!("{}", message);
        }
        ctx.record(&self.name, "execute");
        if let Some(key) = &self.node.holds_key {
            ctx.key_down(&self.name, key);
        }
        Ok(())
    }

    fn did(&mut self, _ctx: &mut SimContext) -> Result<bool> {
        if self.node.stuck {
            return Ok(false);
        }
        self.did_polls += 1;
        Ok(self.did_polls > self.node.succeed_after_polls)
    }

    fn should_restart(&mut self, _ctx: &mut SimContext) -> Result<bool> {
        if self.restarts >= self.node.restart_when_retries_below {
            return Ok(false);
        }
        self.restart_polls += 1;
        Ok(self.restart_polls >= self.node.restart_after_polls)
    }

    fn should_manually_complete(&mut self, _ctx: &mut SimContext) -> Result<bool> {
        self.confirm_polls += 1;
        Ok(self.confirm_polls > self.node.confirm_after_ticks)
    }

    fn should_restart_after_all_children_complete(&mut self, _ctx: &mut SimContext) -> Result<bool> {
        if self.passes < self.node.loops {
            self.passes += 1;
            return Ok(true);
        }
        Ok(false)
    }

    fn on_before_start(&mut self, ctx: &mut SimContext) -> Result<()> {
        self.did_polls = 0;
        self.confirm_polls = 0;
        self.restart_polls = 0;
        ctx.record(&self.name, "before_start");
        Ok(())
    }

    fn on_before_restart(&mut self, ctx: &mut SimContext) -> Result<()> {
        self.restarts += 1;
        self.release_key(ctx);
        ctx.record(&self.name, "restart");
        Ok(())
    }

    fn on_ignored(&mut self, ctx: &mut SimContext) -> Result<()> {
        ctx.record(&self.name, "ignored");
        Ok(())
    }

    fn on_interrupt(&mut self, ctx: &mut SimContext) -> Result<()> {
        self.release_key(ctx);
        ctx.record(&self.name, "interrupt");
        Ok(())
    }

    fn on_complete(&mut self, ctx: &mut SimContext) -> Result<()> {
        self.release_key(ctx);
        ctx.record(&self.name, "complete");
        Ok(())
    }

    fn on_timeout(&mut self, ctx: &mut SimContext) -> Result<()> {
        ctx.record(&self.name, "timeout");
        Ok(())
    }
}
