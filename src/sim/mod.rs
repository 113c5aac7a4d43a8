//! Scripted simulation domain.
//!
//! This module provides:
//! - Scenario for describing a task tree in YAML
//! - SimContext for simulated held keys and an event journal
//! - ScriptedTask for playing a scenario node against the scheduler
//! - Simulation for running a scenario on virtual time

mod context;
mod scenario;
mod scripted;

pub use context::{SimContext, SimEvent};
pub use scenario::{Scenario, ScenarioNode};
pub use scripted::ScriptedTask;

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use serde::Serialize;

use crate::clock::ManualClock;
use crate::config::{ConfigResolver, SchedulerConfig};
use crate::diagnostics::{DiagnosticSink, TreeSnapshot};
use crate::error::Result;
use crate::orchestrator::{Orchestrator, TickOutcome, TickStats};

/// How a simulated run ended.
#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    pub scenario: String,
    pub ticks: u64,
    pub errors: u64,
    pub outcome: Option<TickOutcome>,
    pub stats: TickStats,
    /// Keys still held after the tree was cleared; empty unless a task leaks.
    pub held_keys: Vec<String>,
    pub journal: Vec<SimEvent>,
    /// The tree as it stood when the run stopped, before it was cleared.
    pub final_tree: Option<TreeSnapshot>,
}

impl SimReport {
    /// True if the tree finished within the tick budget.
    pub fn finished(&self) -> bool {
        self.outcome.is_some_and(|o| o.is_finished())
    }
}

/// Runs a scenario on a [`ManualClock`], advancing it by a fixed step per
/// tick, so long delays and timeouts play out instantly.
pub struct Simulation {
    name: String,
    orchestrator: Orchestrator<SimContext>,
    ctx: SimContext,
    clock: ManualClock,
    step: Duration,
}

impl Simulation {
    /// Install the scenario's tree into a fresh orchestrator.
    pub fn new(scenario: &Scenario, config: SchedulerConfig, resolver: ConfigResolver) -> Result<Self> {
        let clock = ManualClock::new();
        let step = config.tick_interval();
        let mut orchestrator = Orchestrator::new(config).with_clock(Arc::new(clock.clone()));
        let mut ctx = SimContext::new(resolver);
        orchestrator.set_root_task(&mut ctx, Some(ScriptedTask::boxed(scenario.root.clone())))?;

        Ok(Self {
            name: scenario.name.clone(),
            orchestrator,
            ctx,
            clock,
            step,
        })
    }

    /// Capture timeout snapshots into `sink`.
    pub fn with_diagnostics(mut self, sink: Box<dyn DiagnosticSink>) -> Self {
        self.orchestrator = self.orchestrator.with_diagnostics(sink);
        self
    }

    pub fn ctx(&self) -> &SimContext {
        &self.ctx
    }

    pub fn orchestrator(&self) -> &Orchestrator<SimContext> {
        &self.orchestrator
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// One tick, then advance virtual time by one step.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        let outcome = self.orchestrator.tick(&mut self.ctx);
        self.clock.advance(self.step);
        outcome
    }

    /// Tick until the tree finishes or `max_ticks` is reached, then clear
    /// the tree. Tick errors are logged and counted.
    pub fn run(mut self, max_ticks: u64) -> SimReport {
        let mut ticks = 0;
        let mut errors = 0;
        let mut outcome = None;

        while ticks < max_ticks {
            ticks += 1;
            match self.tick() {
                Ok(o) => {
                    outcome = Some(o);
                    if o.is_finished() {
                        break;
                    }
                }
                Err(e) => {
                    errors += 1;
                    warn!("Tick {} failed: {}", ticks, e);
                }
            }
        }

        let trigger = if outcome.is_some_and(|o| o.is_finished()) { "finished" } else { "max_ticks" };
        let final_tree = self.orchestrator.snapshot(trigger);
        if let Err(e) = self.orchestrator.clear(&mut self.ctx) {
            warn!("Interrupt on shutdown failed: {}", e);
        }
        info!("Scenario {} ran {} tick(s) over {:?}", self.name, ticks, self.clock.elapsed());

        SimReport {
            scenario: self.name,
            ticks,
            errors,
            outcome,
            stats: self.orchestrator.stats().clone(),
            held_keys: self.ctx.held_keys().into_iter().map(String::from).collect(),
            journal: self.ctx.journal().to_vec(),
            final_tree,
        }
    }
}
