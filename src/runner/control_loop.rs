//! Control loop - ticks the orchestrator at a fixed cadence.
//!
//! The loop owns the context through `&mut` for its whole run, so there is
//! exactly one writer. Other tasks talk to it through a [`StopHandle`].

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::config::{SchedulerConfig, TaskContext};
use crate::diagnostics::TreeSnapshot;
use crate::orchestrator::{Orchestrator, TickOutcome, TickStats};

/// Configuration for the control loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopConfig {
    /// Interval between ticks
    pub tick_interval: Duration,
    /// Stop after this many ticks
    pub max_ticks: Option<u64>,
    /// Stop once the tree has finished
    pub stop_when_finished: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self::from(&SchedulerConfig::default())
    }
}

impl From<&SchedulerConfig> for LoopConfig {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            tick_interval: config.tick_interval(),
            max_ticks: None,
            stop_when_finished: config.stop_when_finished,
        }
    }
}

impl LoopConfig {
    /// Set the tick cap
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    /// Set the tick interval
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }
}

/// Why the loop exited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The tree finished (or there was none)
    Finished,
    /// The tick cap was reached
    MaxTicks,
    /// A stop was requested through a [`StopHandle`]
    Requested,
}

/// What a run did
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSummary {
    pub reason: StopReason,
    /// Ticks run by this loop
    pub ticks: u64,
    /// Ticks that returned an error
    pub errors: u64,
    /// Result of the last successful tick
    pub last_outcome: Option<TickOutcome>,
    /// Orchestrator counters at exit
    pub stats: TickStats,
    /// The tree as it stood when the loop stopped, before it was cleared
    pub final_tree: Option<TreeSnapshot>,
}

/// Requests a running loop to stop. Cheap to clone and `Send`.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    /// Ask the loop to stop before its next tick
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Drives an [`Orchestrator`] until finished, capped or stopped.
pub struct ControlLoop<C: TaskContext> {
    orchestrator: Orchestrator<C>,
    config: LoopConfig,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl<C: TaskContext> ControlLoop<C> {
    /// Create a new control loop
    pub fn new(orchestrator: Orchestrator<C>, config: LoopConfig) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            orchestrator,
            config,
            stop_tx: Arc::new(stop_tx),
            stop_rx,
        }
    }

    /// Handle for stopping the loop from elsewhere
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: self.stop_tx.clone(),
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator<C> {
        &self.orchestrator
    }

    pub fn orchestrator_mut(&mut self) -> &mut Orchestrator<C> {
        &mut self.orchestrator
    }

    /// Consume the loop, returning the orchestrator
    pub fn into_orchestrator(self) -> Orchestrator<C> {
        self.orchestrator
    }

    /// Run until the tree finishes, the tick cap is hit or a stop arrives.
    ///
    /// Tick errors are logged and counted and the loop carries on with the
    /// tree as it stands. On exit the tree is cleared, which interrupts the
    /// active chain so held resources get released.
    pub async fn run(&mut self, ctx: &mut C) -> LoopSummary {
        let mut interval = tokio::time::interval(self.config.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut stop_rx = self.stop_rx.clone();

        info!(
            "Control loop starting: interval={:?}, max_ticks={:?}",
            self.config.tick_interval, self.config.max_ticks
        );

        let mut ticks = 0u64;
        let mut errors = 0u64;
        let mut last_outcome = None;

        let reason = loop {
            if *stop_rx.borrow() {
                break StopReason::Requested;
            }
            if let Some(max) = self.config.max_ticks
                && ticks >= max
            {
                break StopReason::MaxTicks;
            }

            tokio::select! {
                _ = interval.tick() => {}
                _ = stop_rx.changed() => continue,
            }

            ticks += 1;
            match self.orchestrator.tick(ctx) {
                Ok(outcome) => {
                    debug!("Tick {}: {:?}", ticks, outcome);
                    last_outcome = Some(outcome);
                    if outcome.is_finished() && self.config.stop_when_finished {
                        break StopReason::Finished;
                    }
                }
                Err(e) => {
                    errors += 1;
                    warn!("Tick {} failed: {}", ticks, e);
                }
            }
        };

        let final_tree = self.orchestrator.snapshot(format!("{:?}", reason).to_lowercase());
        if let Err(e) = self.orchestrator.clear(ctx) {
            warn!("Interrupt on shutdown failed: {}", e);
        }
        info!("Control loop stopped ({:?}) after {} tick(s), {} error(s)", reason, ticks, errors);

        LoopSummary {
            reason,
            ticks,
            errors,
            last_outcome,
            stats: self.orchestrator.stats().clone(),
            final_tree,
        }
    }
}
