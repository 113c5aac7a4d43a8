//! Orchestrator module - drives one task tree one step per tick.
//!
//! This module provides:
//! - Orchestrator for owning the active tree and advancing it
//! - TickOutcome for reporting what a tick did
//! - TickStats for counters kept across ticks
//!
//! The tick algorithm is split over `core` (descent, root guard, hook error
//! policy), `step` (hook checks and the leaf state machine) and `bubble`
//! (finishing, restarting and interrupting).

mod bubble;
pub mod core;
mod step;
pub mod tick;

pub use self::core::Orchestrator;
pub use self::tick::{TickOutcome, TickStats};
