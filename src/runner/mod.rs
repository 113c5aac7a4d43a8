//! Runner module - the control loop around the orchestrator.
//!
//! This module provides:
//! - ControlLoop for ticking an orchestrator on a tokio interval
//! - StopHandle for stopping it from another task
//! - LoopSummary for reporting how a run ended

mod control_loop;

pub use control_loop::{ControlLoop, LoopConfig, LoopSummary, StopHandle, StopReason};
