//! Tasktree - a cooperative, tick-driven hierarchical task scheduler
//!
//! A tree of stateful tasks is advanced one step per control-loop tick.
//! The orchestrator handles start delays, completion, timeouts and their
//! cascades, restarts, manual termination and interrupt propagation, so
//! task bodies only answer small, non-blocking hook calls.

pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod orchestrator;
pub mod runner;
pub mod sim;
pub mod task;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigResolver, SchedulerConfig, Settings, TaskContext};
pub use error::{Result, TaskTreeError};
pub use orchestrator::{Orchestrator, TickOutcome, TickStats};
pub use task::{Sequence, StatusReason, Task, TaskKind, TaskNode, TaskOptions, TaskStatus};
