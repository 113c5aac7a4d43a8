//! Best-effort postmortem capture.
//!
//! The orchestrator hands a [`TreeSnapshot`] to the configured
//! [`DiagnosticSink`] whenever a task times out. Sink failures are logged
//! and discarded; they never reach the caller of `tick`.

pub mod jsonl;
pub mod snapshot;

pub use jsonl::JsonlDiagnostics;
pub use snapshot::{NodeSnapshot, TreeSnapshot};

use std::sync::{Arc, Mutex};

use crate::error::{Result, TaskTreeError};

/// Side channel for tree snapshots.
pub trait DiagnosticSink {
    /// Persist a snapshot. Must not block for long.
    fn capture(&mut self, snapshot: &TreeSnapshot) -> Result<()>;
}

/// Keeps snapshots in memory. Clones share the same buffer, so a caller
/// can keep a handle after giving the sink to an orchestrator.
#[derive(Debug, Clone, Default)]
pub struct MemoryDiagnostics {
    snapshots: Arc<Mutex<Vec<TreeSnapshot>>>,
}

impl MemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots captured so far.
    pub fn snapshots(&self) -> Vec<TreeSnapshot> {
        self.snapshots.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl DiagnosticSink for MemoryDiagnostics {
    fn capture(&mut self, snapshot: &TreeSnapshot) -> Result<()> {
        self.snapshots
            .lock()
            .map_err(|e| TaskTreeError::Diagnostics(e.to_string()))?
            .push(snapshot.clone());
        Ok(())
    }
}
