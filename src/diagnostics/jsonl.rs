//! JSONL snapshot sink.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{DiagnosticSink, TreeSnapshot};
use crate::error::Result;

/// Appends one JSON line per snapshot to `<dir>/snapshots.jsonl`.
pub struct JsonlDiagnostics {
    path: PathBuf,
}

impl JsonlDiagnostics {
    /// Create the sink, creating `dir` if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join("snapshots.jsonl"),
        })
    }

    /// File the snapshots go to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DiagnosticSink for JsonlDiagnostics {
    fn capture(&mut self, snapshot: &TreeSnapshot) -> Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", serde_json::to_string(snapshot)?)?;
        Ok(())
    }
}
