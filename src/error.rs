//! Error types for tasktree
//!
//! Centralized error handling using thiserror. Task hooks return
//! `eyre::Result`; the scheduler wraps their failures in
//! [`TaskTreeError::Hook`] so callers know which node and hook failed.

use thiserror::Error;

use crate::task::Hook;

/// All error types that can occur in tasktree
#[derive(Debug, Error)]
pub enum TaskTreeError {
    /// A task hook returned an error
    #[error("Hook {hook} failed on {task}: {report}")]
    Hook {
        /// Display label of the failing node (`name#id`)
        task: String,
        /// Node id, stable for the lifetime of the tree
        task_id: u64,
        /// Which hook failed
        hook: Hook,
        /// The error returned by the hook body
        report: eyre::Report,
    },

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Invalid scenario definition
    #[error("Scenario error: {0}")]
    Scenario(String),

    /// Diagnostic sink failure
    #[error("Diagnostics error: {0}")]
    Diagnostics(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl TaskTreeError {
    /// Id of the node whose hook failed, if this is a hook error.
    pub fn task_id(&self) -> Option<u64> {
        match self {
            TaskTreeError::Hook { task_id, .. } => Some(*task_id),
            _ => None,
        }
    }
}

/// Result type alias for tasktree operations
pub type Result<T> = std::result::Result<T, TaskTreeError>;
