//! Per-kind task overrides.
//!
//! Operators retune timeouts and delays for a whole kind of task without
//! rebuilding the tree. Values are read through the resolver at each
//! activation, so the environment can override the file as well.

use serde::{Deserialize, Serialize};

/// Tunables for one task kind. Unset fields keep the task's own values.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TaskOverrides {
    /// Timeout in seconds; `<= 0` disables the timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<f64>,

    /// Delay before the first `execute`, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_before_start_secs: Option<f64>,

    /// Delay between internal completion and finishing, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_after_complete_secs: Option<f64>,
}

impl TaskOverrides {
    /// Create empty overrides.
    pub fn none() -> Self {
        Self::default()
    }

    /// Check if any overrides are set.
    pub fn is_empty(&self) -> bool {
        self.timeout_secs.is_none() && self.delay_before_start_secs.is_none() && self.delay_after_complete_secs.is_none()
    }

    /// Create overrides with just a timeout.
    pub fn with_timeout_secs(secs: f64) -> Self {
        Self {
            timeout_secs: Some(secs),
            ..Default::default()
        }
    }

    /// Reject negative delays; negative timeouts are allowed and mean "never".
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("delay-before-start-secs", self.delay_before_start_secs),
            ("delay-after-complete-secs", self.delay_after_complete_secs),
        ] {
            if let Some(v) = value
                && (v < 0.0 || !v.is_finite())
            {
                return Err(format!("{} must be a finite value >= 0, got {}", field, v));
            }
        }
        Ok(())
    }
}
