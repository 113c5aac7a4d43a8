//! Settings file.
//!
//! Loaded from .tasktree.yml or ~/.config/tasktree/tasktree.yml

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{SchedulerConfig, TaskOverrides};
use crate::error::TaskTreeError;
use crate::task::TaskKind;

/// Top-level configuration for tasktree.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    /// Log filter handed to env_logger when RUST_LOG is unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Scheduler cadence and policies.
    pub scheduler: SchedulerConfig,

    /// Timeout snapshot settings.
    pub diagnostics: DiagnosticsConfig,

    /// Per-kind task overrides.
    pub tasks: BTreeMap<TaskKind, TaskOverrides>,
}

impl Settings {
    /// Load configuration with fallback chain.
    ///
    /// Search order:
    /// 1. Explicit path if provided
    /// 2. .tasktree.yml in current directory
    /// 3. ~/.config/tasktree/tasktree.yml
    /// 4. Defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let project_config = PathBuf::from(".tasktree.yml");
        if project_config.exists() {
            match Self::load_from_file(&project_config) {
                Ok(config) => {
                    log::info!("Loaded config from .tasktree.yml");
                    return Ok(config);
                }
                Err(e) => {
                    log::warn!("Failed to load .tasktree.yml: {}", e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("tasktree").join("tasktree.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", user_config.display());
                        return Ok(config);
                    }
                    Err(e) => {
                        log::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Parse and validate a settings file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.scheduler.tick_interval_ms == 0 {
            return Err(TaskTreeError::Config("scheduler.tick-interval-ms must be > 0".to_string()));
        }
        for (kind, overrides) in &self.tasks {
            overrides
                .validate()
                .map_err(|e| TaskTreeError::Config(format!("tasks.{}: {}", kind, e)))?;
        }
        Ok(())
    }

    /// Overrides configured for a kind, if any.
    pub fn overrides_for(&self, kind: TaskKind) -> Option<&TaskOverrides> {
        self.tasks.get(&kind)
    }
}

/// Timeout snapshot settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DiagnosticsConfig {
    /// Write a snapshot of the tree whenever a task times out.
    pub enabled: bool,

    /// Directory holding `snapshots.jsonl`.
    pub dir: PathBuf,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("tasktree")
                .join("diagnostics"),
        }
    }
}
