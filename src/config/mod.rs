//! Configuration system for tasktree.
//!
//! Two layers:
//! 1. Settings file (.tasktree.yml or ~/.config/tasktree/tasktree.yml)
//! 2. Environment overrides, consulted by the resolver at task activation

use std::path::PathBuf;

use eyre::Result;

pub use self::overrides::TaskOverrides;
pub use self::resolution::{ConfigResolver, EnvSource};
pub use self::scheduler::{HookErrorPolicy, RestartScope, SchedulerConfig, TimeoutCascade};
pub use self::settings::{DiagnosticsConfig, Settings};

mod overrides;
mod resolution;
mod scheduler;
mod settings;

/// Prefix for every environment override.
pub const ENV_PREFIX: &str = "TASKTREE";

/// Load configuration from the standard search paths.
///
/// Search order:
/// 1. Explicit path if provided
/// 2. .tasktree.yml in current directory (project config)
/// 3. ~/.config/tasktree/tasktree.yml (user config)
/// 4. Default values
pub fn load_config(explicit_path: Option<&PathBuf>) -> Result<Settings> {
    Settings::load(explicit_path)
}

/// Opaque, externally owned state handed to every task hook.
///
/// The scheduler only needs a resolver for per-kind timeout overrides;
/// everything else in the context belongs to the task bodies. The
/// context is passed as `&mut` from a single driver, so there is exactly
/// one writer at a time.
pub trait TaskContext {
    /// Resolver for runtime configuration lookups.
    fn resolver(&self) -> &ConfigResolver;

    /// Called by the orchestrator at the start of every tick.
    fn begin_tick(&mut self, _tick: u64) {}
}

impl TaskContext for ConfigResolver {
    fn resolver(&self) -> &ConfigResolver {
        self
    }
}
