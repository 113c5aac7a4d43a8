//! Runtime configuration resolution.
//!
//! Tasks look up their tunables at activation time through
//! [`ConfigResolver::resolve`]:
//! 1. Environment override (parsed as a YAML scalar)
//! 2. Dotted path in the settings tree
//! 3. Caller-supplied default

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_yaml::Value;

use super::Settings;

/// Where environment overrides come from.
#[derive(Debug, Clone, Default)]
pub enum EnvSource {
    /// The process environment.
    #[default]
    Process,
    /// A fixed map, used by tests and simulations.
    Fixed(HashMap<String, String>),
}

impl EnvSource {
    fn get(&self, name: &str) -> Option<String> {
        match self {
            EnvSource::Process => std::env::var(name).ok(),
            EnvSource::Fixed(vars) => vars.get(name).cloned(),
        }
    }
}

/// Resolves configuration values from env overrides and the settings tree.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    tree: Value,
    env: EnvSource,
}

impl ConfigResolver {
    /// Create a resolver over the given settings, reading the process environment.
    pub fn new(settings: &Settings) -> Self {
        let tree = serde_yaml::to_value(settings).unwrap_or_else(|e| {
            log::warn!("Failed to index settings for resolution: {}", e);
            Value::Null
        });
        Self {
            tree,
            env: EnvSource::Process,
        }
    }

    /// Create a resolver over raw YAML.
    pub fn from_value(tree: Value) -> Self {
        Self {
            tree,
            env: EnvSource::Process,
        }
    }

    /// Replace the environment source.
    pub fn with_env(mut self, env: EnvSource) -> Self {
        self.env = env;
        self
    }

    /// Resolve `path` (dot separated, e.g. `tasks.walk.timeout-secs`).
    ///
    /// `env_override` names an environment variable that wins over the
    /// settings tree. Values that fail to parse are logged and skipped.
    pub fn resolve<T: DeserializeOwned>(&self, path: &str, env_override: &str, default: T) -> T {
        if let Some(raw) = self.env.get(env_override) {
            match serde_yaml::from_str::<T>(&raw) {
                Ok(value) => return value,
                Err(e) => log::warn!("Ignoring {}={:?}: {}", env_override, raw, e),
            }
        }

        match self.lookup(path) {
            Some(Value::Null) | None => default,
            Some(value) => match serde_yaml::from_value::<T>(value.clone()) {
                Ok(value) => value,
                Err(e) => {
                    log::warn!("Ignoring config value at {}: {}", path, e);
                    default
                }
            },
        }
    }

    fn lookup(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(&self.tree, |node, segment| node.get(segment))
    }
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}
