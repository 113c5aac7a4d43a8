//! Scenario files.
//!
//! A scenario describes a scripted task tree in YAML:
//!
//! ```yaml
//! name: bank-run
//! max-ticks: 200
//! root:
//!   kind: sequence
//!   name: trip
//!   timeout: 30
//!   children:
//!     - kind: walk
//!       name: to-bank
//!       holds-key: w
//!       succeed-after-polls: 3
//!     - kind: deposit
//!       manually-terminable: true
//!       confirm-after-ticks: 2
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskTreeError};
use crate::task::{TaskKind, TaskOptions};

/// A named task tree.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Scenario {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Tick cap used when the caller does not give one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_ticks: Option<u64>,

    pub root: ScenarioNode,
}

/// One scripted task. Nodes with children are composites.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ScenarioNode {
    pub kind: TaskKind,

    /// Display name; defaults to the kind.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Seconds to wait after activation before executing.
    pub delay_before_start: f64,

    /// Seconds to wait after `did` before finishing.
    pub delay_after_complete: f64,

    /// Seconds before timing out; `0` never times out.
    pub timeout: f64,

    pub terminable: bool,
    pub manually_terminable: bool,
    pub timeout_tree: bool,

    /// Skip through `should_ignore`.
    pub ignore: bool,

    /// `did` polls answered false before the first true.
    pub succeed_after_polls: u32,

    /// `did` never answers true.
    pub stuck: bool,

    /// Key held down from `execute` until the task ends.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holds_key: Option<String>,

    /// `should_manually_complete` polls answered false before confirming.
    pub confirm_after_ticks: u32,

    /// Ask for a restart while fewer than this many restarts happened.
    pub restart_when_retries_below: u32,

    /// `should_restart` polls per attempt before a restart is requested.
    pub restart_after_polls: u32,

    /// Extra passes over the children after the first.
    #[serde(rename = "loop")]
    pub loops: u32,

    /// Fail `execute` with this message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_execute: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ScenarioNode>,
}

impl Default for ScenarioNode {
    fn default() -> Self {
        Self {
            kind: TaskKind::Noop,
            name: None,
            delay_before_start: 0.0,
            delay_after_complete: 0.0,
            timeout: 0.0,
            terminable: true,
            manually_terminable: false,
            timeout_tree: false,
            ignore: false,
            succeed_after_polls: 0,
            stuck: false,
            holds_key: None,
            confirm_after_ticks: 0,
            restart_when_retries_below: 0,
            restart_after_polls: 1,
            loops: 0,
            fail_execute: None,
            children: Vec::new(),
        }
    }
}

impl ScenarioNode {
    /// A node of `kind` with default settings.
    pub fn new(kind: TaskKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Set the display name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the children.
    pub fn with_children(mut self, children: Vec<ScenarioNode>) -> Self {
        self.children = children;
        self
    }

    /// Display name.
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.kind.to_string())
    }

    /// Composites run their children instead of scripted polls.
    pub fn is_composite(&self) -> bool {
        self.kind == TaskKind::Sequence || !self.children.is_empty()
    }

    /// Scheduling options for this node.
    pub fn options(&self) -> TaskOptions {
        let mut options = TaskOptions::default()
            .with_delay_before_start(secs(self.delay_before_start))
            .with_delay_after_complete(secs(self.delay_after_complete))
            .with_timeout_secs(self.timeout);
        options.terminable = self.terminable;
        options.manually_terminable = self.manually_terminable;
        options.timeout_tree = self.timeout_tree;
        options
    }

    fn check(&self, at: &str) -> Result<()> {
        let fail = |msg: String| Err(TaskTreeError::Scenario(format!("{}: {}", at, msg)));

        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return fail("name cannot be empty".to_string());
        }
        for (field, value) in [
            ("delay-before-start", self.delay_before_start),
            ("delay-after-complete", self.delay_after_complete),
            ("timeout", self.timeout),
        ] {
            if !value.is_finite() || value < 0.0 {
                return fail(format!("{} must be a non-negative number, got {}", field, value));
            }
            if std::time::Duration::try_from_secs_f64(value).is_err() {
                return fail(format!("{} is out of range, got {}", field, value));
            }
        }
        if self.holds_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            return fail("holds-key cannot be empty".to_string());
        }
        if self.is_composite() {
            if self.holds_key.is_some() {
                return fail("composites cannot hold keys".to_string());
            }
            if self.stuck || self.succeed_after_polls > 0 {
                return fail("composites complete through their children".to_string());
            }
        } else if self.loops > 0 {
            return fail("loop needs children".to_string());
        }
        if self.confirm_after_ticks > 0 && !self.manually_terminable {
            return fail("confirm-after-ticks needs manually-terminable".to_string());
        }
        if !self.terminable && self.timeout == 0.0 {
            log::warn!("{}: non-terminable task without a timeout only ends by interrupt", at);
        }
        Ok(())
    }
}

impl Scenario {
    /// Load and validate a scenario file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let scenario = Self::parse(&content)?;
        log::info!("Loaded scenario {} from {}", scenario.name, path.as_ref().display());
        Ok(scenario)
    }

    /// Parse and validate scenario YAML.
    pub fn parse(content: &str) -> Result<Self> {
        let scenario: Self = serde_yaml::from_str(content)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Check names and numeric ranges over the whole tree.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(TaskTreeError::Scenario("name cannot be empty".to_string()));
        }
        if self.max_ticks == Some(0) {
            return Err(TaskTreeError::Scenario("max-ticks must be > 0".to_string()));
        }

        let mut stack = vec![(&self.root, self.root.display_name())];
        while let Some((node, at)) = stack.pop() {
            node.check(&at)?;
            for (index, child) in node.children.iter().enumerate() {
                stack.push((child, format!("{}/{}[{}]", at, child.display_name(), index)));
            }
        }
        Ok(())
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}

fn secs(value: f64) -> std::time::Duration {
    if value.is_finite() && value > 0.0 {
        std::time::Duration::try_from_secs_f64(value).unwrap_or(std::time::Duration::MAX)
    } else {
        std::time::Duration::ZERO
    }
}
