//! Task kinds.
//!
//! A closed set: behavior that depends on what a task is asks a
//! capability question here instead of comparing names.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ENV_PREFIX;

/// Kind tag carried by every task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Ordered group of child tasks
    Sequence,
    /// Move toward a waypoint
    Walk,
    /// Engage a target
    Attack,
    /// Collect drops
    Loot,
    /// Restock supplies
    Refill,
    /// Store items
    Deposit,
    /// Use an inventory item
    UseItem,
    /// Single key press
    PressKey,
    /// Key held down until released
    HoldKey,
    /// Idle until a condition or delay passes
    Wait,
    /// Does nothing and completes
    Noop,
}

impl TaskKind {
    /// Every kind, in declaration order.
    pub const ALL: [TaskKind; 11] = [
        TaskKind::Sequence,
        TaskKind::Walk,
        TaskKind::Attack,
        TaskKind::Loot,
        TaskKind::Refill,
        TaskKind::Deposit,
        TaskKind::UseItem,
        TaskKind::PressKey,
        TaskKind::HoldKey,
        TaskKind::Wait,
        TaskKind::Noop,
    ];

    /// Stable lowercase identifier, also the key under `tasks:` in settings.
    pub fn config_key(&self) -> &'static str {
        match self {
            TaskKind::Sequence => "sequence",
            TaskKind::Walk => "walk",
            TaskKind::Attack => "attack",
            TaskKind::Loot => "loot",
            TaskKind::Refill => "refill",
            TaskKind::Deposit => "deposit",
            TaskKind::UseItem => "use_item",
            TaskKind::PressKey => "press_key",
            TaskKind::HoldKey => "hold_key",
            TaskKind::Wait => "wait",
            TaskKind::Noop => "noop",
        }
    }

    /// Upper-case stem for environment overrides, e.g. `TASKTREE_USE_ITEM`.
    pub fn env_prefix(&self) -> String {
        format!("{}_{}", ENV_PREFIX, self.config_key().to_uppercase())
    }

    /// Movement tasks.
    pub fn is_walk(&self) -> bool {
        matches!(self, TaskKind::Walk)
    }

    /// Tasks that interact with a target.
    pub fn is_combat(&self) -> bool {
        matches!(self, TaskKind::Attack | TaskKind::Loot)
    }

    /// Tasks that may leave input held down and must release it on exit.
    pub fn holds_input(&self) -> bool {
        matches!(self, TaskKind::Walk | TaskKind::HoldKey)
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_key())
    }
}
