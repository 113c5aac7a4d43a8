//! Simulated context: held keys and an event journal.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::config::{ConfigResolver, TaskContext};

/// One recorded hook call or side effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimEvent {
    pub tick: u64,
    pub task: String,
    pub event: String,
}

/// Context handed to scripted tasks.
///
/// Keys pressed with [`SimContext::key_down`] stay held until a matching
/// [`SimContext::key_up`], the simulated version of an input resource that
/// leaks if a task exits without releasing it.
#[derive(Debug, Clone)]
pub struct SimContext {
    resolver: ConfigResolver,
    held_keys: BTreeSet<String>,
    tick: u64,
    journal: Vec<SimEvent>,
}

impl SimContext {
    pub fn new(resolver: ConfigResolver) -> Self {
        Self {
            resolver,
            held_keys: BTreeSet::new(),
            tick: 0,
            journal: Vec::new(),
        }
    }

    /// Current tick, as last announced by the orchestrator.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Append an event stamped with the current tick.
    pub fn record(&mut self, task: &str, event: impl Into<String>) {
        let event = event.into();
        log::debug!("[tick {}] {}: {}", self.tick, task, event);
        self.journal.push(SimEvent {
            tick: self.tick,
            task: task.to_string(),
            event,
        });
    }

    pub fn journal(&self) -> &[SimEvent] {
        &self.journal
    }

    /// Events recorded for `task`, in order.
    pub fn events_for(&self, task: &str) -> Vec<&str> {
        self.journal
            .iter()
            .filter(|e| e.task == task)
            .map(|e| e.event.as_str())
            .collect()
    }

    /// Press and hold `key`. Returns false if it was already held.
    pub fn key_down(&mut self, task: &str, key: &str) -> bool {
        let pressed = self.held_keys.insert(key.to_string());
        if pressed {
            self.record(task, format!("key_down {}", key));
        }
        pressed
    }

    /// Release `key`. Returns false if it was not held.
    pub fn key_up(&mut self, task: &str, key: &str) -> bool {
        let released = self.held_keys.remove(key);
        if released {
            self.record(task, format!("key_up {}", key));
        }
        released
    }

    pub fn held_keys(&self) -> Vec<&str> {
        self.held_keys.iter().map(String::as_str).collect()
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held_keys.contains(key)
    }
}

impl Default for SimContext {
    fn default() -> Self {
        Self::new(ConfigResolver::default())
    }
}

impl TaskContext for SimContext {
    fn resolver(&self) -> &ConfigResolver {
        &self.resolver
    }

    fn begin_tick(&mut self, tick: u64) {
        self.tick = tick;
    }
}
