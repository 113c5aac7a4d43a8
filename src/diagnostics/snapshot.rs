//! Serializable views of a task tree.

use std::fmt::Write;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TaskContext;
use crate::task::{StatusReason, TaskKind, TaskNode, TaskStatus};

/// One node of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: u64,
    pub name: String,
    pub kind: TaskKind,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<StatusReason>,
    pub retry_count: u32,
    pub current_task_index: usize,
    /// On the path from the root to the active leaf.
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSnapshot>,
}

/// The whole tree at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub captured_at: DateTime<Utc>,
    pub tick: u64,
    /// What caused the capture, e.g. `timeout walk#4`.
    pub trigger: String,
    pub root: NodeSnapshot,
}

impl TreeSnapshot {
    /// Capture `root` as seen at `now`.
    pub fn capture<C: TaskContext>(root: &TaskNode<C>, now: Instant, tick: u64, trigger: impl Into<String>) -> Self {
        Self {
            captured_at: Utc::now(),
            tick,
            trigger: trigger.into(),
            root: NodeSnapshot::capture(root, now, true),
        }
    }

    /// Indented text rendering, one node per line; `>` marks the active chain.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![(&self.root, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            let marker = if node.active { ">" } else { " " };
            let reason = node.reason.map(|r| format!(" ({})", r)).unwrap_or_default();
            let retries = if node.retry_count > 0 {
                format!(" retries={}", node.retry_count)
            } else {
                String::new()
            };
            let _ = writeln!(
                out,
                "{}{} {} [{}] {}{}{}",
                marker,
                "  ".repeat(depth),
                node.name,
                node.kind,
                node.status,
                reason,
                retries
            );
            for child in node.children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        out
    }

    /// Names along the active chain, root first.
    pub fn active_chain(&self) -> Vec<&str> {
        let mut chain = Vec::new();
        let mut node = Some(&self.root);
        while let Some(current) = node.filter(|n| n.active) {
            chain.push(current.name.as_str());
            node = current.children.iter().find(|c| c.active);
        }
        chain
    }
}

impl NodeSnapshot {
    fn capture<C: TaskContext>(node: &TaskNode<C>, now: Instant, active: bool) -> Self {
        let children = node
            .children()
            .iter()
            .enumerate()
            .map(|(index, child)| Self::capture(child, now, active && index == node.current_task_index()))
            .collect();
        let state = node.state();
        Self {
            id: node.id(),
            name: node.name().to_string(),
            kind: node.kind(),
            status: state.status,
            reason: state.reason,
            retry_count: state.retry_count,
            current_task_index: node.current_task_index(),
            active: active && !state.status.is_terminal(),
            elapsed_ms: state.elapsed(now).map(|d| d.as_millis() as u64),
            children,
        }
    }
}
