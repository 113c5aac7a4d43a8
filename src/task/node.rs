//! Tree nodes.
//!
//! A node owns its task, its lifecycle state and its children. Parents are
//! not referenced from children: the orchestrator addresses nodes by the
//! index path from the root, which doubles as the ancestor chain.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use super::{Hook, Task, TaskKind, TaskOptions, TaskState, TaskStatus};
use crate::config::TaskContext;
use crate::error::{Result, TaskTreeError};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// A task attached to a tree.
pub struct TaskNode<C: TaskContext> {
    id: u64,
    name: String,
    kind: TaskKind,
    task: Box<dyn Task<C>>,
    pub(crate) state: TaskState,
    pub(crate) children: Vec<TaskNode<C>>,
    pub(crate) cursor: usize,
}

impl<C: TaskContext> TaskNode<C> {
    /// Wrap a task created at `now`.
    pub fn new(task: Box<dyn Task<C>>, now: Instant) -> Self {
        let options = task.options();
        Self {
            id: NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed),
            name: task.name(),
            kind: task.kind(),
            task,
            state: TaskState::new(options, now),
            children: Vec::new(),
            cursor: 0,
        }
    }

    /// Unique id, never reused within a process.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// `name#id`, used in logs and errors.
    pub fn label(&self) -> String {
        format!("{}#{}", self.name, self.id)
    }

    pub fn state(&self) -> &TaskState {
        &self.state
    }

    pub fn status(&self) -> TaskStatus {
        self.state.status
    }

    pub fn options(&self) -> &TaskOptions {
        &self.state.options
    }

    pub fn retry_count(&self) -> u32 {
        self.state.retry_count
    }

    /// Index of the child currently being run.
    pub fn current_task_index(&self) -> usize {
        self.cursor
    }

    pub fn children(&self) -> &[TaskNode<C>] {
        &self.children
    }

    pub fn is_composite(&self) -> bool {
        self.task.is_composite()
    }

    /// Borrow the task body.
    pub fn task(&self) -> &dyn Task<C> {
        self.task.as_ref()
    }

    pub(crate) fn descendant(&self, path: &[usize]) -> &TaskNode<C> {
        path.iter().fold(self, |node, &index| &node.children[index])
    }

    pub(crate) fn descendant_mut(&mut self, path: &[usize]) -> &mut TaskNode<C> {
        let mut node = self;
        for &index in path {
            node = &mut node.children[index];
        }
        node
    }

    /// Path to the active leaf, following cursors without activating anything.
    pub fn active_path(&self) -> Vec<usize> {
        let mut path = Vec::new();
        let mut node = self;
        while node.cursor < node.children.len() {
            path.push(node.cursor);
            node = &node.children[node.cursor];
        }
        path
    }

    /// Index path to the node with `id`, if it is in this subtree.
    pub fn path_to(&self, id: u64) -> Option<Vec<usize>> {
        let mut stack = vec![(self, Vec::new())];
        while let Some((node, path)) = stack.pop() {
            if node.id == id {
                return Some(path);
            }
            for (index, child) in node.children.iter().enumerate() {
                let mut child_path = path.clone();
                child_path.push(index);
                stack.push((child, child_path));
            }
        }
        None
    }

    /// First node named `name`, depth first.
    pub fn find(&self, name: &str) -> Option<&TaskNode<C>> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.name == name {
                return Some(node);
            }
            stack.extend(node.children.iter().rev());
        }
        None
    }

    /// Run a hook against the task body, tagging failures with this node.
    pub(crate) fn hook<T>(
        &mut self,
        hook: Hook,
        f: impl FnOnce(&mut (dyn Task<C> + 'static)) -> eyre::Result<T>,
    ) -> Result<T> {
        f(self.task.as_mut()).map_err(|report| TaskTreeError::Hook {
            task: self.label(),
            task_id: self.id,
            hook,
            report,
        })
    }

    pub(crate) fn apply_runtime_config(&mut self, ctx: &mut C) -> Result<()> {
        let Self { task, state, .. } = self;
        let outcome = task.apply_runtime_config(ctx, &mut state.options);
        outcome.map_err(|report| TaskTreeError::Hook {
            task: self.label(),
            task_id: self.id,
            hook: Hook::ApplyRuntimeConfig,
            report,
        })
    }

    /// Replace the children with freshly built ones.
    pub(crate) fn rebuild_children(&mut self, ctx: &mut C, now: Instant) -> Result<()> {
        let tasks = self.hook(Hook::BuildChildren, |task| task.build_children(ctx))?;
        self.children = tasks.into_iter().map(|task| TaskNode::new(task, now)).collect();
        self.cursor = 0;
        Ok(())
    }
}

impl<C: TaskContext> std::fmt::Debug for TaskNode<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskNode")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("status", &self.state.status)
            .field("cursor", &self.cursor)
            .field("children", &self.children)
            .finish()
    }
}
