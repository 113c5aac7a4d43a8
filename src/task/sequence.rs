//! Sequential composite task.

use eyre::Result;

use super::{Task, TaskKind, TaskOptions};
use crate::config::TaskContext;

type ChildFactory<C> = Box<dyn FnMut(&mut C) -> Vec<Box<dyn Task<C>>>>;

/// Runs its children one after another.
///
/// Children come from a factory so every activation (and every restart)
/// gets a fresh list built from the current context. A looping sequence
/// starts over from the first child instead of finishing.
pub struct Sequence<C> {
    kind: TaskKind,
    name: String,
    options: TaskOptions,
    looping: bool,
    factory: ChildFactory<C>,
}

impl<C: TaskContext> Sequence<C> {
    /// A sequence whose children are rebuilt by `factory` on each activation.
    pub fn new(name: impl Into<String>, factory: impl FnMut(&mut C) -> Vec<Box<dyn Task<C>>> + 'static) -> Self {
        Self {
            kind: TaskKind::Sequence,
            name: name.into(),
            options: TaskOptions::default(),
            looping: false,
            factory: Box::new(factory),
        }
    }

    /// Override the kind tag, e.g. a `deposit` that is made of steps.
    pub fn with_kind(mut self, kind: TaskKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_options(mut self, options: TaskOptions) -> Self {
        self.options = options;
        self
    }

    /// Start over after the last child instead of finishing.
    pub fn looping(mut self) -> Self {
        self.looping = true;
        self
    }
}

impl<C: TaskContext> Task<C> for Sequence<C> {
    fn kind(&self) -> TaskKind {
        self.kind
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn options(&self) -> TaskOptions {
        self.options
    }

    fn is_composite(&self) -> bool {
        true
    }

    fn build_children(&mut self, ctx: &mut C) -> Result<Vec<Box<dyn Task<C>>>> {
        Ok((self.factory)(ctx))
    }

    fn should_restart_after_all_children_complete(&mut self, _ctx: &mut C) -> Result<bool> {
        Ok(self.looping)
    }
}
