//! Task contract and tree building blocks.
//!
//! - `Task`: the hook contract a task body implements
//! - `TaskKind`: closed set of kind tags
//! - `TaskOptions`: delays, timeout and termination flags
//! - `TaskState`: per-node lifecycle bookkeeping
//! - `TaskNode`: a task attached to a tree, owning its children
//! - `Sequence`: the stock composite

pub mod contract;
pub mod kind;
pub mod node;
pub mod options;
pub mod sequence;
pub mod state;

pub use contract::{Hook, Task};
pub use kind::TaskKind;
pub use node::TaskNode;
pub use options::TaskOptions;
pub use sequence::Sequence;
pub use state::{StatusReason, TaskState, TaskStatus};
