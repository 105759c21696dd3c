// src/task/mod.rs

//! Sub-tasks of a task node.
//!
//! A task node's work is an ordered list of [`Task`]s. Before execution the
//! list goes through a merge pass ([`merge_tasks`]): each task may absorb
//! the tasks immediately following it (e.g. consecutive shell invocations
//! folded into one). Merging is an optimization only; a merged task must
//! produce the same staged artifacts, in the same relative order, as the
//! unmerged sequence would.

use std::any::Any;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;
use crate::graph::{NodeName, TaskSpec};

pub mod command;

pub use command::CommandTask;

/// Outcome of one sub-task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// Human-readable cause; becomes the node's failure message.
    Failed(String),
}

/// Per-execution staging area handed to each task in sequence.
///
/// Staged bytes are only published after the whole task list succeeds;
/// anything staged before a failure is discarded with the context.
#[derive(Debug)]
pub struct TaskContext {
    node: NodeName,
    staged: BTreeMap<String, Vec<u8>>,
}

impl TaskContext {
    pub fn new(node: &str) -> Self {
        Self {
            node: node.to_string(),
            staged: BTreeMap::new(),
        }
    }

    /// Name of the node this execution belongs to.
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Stage bytes under a logical artifact name. Later stages of the same
    /// name overwrite earlier ones.
    pub fn stage(&mut self, logical_name: &str, bytes: Vec<u8>) {
        self.staged.insert(logical_name.to_string(), bytes);
    }

    pub fn staged(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.staged
    }

    pub(crate) fn take_staged(&mut self) -> BTreeMap<String, Vec<u8>> {
        std::mem::take(&mut self.staged)
    }
}

/// One unit of work inside a task node.
///
/// Implementations outside this crate attach via
/// [`BuildGraph::install_tasks`](crate::graph::BuildGraph::install_tasks);
/// the bundled implementation is [`CommandTask`].
pub trait Task: Send + Sync {
    /// Short human-readable description, used in logs and failure messages.
    fn describe(&self) -> String;

    /// Perform the work, staging any produced artifacts into `ctx`.
    ///
    /// `Ok(TaskOutcome::Failed(_))` is a work failure (the node fails with
    /// that cause); `Err(_)` is an engine-level fault and is treated the
    /// same way by the caller.
    fn execute<'a>(
        &'a mut self,
        ctx: &'a mut TaskContext,
    ) -> Pin<Box<dyn Future<Output = Result<TaskOutcome>> + Send + 'a>>;

    /// Attempt to absorb the immediately following task, returning `true`
    /// if it was consumed. Implementations typically downcast `next` via
    /// [`Task::as_any`] and only merge with their own kind.
    fn try_merge(&mut self, next: &dyn Task) -> bool {
        let _ = next;
        false
    }

    fn as_any(&self) -> &dyn Any;
}

/// Merge pass over an ordered task list.
///
/// Walks the list once, letting each surviving task absorb its successors
/// while [`Task::try_merge`] keeps accepting them.
pub fn merge_tasks(tasks: Vec<Box<dyn Task>>) -> Vec<Box<dyn Task>> {
    let mut merged: Vec<Box<dyn Task>> = Vec::with_capacity(tasks.len());

    for task in tasks {
        let absorbed = match merged.last_mut() {
            Some(prev) => prev.try_merge(task.as_ref()),
            None => false,
        };
        if !absorbed {
            merged.push(task);
        }
    }

    merged
}

/// Lower a declarative [`TaskSpec`] into a runnable task.
pub(crate) fn build_task(spec: &TaskSpec) -> Box<dyn Task> {
    match spec {
        TaskSpec::Command { shell, script } => {
            Box::new(CommandTask::new(shell.clone(), script.clone()))
        }
    }
}
