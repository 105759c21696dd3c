// src/graph/node.rs

//! Runtime node instances and their state machine.

use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::errors::{ForgedagError, Result};
use crate::exchange::ArtifactRef;
use crate::task::Task;

use super::definition::{DefinitionKind, NodeDefinition};

/// Index of a node within its graph.
pub(crate) type NodeId = usize;

/// Execution state of a node instance.
///
/// `Completed` and `Failed` are terminal: once reached they are never
/// overwritten, which is what makes one-execution-per-node safe under
/// concurrent callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl NodeState {
    fn as_u8(self) -> u8 {
        match self {
            NodeState::Pending => 0,
            NodeState::Running => 1,
            NodeState::Completed => 2,
            NodeState::Failed => 3,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => NodeState::Pending,
            1 => NodeState::Running,
            2 => NodeState::Completed,
            _ => NodeState::Failed,
        }
    }
}

/// The runtime, mutable counterpart of a [`NodeDefinition`].
///
/// Created once per graph build by the resolver; dependency references are
/// resolved to graph indices. State transitions go through compare-and-set
/// so that the first writer wins and a second writer gets an
/// `InvalidTransition` error instead of silently clobbering a terminal
/// state.
pub struct NodeInstance {
    definition: NodeDefinition,

    pub(crate) input_deps: Vec<NodeId>,
    pub(crate) order_deps: Vec<NodeId>,
    /// Ordered, deduplicated chain of trigger nodes that transitively gate
    /// this node. Includes the node itself when it is a trigger.
    pub(crate) controlling_triggers: Vec<NodeId>,

    state: AtomicU8,
    /// Triggers only; monotonic.
    fired: AtomicBool,

    tasks: Mutex<Vec<Box<dyn Task>>>,
    artifacts: Mutex<Vec<ArtifactRef>>,
    failure: Mutex<Option<String>>,
}

impl fmt::Debug for NodeInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeInstance")
            .field("name", &self.definition.name)
            .field("state", &self.state())
            .field("fired", &self.fired.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl NodeInstance {
    /// Build an instance from a definition, lowering declared task specs
    /// into runnable tasks. Dependency indices are linked afterwards by the
    /// resolver.
    pub(crate) fn from_definition(definition: &NodeDefinition) -> Self {
        let tasks: Vec<Box<dyn Task>> = match &definition.kind {
            DefinitionKind::Task { tasks, .. } => {
                tasks.iter().map(crate::task::build_task).collect()
            }
            _ => Vec::new(),
        };

        Self {
            definition: definition.clone(),
            input_deps: Vec::new(),
            order_deps: Vec::new(),
            controlling_triggers: Vec::new(),
            state: AtomicU8::new(NodeState::Pending.as_u8()),
            fired: AtomicBool::new(false),
            tasks: Mutex::new(tasks),
            artifacts: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &NodeDefinition {
        &self.definition
    }

    pub fn is_trigger(&self) -> bool {
        self.definition.is_trigger()
    }

    pub fn is_aggregate(&self) -> bool {
        self.definition.is_aggregate()
    }

    pub fn state(&self) -> NodeState {
        NodeState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Whether this trigger has fired. Always false for non-triggers.
    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Artifacts recorded by a successful execution.
    pub fn artifacts(&self) -> Vec<ArtifactRef> {
        self.artifacts.lock().expect("artifact lock poisoned").clone()
    }

    /// Failure cause once the node is in the `Failed` terminal state.
    pub fn failure(&self) -> Option<String> {
        self.failure.lock().expect("failure lock poisoned").clone()
    }

    fn cas(&self, from: NodeState, to: NodeState) -> bool {
        self.state
            .compare_exchange(
                from.as_u8(),
                to.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Claim the node for execution (`Pending` → `Running`).
    pub(crate) fn try_start(&self) -> Result<()> {
        if self.cas(NodeState::Pending, NodeState::Running) {
            return Ok(());
        }
        Err(ForgedagError::InvalidTransition {
            node: self.definition.name.clone(),
            detail: format!("cannot start from state {:?}", self.state()),
        })
    }

    /// Terminal success transition (`Running` → `Completed`).
    pub(crate) fn mark_completed(&self) -> Result<()> {
        if self.cas(NodeState::Running, NodeState::Completed) {
            return Ok(());
        }
        Err(ForgedagError::InvalidTransition {
            node: self.definition.name.clone(),
            detail: format!("cannot complete from state {:?}", self.state()),
        })
    }

    /// Terminal failure transition, from `Running` (execution failure) or
    /// `Pending` (blocked by an upstream failure).
    pub(crate) fn mark_failed(&self, cause: String) -> Result<()> {
        if self.cas(NodeState::Running, NodeState::Failed)
            || self.cas(NodeState::Pending, NodeState::Failed)
        {
            *self.failure.lock().expect("failure lock poisoned") = Some(cause);
            return Ok(());
        }
        Err(ForgedagError::InvalidTransition {
            node: self.definition.name.clone(),
            detail: format!("cannot fail from state {:?}", self.state()),
        })
    }

    /// Fire a trigger. Returns `true` on the `Unfired` → `Fired` edge and
    /// `false` for every later call (idempotent). A fired trigger is by
    /// definition completed. Firing a blocked (failed) trigger is a no-op.
    pub(crate) fn fire(&self) -> bool {
        if self.state() == NodeState::Failed {
            return false;
        }
        let newly = !self.fired.swap(true, Ordering::SeqCst);
        if newly {
            // Triggers complete directly from Pending; they are never Running.
            self.cas(NodeState::Pending, NodeState::Completed);
        }
        newly
    }

    pub(crate) fn record_artifacts(&self, refs: Vec<ArtifactRef>) {
        *self.artifacts.lock().expect("artifact lock poisoned") = refs;
    }

    /// Drain the task list for execution. A node executes at most once, so
    /// the list is only ever taken once.
    pub(crate) fn take_tasks(&self) -> Vec<Box<dyn Task>> {
        std::mem::take(&mut *self.tasks.lock().expect("task lock poisoned"))
    }

    /// Replace the task list with externally supplied implementations.
    pub(crate) fn replace_tasks(&self, tasks: Vec<Box<dyn Task>>) {
        *self.tasks.lock().expect("task lock poisoned") = tasks;
    }
}
