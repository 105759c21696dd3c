// src/graph/definition.rs

//! Immutable node definitions.
//!
//! A [`NodeDefinition`] is the declarative description of one unit of work,
//! authored by the manifest layer (or constructed directly by embedders and
//! tests). Dependencies are referenced by name only; the resolver links them
//! into a runtime graph. Definitions are never mutated by a graph build, so
//! one definition set can seed any number of graphs.

use std::path::PathBuf;

use crate::exchange::ArtifactScope;

/// Canonical node name type used throughout the engine.
pub type NodeName = String;

/// Who gets told about a node's completion, and when.
///
/// Delivery is external; the engine only surfaces these hints to the
/// configured [`Notifier`](crate::engine::Notifier).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPolicy {
    pub recipients: Vec<String>,
    pub on_success: bool,
    pub on_failure: bool,
}

impl Default for NotificationPolicy {
    fn default() -> Self {
        Self {
            recipients: Vec::new(),
            on_success: false,
            on_failure: true,
        }
    }
}

/// A declared output artifact of a task node.
///
/// If `source` is set, the engine reads that file after the node's tasks
/// succeed and publishes its bytes under `name`. If `source` is `None`, a
/// task is expected to stage the bytes itself via
/// [`TaskContext::stage`](crate::task::TaskContext::stage).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSpec {
    pub name: String,
    pub source: Option<PathBuf>,
}

/// Declarative description of a sub-task, lowered to a concrete
/// [`Task`](crate::task::Task) when the instance is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskSpec {
    /// A shell command run through the given interpreter (`sh -c` style).
    Command { shell: String, script: String },
}

/// The closed set of node kinds.
#[derive(Debug, Clone)]
pub enum DefinitionKind {
    /// A node whose work is an ordered list of sub-tasks.
    Task {
        tasks: Vec<TaskSpec>,
        outputs: Vec<OutputSpec>,
    },
    /// A manual/conditional checkpoint gating its downstream subgraph.
    Trigger {
        description: String,
        action_prompt: String,
        /// When fired, re-validate readiness of every transitively gated
        /// node, not just direct dependents.
        recursive_gate_check: bool,
    },
    /// A zero-work grouping node naming a milestone.
    Aggregate,
}

/// Immutable, declarative description of one unit of work.
#[derive(Debug, Clone)]
pub struct NodeDefinition {
    /// Unique, non-empty identifier within a definition set.
    pub name: NodeName,
    pub kind: DefinitionKind,

    /// Names whose produced artifacts this node consumes.
    pub input_dependencies: Vec<NodeName>,
    /// Names this node must run after, without consuming their artifacts.
    pub order_dependencies: Vec<NodeName>,

    // Scheduling hints, passed through to the external agent-dispatch layer
    // and not interpreted by the engine.
    pub agent_class: Option<String>,
    pub agent_requirements: Option<String>,
    pub agent_sharing_group: Option<String>,
    pub frequency_shift: i32,
    pub priority: i32,
    pub timeout_minutes: Option<u32>,
    pub memory_requirement_mb: Option<u64>,

    /// Where this node's artifacts are published.
    pub artifact_scope: ArtifactScope,

    pub notify: NotificationPolicy,

    /// Completion is treated as permanent for the remainder of the pipeline.
    /// Triggers are implicitly sticky.
    pub is_sticky: bool,
    /// Marks the node as not gating downstream promotion on failure
    /// severity; pass-through metadata for external reporting.
    pub is_test: bool,
}

impl NodeDefinition {
    /// A definition with the given name and kind and neutral defaults for
    /// everything else.
    pub fn new(name: impl Into<NodeName>, kind: DefinitionKind) -> Self {
        let is_trigger = matches!(kind, DefinitionKind::Trigger { .. });
        Self {
            name: name.into(),
            kind,
            input_dependencies: Vec::new(),
            order_dependencies: Vec::new(),
            agent_class: None,
            agent_requirements: None,
            agent_sharing_group: None,
            frequency_shift: 0,
            priority: 0,
            timeout_minutes: None,
            memory_requirement_mb: None,
            artifact_scope: ArtifactScope::Local,
            notify: NotificationPolicy::default(),
            is_sticky: is_trigger,
            is_test: false,
        }
    }

    pub fn is_trigger(&self) -> bool {
        matches!(self.kind, DefinitionKind::Trigger { .. })
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self.kind, DefinitionKind::Aggregate)
    }

    pub fn is_task(&self) -> bool {
        matches!(self.kind, DefinitionKind::Task { .. })
    }

    /// All dependency names, inputs first, then order-only.
    pub fn dependency_names(&self) -> impl Iterator<Item = &str> {
        self.input_dependencies
            .iter()
            .chain(self.order_dependencies.iter())
            .map(|s| s.as_str())
    }

    /// Declared output names for task nodes; empty for other kinds.
    pub fn output_names(&self) -> Vec<&str> {
        match &self.kind {
            DefinitionKind::Task { outputs, .. } => {
                outputs.iter().map(|o| o.name.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}
