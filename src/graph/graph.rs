// src/graph/graph.rs

//! The fully linked build graph.
//!
//! Structurally immutable after resolution; per-node execution state lives
//! inside the instances and moves forward monotonically. All public entry
//! points are name-based; graph indices stay internal.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::errors::{ForgedagError, Result};
use crate::exchange::ArtifactRef;
use crate::graph::definition::{DefinitionKind, NodeDefinition};
use crate::task::Task;

use super::node::{NodeId, NodeInstance, NodeState};

pub struct BuildGraph {
    nodes: Vec<NodeInstance>,
    index: HashMap<String, NodeId>,
    dependents: Vec<Vec<NodeId>>,
    topo_order: Vec<NodeId>,
}

impl BuildGraph {
    pub(crate) fn new_linked(
        nodes: Vec<NodeInstance>,
        index: HashMap<String, NodeId>,
        dependents: Vec<Vec<NodeId>>,
        topo_order: Vec<NodeId>,
    ) -> Self {
        Self {
            nodes,
            index,
            dependents,
            topo_order,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Node names in dependency order.
    pub fn names(&self) -> Vec<&str> {
        self.topo_order
            .iter()
            .map(|&id| self.nodes[id].name())
            .collect()
    }

    pub(crate) fn id_of(&self, name: &str) -> Result<NodeId> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| ForgedagError::NodeNotFound(name.to_string()))
    }

    pub(crate) fn node(&self, id: NodeId) -> &NodeInstance {
        &self.nodes[id]
    }

    pub(crate) fn dependents_of(&self, id: NodeId) -> &[NodeId] {
        &self.dependents[id]
    }

    pub fn definition_of(&self, name: &str) -> Result<&NodeDefinition> {
        Ok(self.node(self.id_of(name)?).definition())
    }

    pub fn node_state(&self, name: &str) -> Result<NodeState> {
        Ok(self.node(self.id_of(name)?).state())
    }

    pub fn failure_of(&self, name: &str) -> Result<Option<String>> {
        Ok(self.node(self.id_of(name)?).failure())
    }

    pub fn artifacts_of(&self, name: &str) -> Result<Vec<ArtifactRef>> {
        Ok(self.node(self.id_of(name)?).artifacts())
    }

    pub fn is_fired(&self, name: &str) -> Result<bool> {
        Ok(self.node(self.id_of(name)?).is_fired())
    }

    pub fn input_deps_of(&self, name: &str) -> Result<Vec<String>> {
        let node = self.node(self.id_of(name)?);
        Ok(self.names_for(&node.input_deps))
    }

    pub fn order_deps_of(&self, name: &str) -> Result<Vec<String>> {
        let node = self.node(self.id_of(name)?);
        Ok(self.names_for(&node.order_deps))
    }

    pub fn controlling_triggers_of(&self, name: &str) -> Result<Vec<String>> {
        let node = self.node(self.id_of(name)?);
        Ok(self.names_for(&node.controlling_triggers))
    }

    fn names_for(&self, ids: &[NodeId]) -> Vec<String> {
        ids.iter().map(|&id| self.nodes[id].name().to_string()).collect()
    }

    /// Whether the node counts as completed for its dependents.
    ///
    /// Aggregates have no completion state of their own; their completion is
    /// a pure function of their dependencies, recomputed on every read.
    /// A fired trigger is by definition completed.
    pub(crate) fn node_completed(&self, id: NodeId) -> bool {
        let node = &self.nodes[id];
        match node.definition().kind {
            DefinitionKind::Trigger { .. } => node.is_fired(),
            DefinitionKind::Aggregate => node
                .input_deps
                .iter()
                .chain(node.order_deps.iter())
                .all(|&dep| self.node_completed(dep)),
            DefinitionKind::Task { .. } => node.state() == NodeState::Completed,
        }
    }

    pub(crate) fn is_ready_id(&self, id: NodeId) -> bool {
        let node = &self.nodes[id];
        if node.state() != NodeState::Pending {
            return false;
        }

        let deps_done = node
            .input_deps
            .iter()
            .chain(node.order_deps.iter())
            .all(|&dep| self.node_completed(dep));
        if !deps_done {
            return false;
        }

        // A trigger's own chain includes itself (so dependents inherit it);
        // skip that entry when judging the trigger's own readiness.
        node.controlling_triggers
            .iter()
            .filter(|&&t| t != id)
            .all(|&t| self.nodes[t].is_fired())
    }

    /// True iff every dependency is completed and every controlling trigger
    /// has fired, and the node has not yet been claimed for execution.
    pub fn is_ready(&self, name: &str) -> Result<bool> {
        Ok(self.is_ready_id(self.id_of(name)?))
    }

    /// Pending non-trigger nodes whose dependencies and gates are satisfied,
    /// in dependency order.
    pub(crate) fn ready_node_ids(&self) -> Vec<NodeId> {
        self.topo_order
            .iter()
            .copied()
            .filter(|&id| !self.nodes[id].is_trigger() && self.is_ready_id(id))
            .collect()
    }

    /// Unfired triggers whose own dependencies and upstream gates are
    /// satisfied.
    pub(crate) fn ready_trigger_ids(&self) -> Vec<NodeId> {
        self.topo_order
            .iter()
            .copied()
            .filter(|&id| self.nodes[id].is_trigger() && self.is_ready_id(id))
            .collect()
    }

    /// Fire a trigger, releasing whatever it was gating.
    ///
    /// Returns the names of nodes that became ready because of this
    /// activation. Firing an already-fired trigger is a no-op and returns an
    /// empty list. With `recursive_gate_check`, readiness is re-validated
    /// for every node transitively gated by this trigger; otherwise only
    /// direct dependents are examined.
    pub fn activate_trigger(&self, name: &str) -> Result<Vec<String>> {
        let id = self.id_of(name)?;
        let node = &self.nodes[id];

        let DefinitionKind::Trigger {
            recursive_gate_check,
            ..
        } = &node.definition().kind
        else {
            return Err(ForgedagError::InvalidTransition {
                node: name.to_string(),
                detail: "only trigger nodes can be activated".to_string(),
            });
        };
        let recursive_gate_check = *recursive_gate_check;

        if !node.fire() {
            debug!(trigger = %name, "trigger already fired; activation is a no-op");
            return Ok(Vec::new());
        }

        let deps_done = node
            .input_deps
            .iter()
            .chain(node.order_deps.iter())
            .all(|&dep| self.node_completed(dep));
        if !deps_done {
            warn!(trigger = %name, "trigger fired before its own dependencies completed");
        }

        let candidates: Vec<NodeId> = if recursive_gate_check {
            self.topo_order
                .iter()
                .copied()
                .filter(|&n| n != id && self.nodes[n].controlling_triggers.contains(&id))
                .collect()
        } else {
            self.dependents_of(id).to_vec()
        };

        let released: Vec<String> = candidates
            .into_iter()
            .filter(|&n| self.is_ready_id(n))
            .map(|n| self.nodes[n].name().to_string())
            .collect();

        debug!(trigger = %name, released = ?released, "trigger fired");
        Ok(released)
    }

    /// Mark every pending transitive dependent of a failed node as failed,
    /// recording which dependency blocked it. Returns the names of newly
    /// blocked nodes.
    pub fn mark_dependents_blocked(&self, name: &str) -> Result<Vec<String>> {
        let root = self.id_of(name)?;
        let mut stack: Vec<(NodeId, NodeId)> = self
            .dependents_of(root)
            .iter()
            .map(|&d| (d, root))
            .collect();
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut blocked = Vec::new();

        while let Some((id, parent)) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let node = &self.nodes[id];
            if node.state() != NodeState::Pending {
                continue;
            }

            let cause = format!(
                "blocked by failed dependency '{}'",
                self.nodes[parent].name()
            );
            match node.mark_failed(cause) {
                Ok(()) => {
                    debug!(node = %node.name(), upstream = %self.nodes[parent].name(),
                        "marking dependent as blocked due to upstream failure");
                    blocked.push(node.name().to_string());
                    stack.extend(self.dependents_of(id).iter().map(|&d| (d, id)));
                }
                Err(_) => {
                    // Lost the race to another terminal transition; its
                    // dependents are handled by whoever won.
                }
            }
        }

        Ok(blocked)
    }

    /// Attach externally implemented tasks to a task node, replacing the
    /// declaratively lowered list. This is the boundary through which
    /// embedders supply concrete work implementations.
    pub fn install_tasks(&self, name: &str, tasks: Vec<Box<dyn Task>>) -> Result<()> {
        let id = self.id_of(name)?;
        let node = &self.nodes[id];

        if !node.definition().is_task() {
            return Err(ForgedagError::ConfigError(format!(
                "node '{}' is not a task node; cannot install tasks",
                name
            )));
        }
        if node.state() != NodeState::Pending {
            return Err(ForgedagError::InvalidTransition {
                node: name.to_string(),
                detail: format!("cannot install tasks in state {:?}", node.state()),
            });
        }

        node.replace_tasks(tasks);
        Ok(())
    }
}
