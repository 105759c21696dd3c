// src/graph/resolve.rs

//! Two-pass graph resolution: construct one instance per definition, then
//! link name references into edges.
//!
//! Resolution is all-or-nothing. A duplicate name, an unresolved reference
//! or a cycle fails the whole build graph with a diagnosable error; a
//! partial graph is never returned.

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::errors::{ForgedagError, Result};

use super::definition::NodeDefinition;
use super::graph::BuildGraph;
use super::node::{NodeId, NodeInstance};

/// Resolve a flat definition set into a fully linked [`BuildGraph`].
///
/// The returned graph contains no dangling references and no cycles, and
/// every node's controlling-trigger chain is computed and stable for the
/// graph's lifetime.
pub fn resolve(definitions: &[NodeDefinition]) -> Result<BuildGraph> {
    // Pass 1: one instance per definition, keyed by name.
    let mut index: HashMap<String, NodeId> = HashMap::new();
    for def in definitions {
        if def.name.is_empty() {
            return Err(ForgedagError::ConfigError(
                "node definition with empty name".to_string(),
            ));
        }
        if index.insert(def.name.clone(), index.len()).is_some() {
            return Err(ForgedagError::DuplicateNode(def.name.clone()));
        }
    }

    let mut nodes: Vec<NodeInstance> = definitions
        .iter()
        .map(NodeInstance::from_definition)
        .collect();

    // Pass 2: link every dependency name to its instance.
    for (id, def) in definitions.iter().enumerate() {
        nodes[id].input_deps = link_names(&index, def, &def.input_dependencies)?;
        nodes[id].order_deps = link_names(&index, def, &def.order_dependencies)?;
    }

    if let Some(cycle) = find_cycle(&nodes) {
        let path = cycle.iter().map(|&id| nodes[id].name().to_string()).collect();
        return Err(ForgedagError::DependencyCycle { path });
    }

    let topo_order = topological_order(&nodes)?;
    compute_controlling_triggers(&mut nodes, &topo_order);

    // Reverse adjacency, used for failure propagation and gate re-checks.
    let mut dependents: Vec<Vec<NodeId>> = vec![Vec::new(); nodes.len()];
    for (id, node) in nodes.iter().enumerate() {
        let mut seen = HashSet::new();
        for &dep in node.input_deps.iter().chain(node.order_deps.iter()) {
            if seen.insert(dep) {
                dependents[dep].push(id);
            }
        }
    }

    debug!(
        nodes = nodes.len(),
        triggers = nodes.iter().filter(|n| n.is_trigger()).count(),
        "resolved build graph"
    );

    Ok(BuildGraph::new_linked(nodes, index, dependents, topo_order))
}

fn link_names(
    index: &HashMap<String, NodeId>,
    def: &NodeDefinition,
    names: &[String],
) -> Result<Vec<NodeId>> {
    names
        .iter()
        .map(|dep| {
            index
                .get(dep)
                .copied()
                .ok_or_else(|| ForgedagError::UnresolvedDependency {
                    node: def.name.clone(),
                    dependency: dep.clone(),
                })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    White,
    Grey,
    Black,
}

/// Depth-first colour-marking walk over the combined input/order edge set.
///
/// Returns the full cycle path (first node repeated at the end) so the
/// error can name every involved node, not just report "cycle detected".
fn find_cycle(nodes: &[NodeInstance]) -> Option<Vec<NodeId>> {
    let mut marks = vec![Mark::White; nodes.len()];
    let mut path: Vec<NodeId> = Vec::new();

    for id in 0..nodes.len() {
        if marks[id] == Mark::White {
            if let Some(cycle) = visit(id, nodes, &mut marks, &mut path) {
                return Some(cycle);
            }
        }
    }
    None
}

fn visit(
    id: NodeId,
    nodes: &[NodeInstance],
    marks: &mut Vec<Mark>,
    path: &mut Vec<NodeId>,
) -> Option<Vec<NodeId>> {
    marks[id] = Mark::Grey;
    path.push(id);

    let node = &nodes[id];
    for &dep in node.input_deps.iter().chain(node.order_deps.iter()) {
        match marks[dep] {
            Mark::Grey => {
                // Back edge: the cycle is the path from `dep` down to here.
                let start = path
                    .iter()
                    .position(|&n| n == dep)
                    .expect("grey node must be on the walk path");
                let mut cycle: Vec<NodeId> = path[start..].to_vec();
                cycle.push(dep);
                return Some(cycle);
            }
            Mark::White => {
                if let Some(cycle) = visit(dep, nodes, marks, path) {
                    return Some(cycle);
                }
            }
            Mark::Black => {}
        }
    }

    path.pop();
    marks[id] = Mark::Black;
    None
}

/// Dependency-first ordering over the linked instances.
fn topological_order(nodes: &[NodeInstance]) -> Result<Vec<NodeId>> {
    let mut graph: DiGraphMap<NodeId, ()> = DiGraphMap::new();

    for id in 0..nodes.len() {
        graph.add_node(id);
    }
    for (id, node) in nodes.iter().enumerate() {
        for &dep in node.input_deps.iter().chain(node.order_deps.iter()) {
            graph.add_edge(dep, id, ());
        }
    }

    // Cycles were rejected above, so this cannot fail on real input.
    toposort(&graph, None).map_err(|_| {
        ForgedagError::ConfigError("topological ordering failed on an acyclic graph".to_string())
    })
}

/// Single dependency-order pass computing each node's controlling-trigger
/// chain from its predecessors' already-computed chains.
fn compute_controlling_triggers(nodes: &mut [NodeInstance], topo_order: &[NodeId]) {
    let mut chains: Vec<Vec<NodeId>> = vec![Vec::new(); nodes.len()];

    for &id in topo_order {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();

        let node = &nodes[id];
        for &dep in node.input_deps.iter().chain(node.order_deps.iter()) {
            for &trigger in &chains[dep] {
                if seen.insert(trigger) {
                    chain.push(trigger);
                }
            }
        }
        if node.is_trigger() && seen.insert(id) {
            chain.push(id);
        }

        chains[id] = chain;
    }

    for (id, chain) in chains.into_iter().enumerate() {
        nodes[id].controlling_triggers = chain;
    }
}
