// src/engine/execute.rs

//! Per-node execution against an artifact exchange.
//!
//! The flow for a task node is: claim the node, restore input artifacts,
//! run the (merged) task list fail-fast, collect declared outputs, then
//! publish everything in one step. Publication being last is what keeps
//! partially produced artifacts of a failed or interrupted node invisible
//! to consumers.

use std::collections::BTreeMap;
use std::fs;

use tracing::{debug, info, warn};

use crate::errors::{ForgedagError, Result};
use crate::exchange::ArtifactExchange;
use crate::graph::BuildGraph;
use crate::graph::definition::{DefinitionKind, OutputSpec};
use crate::graph::node::NodeInstance;
use crate::task::{TaskContext, TaskOutcome, merge_tasks};

use super::{ExecutionMode, NodeOutcome};

/// Logical name of the sentinel artifact every task node publishes on
/// success, recording the node's name. Guarantees each executed task node
/// has at least one artifact, so "not yet published" stays unambiguous.
pub const COMPLETION_MARKER: &str = "node.complete";

/// Staged bytes keyed by logical artifact name, or the node's terminal
/// failure outcome.
type StagedOrFailed = std::result::Result<BTreeMap<String, Vec<u8>>, NodeOutcome>;

/// Execute a single node.
///
/// The caller is expected to respect readiness ([`BuildGraph::is_ready`]);
/// the compare-and-set claim inside is the authoritative guard against a
/// second execution attempt. Returns `Ok(NodeOutcome::Failed(_))` for work
/// failures (the node is left in its terminal failed state) and `Err(_)`
/// only for caller errors: unknown node, trigger node, or a node already
/// claimed.
pub async fn execute_node(
    graph: &BuildGraph,
    name: &str,
    exchange: &dyn ArtifactExchange,
    mode: ExecutionMode,
) -> Result<NodeOutcome> {
    let id = graph.id_of(name)?;
    let node = graph.node(id);

    if node.is_trigger() {
        return Err(ForgedagError::InvalidTransition {
            node: name.to_string(),
            detail: "triggers are activated, not executed".to_string(),
        });
    }

    node.try_start()?;
    debug!(node = %name, ?mode, "node execution started");

    if let Err(outcome) = restore_inputs(graph, node, exchange)? {
        return Ok(outcome);
    }

    match &node.definition().kind {
        DefinitionKind::Aggregate => {
            // Zero work; completion of an aggregate is derived from its
            // dependencies, and it publishes nothing of its own.
            node.mark_completed()?;
            info!(node = %name, "aggregate milestone reached");
            Ok(NodeOutcome::Success)
        }
        DefinitionKind::Task { outputs, .. } => {
            let staged = match mode {
                ExecutionMode::Real => {
                    let staged = match run_tasks(node).await? {
                        Ok(staged) => staged,
                        Err(outcome) => return Ok(outcome),
                    };
                    match finalize_outputs(node, outputs, staged)? {
                        Ok(staged) => staged,
                        Err(outcome) => return Ok(outcome),
                    }
                }
                ExecutionMode::Simulated => simulate_outputs(node.name(), outputs),
            };

            publish_and_complete(node, exchange, outputs, staged)
        }
        DefinitionKind::Trigger { .. } => unreachable!("rejected above"),
    }
}

/// Pull input artifacts out of the exchange before doing any work.
///
/// Only task-kind producers publish artifacts; aggregate and trigger inputs
/// gate ordering but have nothing to restore. Aggregates themselves consume
/// nothing.
fn restore_inputs(
    graph: &BuildGraph,
    node: &NodeInstance,
    exchange: &dyn ArtifactExchange,
) -> Result<std::result::Result<(), NodeOutcome>> {
    if node.is_aggregate() {
        return Ok(Ok(()));
    }

    for &dep in &node.input_deps {
        let producer = graph.node(dep);
        if !producer.definition().is_task() {
            continue;
        }
        match exchange.retrieve(producer.name()) {
            Ok(refs) => {
                debug!(
                    node = %node.name(),
                    producer = %producer.name(),
                    artifacts = refs.len(),
                    "restored input artifacts"
                );
            }
            Err(ForgedagError::ArtifactMissing(_)) => {
                let cause = format!(
                    "input artifacts from '{}' are unavailable (producer has not published)",
                    producer.name()
                );
                return Ok(Err(fail_node(node, cause)?));
            }
            Err(err) => {
                let cause = format!(
                    "retrieving input artifacts from '{}': {}",
                    producer.name(),
                    err
                );
                return Ok(Err(fail_node(node, cause)?));
            }
        }
    }

    Ok(Ok(()))
}

/// Run the node's merged task list in order, stopping at the first failure.
async fn run_tasks(node: &NodeInstance) -> Result<StagedOrFailed> {
    let tasks = merge_tasks(node.take_tasks());
    let mut ctx = TaskContext::new(node.name());

    for mut task in tasks {
        debug!(node = %node.name(), task = %task.describe(), "running sub-task");
        let outcome = match task.execute(&mut ctx).await {
            Ok(outcome) => outcome,
            Err(err) => TaskOutcome::Failed(err.to_string()),
        };
        if let TaskOutcome::Failed(cause) = outcome {
            let cause = format!("{}: {}", task.describe(), cause);
            return Ok(Err(fail_node(node, cause)?));
        }
    }

    Ok(Ok(ctx.take_staged()))
}

/// Collect file-sourced outputs and check the staged set against the
/// declaration. Parity with simulated runs holds because both paths publish
/// exactly the declared names.
fn finalize_outputs(
    node: &NodeInstance,
    outputs: &[OutputSpec],
    mut staged: BTreeMap<String, Vec<u8>>,
) -> Result<StagedOrFailed> {
    for out in outputs {
        if let Some(path) = &out.source {
            match fs::read(path) {
                Ok(bytes) => {
                    staged.insert(out.name.clone(), bytes);
                }
                Err(err) => {
                    let cause = format!(
                        "declared output '{}' not readable at {:?}: {}",
                        out.name, path, err
                    );
                    return Ok(Err(fail_node(node, cause)?));
                }
            }
        }
    }

    for out in outputs {
        if !staged.contains_key(&out.name) {
            let cause = format!("no content produced for declared output '{}'", out.name);
            return Ok(Err(fail_node(node, cause)?));
        }
    }
    if let Some(extra) = staged.keys().find(|k| !outputs.iter().any(|o| &o.name == *k)) {
        let cause = format!("staged undeclared artifact '{}'", extra);
        return Ok(Err(fail_node(node, cause)?));
    }

    Ok(Ok(staged))
}

/// Placeholder content for every declared output, matching the real name
/// set without invoking any sub-task.
fn simulate_outputs(node: &str, outputs: &[OutputSpec]) -> BTreeMap<String, Vec<u8>> {
    outputs
        .iter()
        .map(|out| {
            let bytes = format!("simulated artifact '{}' from node '{}'\n", out.name, node);
            (out.name.clone(), bytes.into_bytes())
        })
        .collect()
}

fn publish_and_complete(
    node: &NodeInstance,
    exchange: &dyn ArtifactExchange,
    outputs: &[OutputSpec],
    staged: BTreeMap<String, Vec<u8>>,
) -> Result<NodeOutcome> {
    let scope = node.definition().artifact_scope;
    let mut refs = Vec::with_capacity(outputs.len() + 1);

    for out in outputs {
        let bytes = &staged[&out.name];
        match exchange.publish(node.name(), &out.name, bytes, scope) {
            Ok(artifact) => refs.push(artifact),
            Err(err) => {
                let cause = format!("publishing artifact '{}': {}", out.name, err);
                return fail_node(node, cause);
            }
        }
    }

    let marker = format!("completed {}\n", node.name());
    match exchange.publish(node.name(), COMPLETION_MARKER, marker.as_bytes(), scope) {
        Ok(artifact) => refs.push(artifact),
        Err(err) => {
            return fail_node(node, format!("publishing completion marker: {}", err));
        }
    }

    let published = refs.len();
    node.record_artifacts(refs);
    node.mark_completed()?;
    info!(node = %node.name(), artifacts = published, "node completed");
    Ok(NodeOutcome::Success)
}

fn fail_node(node: &NodeInstance, cause: String) -> Result<NodeOutcome> {
    warn!(node = %node.name(), cause = %cause, "node failed");
    node.mark_failed(cause.clone())?;
    Ok(NodeOutcome::Failed(cause))
}
