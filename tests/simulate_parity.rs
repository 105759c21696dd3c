// tests/simulate_parity.rs

//! Simulated execution must be indistinguishable from real execution at the
//! artifact-naming level, so downstream wiring can be validated without a
//! real build.

mod common;
use crate::common::builders::DefinitionBuilder;
use crate::common::init_tracing;
use crate::common::tasks::{ScriptedTask, new_log};

use forgedag::engine::{ExecutionMode, NodeOutcome, execute_node};
use forgedag::exchange::{ArtifactExchange, InMemoryExchange};
use forgedag::graph::{NodeDefinition, NodeState, resolve};

fn producer_defs() -> Vec<NodeDefinition> {
    vec![
        DefinitionBuilder::task("cook")
            .output("pak")
            .output("manifest")
            .build(),
        DefinitionBuilder::task("stage").needs("cook").build(),
    ]
}

fn artifact_names(exchange: &InMemoryExchange, producer: &str) -> Vec<String> {
    let mut names: Vec<String> = exchange
        .retrieve(producer)
        .unwrap()
        .into_iter()
        .map(|a| a.logical_name)
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn simulated_and_real_runs_publish_the_same_logical_names() {
    init_tracing();

    // Real run: scripted tasks stage the declared outputs.
    let real_graph = resolve(&producer_defs()).unwrap();
    let real_exchange = InMemoryExchange::new();
    let log = new_log();
    real_graph
        .install_tasks(
            "cook",
            vec![Box::new(
                ScriptedTask::succeeding("cook-step", &log)
                    .with_stage("pak", b"cooked")
                    .with_stage("manifest", b"listing"),
            )],
        )
        .unwrap();
    let outcome = execute_node(&real_graph, "cook", &real_exchange, ExecutionMode::Real)
        .await
        .unwrap();
    assert_eq!(outcome, NodeOutcome::Success);

    // Simulated run on a fresh graph from the same definitions.
    let sim_graph = resolve(&producer_defs()).unwrap();
    let sim_exchange = InMemoryExchange::new();
    let outcome = execute_node(&sim_graph, "cook", &sim_exchange, ExecutionMode::Simulated)
        .await
        .unwrap();
    assert_eq!(outcome, NodeOutcome::Success);

    assert_eq!(
        artifact_names(&real_exchange, "cook"),
        artifact_names(&sim_exchange, "cook"),
    );
    assert_eq!(
        artifact_names(&sim_exchange, "cook"),
        vec!["manifest", "node.complete", "pak"]
    );
}

#[tokio::test]
async fn downstream_node_cannot_tell_a_simulated_predecessor_apart() {
    init_tracing();

    let graph = resolve(&producer_defs()).unwrap();
    let exchange = InMemoryExchange::new();

    execute_node(&graph, "cook", &exchange, ExecutionMode::Simulated)
        .await
        .unwrap();
    assert!(graph.is_ready("stage").unwrap());

    // Restoring inputs from the simulated producer succeeds.
    let outcome = execute_node(&graph, "stage", &exchange, ExecutionMode::Simulated)
        .await
        .unwrap();
    assert_eq!(outcome, NodeOutcome::Success);
    assert_eq!(graph.node_state("stage").unwrap(), NodeState::Completed);
}

#[tokio::test]
async fn simulated_run_records_artifact_refs_on_the_instance() {
    init_tracing();

    let graph = resolve(&producer_defs()).unwrap();
    let exchange = InMemoryExchange::new();

    execute_node(&graph, "cook", &exchange, ExecutionMode::Simulated)
        .await
        .unwrap();

    let refs = graph.artifacts_of("cook").unwrap();
    let mut names: Vec<&str> = refs.iter().map(|a| a.logical_name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["manifest", "node.complete", "pak"]);

    // Placeholder content records the producing node.
    let pak = refs.iter().find(|a| a.logical_name == "pak").unwrap();
    let bytes = exchange.open(pak).unwrap();
    assert!(String::from_utf8(bytes).unwrap().contains("cook"));
}

#[tokio::test]
async fn real_run_missing_declared_output_fails_instead_of_breaking_parity() {
    init_tracing();

    let graph = resolve(&producer_defs()).unwrap();
    let exchange = InMemoryExchange::new();
    let log = new_log();
    // Stages only one of the two declared outputs.
    graph
        .install_tasks(
            "cook",
            vec![Box::new(
                ScriptedTask::succeeding("cook-step", &log).with_stage("pak", b"cooked"),
            )],
        )
        .unwrap();

    let outcome = execute_node(&graph, "cook", &exchange, ExecutionMode::Real)
        .await
        .unwrap();
    match outcome {
        NodeOutcome::Failed(cause) => assert!(cause.contains("manifest")),
        other => panic!("expected failure, got: {:?}", other),
    }
}

#[tokio::test]
async fn staging_an_undeclared_artifact_fails() {
    init_tracing();

    let graph = resolve(&producer_defs()).unwrap();
    let exchange = InMemoryExchange::new();
    let log = new_log();
    graph
        .install_tasks(
            "cook",
            vec![Box::new(
                ScriptedTask::succeeding("cook-step", &log)
                    .with_stage("pak", b"cooked")
                    .with_stage("manifest", b"listing")
                    .with_stage("surprise", b"unexpected"),
            )],
        )
        .unwrap();

    let outcome = execute_node(&graph, "cook", &exchange, ExecutionMode::Real)
        .await
        .unwrap();
    match outcome {
        NodeOutcome::Failed(cause) => assert!(cause.contains("surprise")),
        other => panic!("expected failure, got: {:?}", other),
    }
}
