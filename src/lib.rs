// src/lib.rs

pub mod cli;
pub mod engine;
pub mod errors;
pub mod exchange;
pub mod graph;
pub mod logging;
pub mod manifest;
pub mod task;

use std::sync::Arc;

use anyhow::anyhow;
use tracing::info;

use crate::cli::CliArgs;
use crate::engine::{Driver, EngineEvent, EngineOptions, ExecutionMode, LogNotifier, RunReport};
use crate::errors::Result;
use crate::exchange::DiskExchange;
use crate::graph::{BuildGraph, DefinitionKind, resolve};
use crate::manifest::load_and_validate;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - manifest loading and validation
/// - graph resolution
/// - the artifact exchange (local + optional shared root)
/// - the driver event loop
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let definitions = load_and_validate(&args.manifest)?;
    let graph = resolve(&definitions)?;

    if args.dry_run {
        print_graph(&graph)?;
        return Ok(());
    }

    let mut exchange = DiskExchange::new(&args.artifact_dir);
    if let Some(shared) = &args.shared_dir {
        exchange = exchange.with_shared(shared);
    }

    let options = EngineOptions {
        mode: if args.simulate {
            ExecutionMode::Simulated
        } else {
            ExecutionMode::Real
        },
        auto_fire_triggers: args.auto_fire,
        fire_triggers: args.fire.clone(),
    };

    let driver = Driver::new(
        Arc::new(graph),
        Arc::new(exchange),
        Arc::new(LogNotifier),
        options,
    );

    // Ctrl-C → graceful shutdown.
    {
        let tx = driver.event_sender();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(EngineEvent::ShutdownRequested).await;
        });
    }

    let report = driver.run().await?;
    print_summary(&report);

    if !report.failed.is_empty() {
        return Err(anyhow!(
            "{} node(s) failed; see log for causes",
            report.failed.len()
        )
        .into());
    }
    Ok(())
}

fn print_summary(report: &RunReport) {
    info!(
        completed = ?report.completed,
        failed = ?report.failed,
        blocked = ?report.blocked,
        unreleased = ?report.unreleased,
        "run summary"
    );
    for (node, cause) in &report.failed {
        eprintln!("failed: {node}: {cause}");
    }
}

/// Dry-run output: every node in dependency order, with edges, gates and
/// scheduling hints.
fn print_graph(graph: &BuildGraph) -> Result<()> {
    println!("forgedag dry-run: {} node(s)", graph.node_count());

    for name in graph.names() {
        let def = graph.definition_of(name)?;
        let kind = match &def.kind {
            DefinitionKind::Task { tasks, outputs } => {
                format!("task ({} step(s), {} output(s))", tasks.len(), outputs.len())
            }
            DefinitionKind::Trigger { description, .. } => {
                format!("trigger ({description})")
            }
            DefinitionKind::Aggregate => "aggregate".to_string(),
        };

        println!("  - {name} [{kind}]");
        let inputs = graph.input_deps_of(name)?;
        if !inputs.is_empty() {
            println!("      needs: {:?}", inputs);
        }
        let order = graph.order_deps_of(name)?;
        if !order.is_empty() {
            println!("      after: {:?}", order);
        }
        let gates = graph.controlling_triggers_of(name)?;
        if !gates.is_empty() {
            println!("      gated by: {:?}", gates);
        }
        if let Some(agent_class) = &def.agent_class {
            println!("      agent_class: {agent_class}");
        }
        if def.priority != 0 {
            println!("      priority: {}", def.priority);
        }
        if let Some(timeout) = def.timeout_minutes {
            println!("      timeout_minutes: {timeout}");
        }
    }

    Ok(())
}
