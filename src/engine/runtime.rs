// src/engine/runtime.rs

//! Event-loop driver walking a resolved graph in dependency order.
//!
//! The driver is one possible caller of the per-node contract: it dispatches
//! every ready node onto its own tokio task, reacts to completion events
//! from an mpsc channel, fires eligible triggers, and blocks dependents of
//! failed nodes. Independent branches keep running after a failure; the run
//! ends when nothing is in flight and nothing more can be released.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exchange::ArtifactExchange;
use crate::graph::definition::DefinitionKind;
use crate::graph::node::{NodeId, NodeState};
use crate::graph::BuildGraph;

use super::execute::execute_node;
use super::report::Notifier;
use super::{EngineEvent, EngineOptions, NodeOutcome, RunReport};

pub struct Driver {
    graph: Arc<BuildGraph>,
    exchange: Arc<dyn ArtifactExchange>,
    notifier: Arc<dyn Notifier>,
    options: EngineOptions,
    event_tx: mpsc::Sender<EngineEvent>,
    event_rx: mpsc::Receiver<EngineEvent>,
    /// Nodes already handed to a tokio task this run.
    dispatched: HashSet<NodeId>,
    /// Nodes blocked by an upstream failure, for the report.
    blocked: Vec<String>,
    in_flight: usize,
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("options", &self.options)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl Driver {
    pub fn new(
        graph: Arc<BuildGraph>,
        exchange: Arc<dyn ArtifactExchange>,
        notifier: Arc<dyn Notifier>,
        options: EngineOptions,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(64);
        Self {
            graph,
            exchange,
            notifier,
            options,
            event_tx,
            event_rx,
            dispatched: HashSet::new(),
            blocked: Vec::new(),
            in_flight: 0,
        }
    }

    /// Sender for external events, e.g. wiring Ctrl-C to a graceful
    /// shutdown request.
    pub fn event_sender(&self) -> mpsc::Sender<EngineEvent> {
        self.event_tx.clone()
    }

    /// Run the graph to quiescence and report how every node ended up.
    pub async fn run(mut self) -> Result<RunReport> {
        info!(
            nodes = self.graph.node_count(),
            mode = ?self.options.mode,
            "build driver started"
        );

        let mut shutting_down = false;
        self.release_work()?;

        while self.in_flight > 0 {
            let Some(event) = self.event_rx.recv().await else {
                warn!("driver event channel closed; stopping");
                break;
            };

            match event {
                EngineEvent::ShutdownRequested => {
                    info!("shutdown requested; waiting for in-flight nodes");
                    shutting_down = true;
                }
                EngineEvent::NodeFinished { node, outcome } => {
                    self.in_flight -= 1;
                    self.handle_finished(&node, &outcome)?;
                    if !shutting_down {
                        self.release_work()?;
                    }
                }
            }
        }

        let report = self.build_report()?;
        info!(
            completed = report.completed.len(),
            failed = report.failed.len(),
            blocked = report.blocked.len(),
            unreleased = report.unreleased.len(),
            "build driver finished"
        );
        Ok(report)
    }

    /// Fire eligible triggers and dispatch ready nodes until a fixpoint.
    ///
    /// Firing a trigger can complete an aggregate instantly, which can make
    /// further nodes ready, so this loops until nothing else moves.
    fn release_work(&mut self) -> Result<()> {
        loop {
            let mut progressed = false;

            for id in self.graph.ready_trigger_ids() {
                let name = self.graph.node(id).name().to_string();
                let eligible = self.options.auto_fire_triggers
                    || self.options.fire_triggers.contains(&name);
                if !eligible {
                    continue;
                }

                let released = self.graph.activate_trigger(&name)?;
                if let DefinitionKind::Trigger { action_prompt, .. } =
                    &self.graph.node(id).definition().kind
                {
                    self.notifier.trigger_fired(&name, action_prompt);
                }
                debug!(trigger = %name, released = ?released, "fired eligible trigger");
                progressed = true;
            }

            for id in self.graph.ready_node_ids() {
                if !self.dispatched.insert(id) {
                    continue;
                }
                self.spawn_execution(id);
                progressed = true;
            }

            if !progressed {
                return Ok(());
            }
        }
    }

    fn spawn_execution(&mut self, id: NodeId) {
        self.in_flight += 1;

        let graph = Arc::clone(&self.graph);
        let exchange = Arc::clone(&self.exchange);
        let tx = self.event_tx.clone();
        let mode = self.options.mode;

        let name = self.graph.node(id).name().to_string();
        debug!(node = %name, "dispatching node");

        tokio::spawn(async move {
            let outcome = match execute_node(&graph, &name, exchange.as_ref(), mode).await {
                Ok(outcome) => outcome,
                Err(err) => NodeOutcome::Failed(err.to_string()),
            };
            if tx
                .send(EngineEvent::NodeFinished { node: name, outcome })
                .await
                .is_err()
            {
                warn!("driver event channel closed before completion could be reported");
            }
        });
    }

    fn handle_finished(&mut self, node: &str, outcome: &NodeOutcome) -> Result<()> {
        let policy = self.graph.definition_of(node)?.notify.clone();

        match outcome {
            NodeOutcome::Success => {
                self.notifier.node_succeeded(node, &policy);
            }
            NodeOutcome::Failed(cause) => {
                self.notifier.node_failed(node, cause, &policy);

                let blocked = self.graph.mark_dependents_blocked(node)?;
                for name in &blocked {
                    let blocked_policy = self.graph.definition_of(name)?.notify.clone();
                    let blocked_cause = self
                        .graph
                        .failure_of(name)?
                        .unwrap_or_else(|| "blocked by upstream failure".to_string());
                    self.notifier
                        .node_failed(name, &blocked_cause, &blocked_policy);
                }
                self.blocked.extend(blocked);
            }
        }
        Ok(())
    }

    fn build_report(&self) -> Result<RunReport> {
        let mut report = RunReport::default();

        for name in self.graph.names() {
            match self.graph.node_state(name)? {
                NodeState::Completed => report.completed.push(name.to_string()),
                NodeState::Failed => {
                    if self.blocked.iter().any(|b| b == name) {
                        report.blocked.push(name.to_string());
                    } else {
                        let cause = self
                            .graph
                            .failure_of(name)?
                            .unwrap_or_else(|| "unknown failure".to_string());
                        report.failed.push((name.to_string(), cause));
                    }
                }
                NodeState::Pending | NodeState::Running => {
                    report.unreleased.push(name.to_string());
                }
            }
        }

        Ok(report)
    }
}
