// src/engine/mod.rs

//! Execution engine for resolved build graphs.
//!
//! The engine deliberately does not pick agents or enforce timeouts; it
//! decides *what* may run (readiness), performs per-node execution against
//! an artifact exchange, and drives the whole graph through an event loop
//! ([`runtime::Driver`]) that external callers can replace with their own
//! scheduler.

use crate::graph::NodeName;

pub mod execute;
pub mod report;
pub mod runtime;

pub use execute::{COMPLETION_MARKER, execute_node};
pub use report::{LogNotifier, Notifier};
pub use runtime::Driver;

/// Whether node execution performs real work or manufactures placeholder
/// artifacts for graph-wiring validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    #[default]
    Real,
    Simulated,
}

/// Result of one node execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeOutcome {
    Success,
    /// Human-readable cause, also recorded on the node instance.
    Failed(String),
}

/// Events flowing into the driver's event loop.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A spawned node execution finished with a concrete outcome.
    NodeFinished {
        node: NodeName,
        outcome: NodeOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C); stop dispatching new
    /// nodes, let in-flight ones finish.
    ShutdownRequested,
}

/// Driver configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub mode: ExecutionMode,
    /// Fire every trigger as soon as it becomes ready. Useful for
    /// simulation runs that should walk the whole graph.
    pub auto_fire_triggers: bool,
    /// Triggers to fire when they become ready, by name.
    pub fire_triggers: Vec<String>,
}

/// End-of-run accounting, grouped by how each node ended up.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub completed: Vec<NodeName>,
    pub failed: Vec<(NodeName, String)>,
    /// Nodes that never ran because an upstream dependency failed.
    pub blocked: Vec<NodeName>,
    /// Nodes still pending at exit (unfired gates or shutdown).
    pub unreleased: Vec<NodeName>,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.failed.is_empty() && self.blocked.is_empty()
    }
}
