// src/graph/mod.rs

//! Build graph: immutable definitions, runtime instances, and the resolver
//! that links one into the other.

pub mod definition;
pub mod graph;
pub mod node;
pub mod resolve;

pub use definition::{
    DefinitionKind, NodeDefinition, NodeName, NotificationPolicy, OutputSpec, TaskSpec,
};
pub use graph::BuildGraph;
pub use node::{NodeInstance, NodeState};
pub use resolve::resolve;
