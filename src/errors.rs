// src/errors.rs

//! Crate-wide error types.
//!
//! Graph-construction errors (duplicates, unresolved references, cycles) are
//! fatal and carry enough detail to point at the offending definition.
//! Artifact errors distinguish "producer has not published yet" from
//! "storage is broken" so callers can tell not-ready from corrupted.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForgedagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Duplicate node name '{0}' in definition set")]
    DuplicateNode(String),

    #[error("Node '{node}' references unknown dependency '{dependency}'")]
    UnresolvedDependency { node: String, dependency: String },

    #[error("Dependency cycle in build graph: {}", path.join(" -> "))]
    DependencyCycle { path: Vec<String> },

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Invalid state transition for node '{node}': {detail}")]
    InvalidTransition { node: String, detail: String },

    #[error("No artifacts published for node '{0}'")]
    ArtifactMissing(String),

    #[error("Node '{producer}' republished artifact '{logical_name}' with different content")]
    ArtifactConflict {
        producer: String,
        logical_name: String,
    },

    #[error("Artifact storage error: {0}")]
    StorageError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ForgedagError>;
