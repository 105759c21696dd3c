// src/exchange/mod.rs

//! Artifact exchange: the store/retrieve protocol that hands build products
//! between nodes that may run in different processes or on different
//! machines.
//!
//! The exchange is always passed in explicitly (trait object), never held as
//! an ambient global, so tests can substitute [`InMemoryExchange`] for the
//! disk-backed implementation.
//!
//! Writes are keyed by `(producer, logical_name)` and idempotent for
//! byte-identical content; republishing different bytes under an existing
//! key is a consistency error. Two different nodes never write the same key,
//! which is what lets the exchange avoid cross-node locking.

use crate::errors::Result;
use crate::graph::NodeName;

pub mod disk;
pub mod memory;

pub use disk::DiskExchange;
pub use memory::InMemoryExchange;

/// Visibility of a published artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactScope {
    /// Visible only within the same execution process/agent.
    Local,
    /// Visible to any agent that can reach the shared exchange root.
    Shared,
}

/// Handle to a published artifact. Immutable once published.
///
/// `location` is an opaque handle interpretable only by the exchange that
/// issued it; pass it back to [`ArtifactExchange::open`] to read the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub logical_name: String,
    pub producer: NodeName,
    pub scope: ArtifactScope,
    pub location: String,
}

/// Store/retrieve boundary between the engine and concrete storage.
///
/// Error contract:
/// - [`ForgedagError::ArtifactMissing`](crate::errors::ForgedagError::ArtifactMissing)
///   from `retrieve` means the producer has not published yet (recoverable
///   by waiting); storage faults surface as
///   [`StorageError`](crate::errors::ForgedagError::StorageError) instead,
///   so the two are never conflated.
/// - `publish` with byte-identical content for an existing key is a silent
///   no-op; differing content is a fatal
///   [`ArtifactConflict`](crate::errors::ForgedagError::ArtifactConflict).
pub trait ArtifactExchange: Send + Sync {
    fn publish(
        &self,
        producer: &str,
        logical_name: &str,
        bytes: &[u8],
        scope: ArtifactScope,
    ) -> Result<ArtifactRef>;

    /// All artifacts previously published under the producer's name.
    fn retrieve(&self, producer: &str) -> Result<Vec<ArtifactRef>>;

    /// Read back the bytes of a previously issued ref.
    fn open(&self, artifact: &ArtifactRef) -> Result<Vec<u8>>;
}
