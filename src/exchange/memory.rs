// src/exchange/memory.rs

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::errors::{ForgedagError, Result};

use super::{ArtifactExchange, ArtifactRef, ArtifactScope};

#[derive(Debug, Clone)]
struct StoredArtifact {
    bytes: Vec<u8>,
    digest: String,
    scope: ArtifactScope,
}

/// Process-local exchange backed by a map.
///
/// Used by tests and simulation runs. Since everything lives in one process,
/// the `Local`/`Shared` distinction is recorded on the ref but does not
/// restrict visibility.
#[derive(Debug, Clone, Default)]
pub struct InMemoryExchange {
    entries: Arc<Mutex<BTreeMap<(String, String), StoredArtifact>>>,
}

impl InMemoryExchange {
    pub fn new() -> Self {
        Self::default()
    }

    fn make_ref(producer: &str, logical_name: &str, scope: ArtifactScope) -> ArtifactRef {
        ArtifactRef {
            logical_name: logical_name.to_string(),
            producer: producer.to_string(),
            scope,
            location: format!("memory:{}/{}", producer, logical_name),
        }
    }
}

impl ArtifactExchange for InMemoryExchange {
    fn publish(
        &self,
        producer: &str,
        logical_name: &str,
        bytes: &[u8],
        scope: ArtifactScope,
    ) -> Result<ArtifactRef> {
        let digest = blake3::hash(bytes).to_hex().to_string();
        let key = (producer.to_string(), logical_name.to_string());

        let mut entries = self.entries.lock().expect("exchange lock poisoned");

        if let Some(existing) = entries.get(&key) {
            if existing.digest == digest {
                debug!(
                    producer = %producer,
                    artifact = %logical_name,
                    "idempotent republish with identical content; no-op"
                );
                return Ok(Self::make_ref(producer, logical_name, existing.scope));
            }
            return Err(ForgedagError::ArtifactConflict {
                producer: producer.to_string(),
                logical_name: logical_name.to_string(),
            });
        }

        entries.insert(
            key,
            StoredArtifact {
                bytes: bytes.to_vec(),
                digest,
                scope,
            },
        );
        debug!(
            producer = %producer,
            artifact = %logical_name,
            size = bytes.len(),
            "published artifact (memory)"
        );

        Ok(Self::make_ref(producer, logical_name, scope))
    }

    fn retrieve(&self, producer: &str) -> Result<Vec<ArtifactRef>> {
        let entries = self.entries.lock().expect("exchange lock poisoned");

        let refs: Vec<ArtifactRef> = entries
            .iter()
            .filter(|((p, _), _)| p == producer)
            .map(|((p, l), stored)| Self::make_ref(p, l, stored.scope))
            .collect();

        if refs.is_empty() {
            return Err(ForgedagError::ArtifactMissing(producer.to_string()));
        }
        Ok(refs)
    }

    fn open(&self, artifact: &ArtifactRef) -> Result<Vec<u8>> {
        let entries = self.entries.lock().expect("exchange lock poisoned");
        let key = (artifact.producer.clone(), artifact.logical_name.clone());

        entries
            .get(&key)
            .map(|stored| stored.bytes.clone())
            .ok_or_else(|| {
                ForgedagError::StorageError(format!(
                    "artifact ref points at missing entry: {}",
                    artifact.location
                ))
            })
    }
}
