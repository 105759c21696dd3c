// src/exchange/disk.rs

//! Disk-backed artifact exchange.
//!
//! Layout, per root:
//!
//! ```text
//! <root>/<producer>/<logical_name>       artifact bytes
//! <root>/<producer>/<logical_name>.b3    blake3 digest (hex)
//! ```
//!
//! The local root models per-agent temp storage; the optional shared root is
//! a directory reachable by every agent (network share or similar) and
//! carries `Shared`-scoped artifacts across machine boundaries. The digest
//! sidecar is what makes republication idempotence cheap: re-publishing
//! compares digests instead of content.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{ForgedagError, Result};

use super::{ArtifactExchange, ArtifactRef, ArtifactScope};

const DIGEST_SUFFIX: &str = ".b3";

#[derive(Debug, Clone)]
pub struct DiskExchange {
    local_root: PathBuf,
    shared_root: Option<PathBuf>,
}

impl DiskExchange {
    pub fn new(local_root: impl Into<PathBuf>) -> Self {
        Self {
            local_root: local_root.into(),
            shared_root: None,
        }
    }

    /// Configure the shared root used for `Shared`-scoped artifacts.
    pub fn with_shared(mut self, shared_root: impl Into<PathBuf>) -> Self {
        self.shared_root = Some(shared_root.into());
        self
    }

    fn root_for(&self, scope: ArtifactScope) -> Result<&Path> {
        match scope {
            ArtifactScope::Local => Ok(&self.local_root),
            ArtifactScope::Shared => self.shared_root.as_deref().ok_or_else(|| {
                ForgedagError::StorageError(
                    "shared scope requested but no shared exchange root is configured"
                        .to_string(),
                )
            }),
        }
    }

    fn make_ref(
        producer: &str,
        logical_name: &str,
        scope: ArtifactScope,
        path: &Path,
    ) -> ArtifactRef {
        ArtifactRef {
            logical_name: logical_name.to_string(),
            producer: producer.to_string(),
            scope,
            location: path.display().to_string(),
        }
    }
}

fn storage_err(what: &str, path: &Path, err: std::io::Error) -> ForgedagError {
    ForgedagError::StorageError(format!("{} {:?}: {}", what, path, err))
}

impl ArtifactExchange for DiskExchange {
    fn publish(
        &self,
        producer: &str,
        logical_name: &str,
        bytes: &[u8],
        scope: ArtifactScope,
    ) -> Result<ArtifactRef> {
        let root = self.root_for(scope)?;
        let dir = root.join(producer);
        let path = dir.join(logical_name);
        let digest_path = dir.join(format!("{}{}", logical_name, DIGEST_SUFFIX));

        let digest = blake3::hash(bytes).to_hex().to_string();

        if digest_path.exists() {
            let existing = fs::read_to_string(&digest_path)
                .map_err(|e| storage_err("reading digest", &digest_path, e))?;
            if existing.trim() == digest {
                debug!(
                    producer = %producer,
                    artifact = %logical_name,
                    "idempotent republish with identical content; no-op"
                );
                return Ok(Self::make_ref(producer, logical_name, scope, &path));
            }
            return Err(ForgedagError::ArtifactConflict {
                producer: producer.to_string(),
                logical_name: logical_name.to_string(),
            });
        }

        fs::create_dir_all(&dir).map_err(|e| storage_err("creating dir", &dir, e))?;
        fs::write(&path, bytes).map_err(|e| storage_err("writing artifact", &path, e))?;
        // Digest is written last; a crash between the two writes shows up as
        // a missing digest and the artifact is republished cleanly.
        fs::write(&digest_path, &digest)
            .map_err(|e| storage_err("writing digest", &digest_path, e))?;

        debug!(
            producer = %producer,
            artifact = %logical_name,
            size = bytes.len(),
            ?scope,
            "published artifact (disk)"
        );

        Ok(Self::make_ref(producer, logical_name, scope, &path))
    }

    fn retrieve(&self, producer: &str) -> Result<Vec<ArtifactRef>> {
        let mut refs = Vec::new();

        let roots = [
            (ArtifactScope::Local, Some(self.local_root.as_path())),
            (ArtifactScope::Shared, self.shared_root.as_deref()),
        ];

        for (scope, root) in roots {
            let Some(root) = root else { continue };
            let dir = root.join(producer);
            if !dir.is_dir() {
                continue;
            }

            let entries =
                fs::read_dir(&dir).map_err(|e| storage_err("reading dir", &dir, e))?;
            for entry in entries {
                let entry = entry.map_err(|e| storage_err("reading dir entry", &dir, e))?;
                let path = entry.path();
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if name.ends_with(DIGEST_SUFFIX) || !path.is_file() {
                    continue;
                }
                // Skip artifacts whose digest never landed (interrupted publish).
                if !dir.join(format!("{}{}", name, DIGEST_SUFFIX)).is_file() {
                    continue;
                }
                refs.push(Self::make_ref(producer, name, scope, &path));
            }
        }

        if refs.is_empty() {
            return Err(ForgedagError::ArtifactMissing(producer.to_string()));
        }

        refs.sort_by(|a, b| a.logical_name.cmp(&b.logical_name));
        Ok(refs)
    }

    fn open(&self, artifact: &ArtifactRef) -> Result<Vec<u8>> {
        let path = PathBuf::from(&artifact.location);
        fs::read(&path).map_err(|e| storage_err("reading artifact", &path, e))
    }
}
