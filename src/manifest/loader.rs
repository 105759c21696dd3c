// src/manifest/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{ForgedagError, Result};
use crate::graph::NodeDefinition;

use super::model::RawManifest;
use super::validate::validate_manifest;

/// Read and parse a manifest file without semantic validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawManifest> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|err| {
        ForgedagError::ConfigError(format!("reading manifest {:?}: {}", path, err))
    })?;

    let manifest: RawManifest = toml::from_str(&contents)?;
    Ok(manifest)
}

/// Recommended entry point: read, parse, validate, and lower the manifest
/// into the flat definition list the resolver consumes.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Vec<NodeDefinition>> {
    let manifest = load_from_path(&path)?;
    validate_manifest(&manifest)?;

    let definitions = manifest.into_definitions();
    debug!(
        path = ?path.as_ref(),
        definitions = definitions.len(),
        "loaded graph manifest"
    );
    Ok(definitions)
}

/// Default manifest location: `Forgedag.toml` in the working directory.
pub fn default_manifest_path() -> PathBuf {
    PathBuf::from("Forgedag.toml")
}
