// src/manifest/validate.rs

use std::collections::HashSet;

use crate::errors::{ForgedagError, Result};

use super::model::RawManifest;

/// Semantic checks on a parsed manifest, before lowering to definitions.
///
/// Cycle detection is deliberately not done here; the resolver reports
/// cycles with the full path, and runs on programmatic definition sets too.
pub fn validate_manifest(manifest: &RawManifest) -> Result<()> {
    ensure_has_definitions(manifest)?;
    validate_names(manifest)?;
    validate_references(manifest)?;
    Ok(())
}

fn ensure_has_definitions(manifest: &RawManifest) -> Result<()> {
    if manifest.node.is_empty() && manifest.trigger.is_empty() && manifest.aggregate.is_empty() {
        return Err(ForgedagError::ConfigError(
            "manifest must contain at least one [node.<name>], [trigger.<name>] \
             or [aggregate.<name>] section"
                .to_string(),
        ));
    }
    Ok(())
}

fn validate_names(manifest: &RawManifest) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();

    for name in all_names(manifest) {
        if name.is_empty() {
            return Err(ForgedagError::ConfigError(
                "definition with empty name".to_string(),
            ));
        }
        if !seen.insert(name) {
            // TOML keys are unique per section, so this is a cross-section
            // clash like [node.X] + [trigger.X].
            return Err(ForgedagError::DuplicateNode(name.to_string()));
        }
    }
    Ok(())
}

fn validate_references(manifest: &RawManifest) -> Result<()> {
    let known: HashSet<&str> = all_names(manifest).collect();

    let mut check = |node: &str, field: &str, deps: &[String]| -> Result<()> {
        for dep in deps {
            if !known.contains(dep.as_str()) {
                return Err(ForgedagError::ConfigError(format!(
                    "node '{}' has unknown dependency '{}' in `{}`",
                    node, dep, field
                )));
            }
            if dep == node {
                return Err(ForgedagError::ConfigError(format!(
                    "node '{}' cannot depend on itself in `{}`",
                    node, field
                )));
            }
        }
        Ok(())
    };

    for (name, section) in manifest.node.iter() {
        check(name, "needs", &section.needs)?;
        check(name, "after", &section.after)?;
    }
    for (name, section) in manifest.trigger.iter() {
        check(name, "after", &section.after)?;
    }
    for (name, section) in manifest.aggregate.iter() {
        check(name, "needs", &section.needs)?;
    }

    Ok(())
}

fn all_names(manifest: &RawManifest) -> impl Iterator<Item = &str> {
    manifest
        .node
        .keys()
        .chain(manifest.trigger.keys())
        .chain(manifest.aggregate.keys())
        .map(|s| s.as_str())
}
