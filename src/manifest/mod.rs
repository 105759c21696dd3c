// src/manifest/mod.rs

//! TOML graph manifest: the configuration layer that produces the flat
//! [`NodeDefinition`](crate::graph::NodeDefinition) list. The engine itself
//! only ever sees the lowered definitions; embedders can bypass this module
//! entirely and construct definitions programmatically.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_manifest_path, load_and_validate, load_from_path};
pub use model::RawManifest;
pub use validate::validate_manifest;
