// tests/manifest_errors.rs

//! Manifest loading, validation errors and lowering.

mod common;
use crate::common::init_tracing;

use std::io::Write;

use tempfile::NamedTempFile;

use forgedag::errors::ForgedagError;
use forgedag::exchange::ArtifactScope;
use forgedag::graph::{DefinitionKind, TaskSpec, resolve};
use forgedag::manifest::load_and_validate;

fn manifest_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", contents).unwrap();
    file
}

#[test]
fn unknown_dependency_is_a_config_error() {
    init_tracing();
    let file = manifest_file(
        r#"
[node.compile]
run = ["make"]
needs = ["NonExistent"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(ForgedagError::ConfigError(msg)) => {
            assert!(msg.contains("unknown dependency"));
            assert!(msg.contains("NonExistent"));
            assert!(msg.contains("compile"));
        }
        other => panic!("expected ConfigError, got: {:?}", other.map(|_| ())),
    }
}

#[test]
fn self_dependency_is_a_config_error() {
    init_tracing();
    let file = manifest_file(
        r#"
[node.loop]
run = ["true"]
after = ["loop"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(ForgedagError::ConfigError(msg)) => assert!(msg.contains("itself")),
        other => panic!("expected ConfigError, got: {:?}", other.map(|_| ())),
    }
}

#[test]
fn cross_section_duplicate_name_is_fatal() {
    init_tracing();
    let file = manifest_file(
        r#"
[node.release]
run = ["true"]

[trigger.release]
description = "clashes with the node"
"#,
    );

    match load_and_validate(file.path()) {
        Err(ForgedagError::DuplicateNode(name)) => assert_eq!(name, "release"),
        other => panic!("expected DuplicateNode, got: {:?}", other.map(|_| ())),
    }
}

#[test]
fn empty_manifest_is_rejected() {
    init_tracing();
    let file = manifest_file("");

    match load_and_validate(file.path()) {
        Err(ForgedagError::ConfigError(msg)) => assert!(msg.contains("at least one")),
        other => panic!("expected ConfigError, got: {:?}", other.map(|_| ())),
    }
}

#[test]
fn malformed_toml_is_a_parse_error() {
    init_tracing();
    let file = manifest_file(
        r#"
[node.broken
run = ["true"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(ForgedagError::TomlError(_)) => {}
        other => panic!("expected TomlError, got: {:?}", other.map(|_| ())),
    }
}

#[test]
fn cycle_surfaces_from_the_resolver_with_the_full_path() {
    init_tracing();
    let file = manifest_file(
        r#"
[node.a]
run = ["true"]
after = ["b"]

[node.b]
run = ["true"]
after = ["a"]
"#,
    );

    // The manifest itself validates (all names known); the resolver rejects
    // the cycle with the involved names.
    let definitions = load_and_validate(file.path()).unwrap();
    match resolve(&definitions) {
        Err(ForgedagError::DependencyCycle { path }) => {
            assert!(path.contains(&"a".to_string()));
            assert!(path.contains(&"b".to_string()));
        }
        other => panic!("expected DependencyCycle, got: {:?}", other.map(|_| ())),
    }
}

#[test]
fn lowering_applies_defaults_and_section_fields() {
    init_tracing();
    let file = manifest_file(
        r#"
[defaults]
shell = "bash"
agent_class = "linux-builder"
timeout_minutes = 90

[node.compile]
run = ["make all", "make install"]
outputs = { app = "build/app" }
shared = true
priority = 5

[node.special]
run = ["true"]
shell = "zsh"
agent_class = "mac-builder"

[trigger.approve]
description = "Stage approval"
prompt = "Fire to promote"
after = ["compile"]
recheck_gated = true

[aggregate.everything]
needs = ["compile", "special"]
"#,
    );

    let definitions = load_and_validate(file.path()).unwrap();
    assert_eq!(definitions.len(), 4);

    let compile = definitions.iter().find(|d| d.name == "compile").unwrap();
    assert_eq!(compile.agent_class.as_deref(), Some("linux-builder"));
    assert_eq!(compile.timeout_minutes, Some(90));
    assert_eq!(compile.priority, 5);
    assert_eq!(compile.artifact_scope, ArtifactScope::Shared);
    match &compile.kind {
        DefinitionKind::Task { tasks, outputs } => {
            assert_eq!(tasks.len(), 2);
            match &tasks[0] {
                TaskSpec::Command { shell, script } => {
                    assert_eq!(shell, "bash");
                    assert_eq!(script, "make all");
                }
            }
            assert_eq!(outputs.len(), 1);
            assert_eq!(outputs[0].name, "app");
            assert!(outputs[0].source.is_some());
        }
        other => panic!("expected task kind, got: {:?}", other),
    }

    let special = definitions.iter().find(|d| d.name == "special").unwrap();
    assert_eq!(special.agent_class.as_deref(), Some("mac-builder"));
    match &special.kind {
        DefinitionKind::Task { tasks, .. } => match &tasks[0] {
            TaskSpec::Command { shell, .. } => assert_eq!(shell, "zsh"),
        },
        other => panic!("expected task kind, got: {:?}", other),
    }

    let approve = definitions.iter().find(|d| d.name == "approve").unwrap();
    assert!(approve.is_sticky, "triggers are implicitly sticky");
    match &approve.kind {
        DefinitionKind::Trigger {
            description,
            action_prompt,
            recursive_gate_check,
        } => {
            assert_eq!(description, "Stage approval");
            assert_eq!(action_prompt, "Fire to promote");
            assert!(recursive_gate_check);
        }
        other => panic!("expected trigger kind, got: {:?}", other),
    }
    assert_eq!(approve.order_dependencies, vec!["compile"]);

    let everything = definitions.iter().find(|d| d.name == "everything").unwrap();
    assert!(everything.is_aggregate());
    assert_eq!(everything.input_dependencies, vec!["compile", "special"]);
}

#[test]
fn notification_policy_defaults_to_failure_only() {
    init_tracing();
    let file = manifest_file(
        r#"
[node.quiet]
run = ["true"]

[node.loud]
run = ["true"]
notify = { recipients = ["build-team@example.com"], on_success = true }
"#,
    );

    let definitions = load_and_validate(file.path()).unwrap();

    let quiet = definitions.iter().find(|d| d.name == "quiet").unwrap();
    assert!(quiet.notify.recipients.is_empty());
    assert!(!quiet.notify.on_success);
    assert!(quiet.notify.on_failure);

    let loud = definitions.iter().find(|d| d.name == "loud").unwrap();
    assert_eq!(loud.notify.recipients, vec!["build-team@example.com"]);
    assert!(loud.notify.on_success);
    assert!(loud.notify.on_failure);
}
