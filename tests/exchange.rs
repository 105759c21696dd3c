// tests/exchange.rs

//! Artifact exchange contract: idempotent publication, conflict detection,
//! the missing/storage error distinction, and cross-agent handoff through a
//! shared root.

mod common;
use crate::common::init_tracing;

use forgedag::errors::ForgedagError;
use forgedag::exchange::{ArtifactExchange, ArtifactScope, DiskExchange, InMemoryExchange};

#[test]
fn republishing_identical_bytes_is_a_silent_noop() {
    init_tracing();
    let exchange = InMemoryExchange::new();

    let first = exchange
        .publish("compile", "lib", b"object code", ArtifactScope::Local)
        .unwrap();
    let second = exchange
        .publish("compile", "lib", b"object code", ArtifactScope::Local)
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(exchange.open(&first).unwrap(), b"object code");
}

#[test]
fn republishing_different_bytes_is_a_consistency_error() {
    init_tracing();
    let exchange = InMemoryExchange::new();

    exchange
        .publish("compile", "lib", b"object code", ArtifactScope::Local)
        .unwrap();

    match exchange.publish("compile", "lib", b"different", ArtifactScope::Local) {
        Err(ForgedagError::ArtifactConflict {
            producer,
            logical_name,
        }) => {
            assert_eq!(producer, "compile");
            assert_eq!(logical_name, "lib");
        }
        other => panic!("expected ArtifactConflict, got: {:?}", other),
    }
}

#[test]
fn retrieve_before_publish_is_artifact_missing_not_a_storage_error() {
    init_tracing();
    let exchange = InMemoryExchange::new();

    match exchange.retrieve("never-ran") {
        Err(ForgedagError::ArtifactMissing(producer)) => assert_eq!(producer, "never-ran"),
        other => panic!("expected ArtifactMissing, got: {:?}", other),
    }
}

#[test]
fn shared_scope_without_shared_root_is_a_storage_error() {
    init_tracing();
    let local = tempfile::tempdir().unwrap();
    let exchange = DiskExchange::new(local.path());

    match exchange.publish("cook", "pak", b"data", ArtifactScope::Shared) {
        Err(ForgedagError::StorageError(msg)) => assert!(msg.contains("shared")),
        other => panic!("expected StorageError, got: {:?}", other),
    }
}

#[test]
fn disk_roundtrip_and_idempotence() {
    init_tracing();
    let root = tempfile::tempdir().unwrap();
    let exchange = DiskExchange::new(root.path());

    exchange
        .publish("compile", "lib", b"object code", ArtifactScope::Local)
        .unwrap();
    exchange
        .publish("compile", "dbg", b"symbols", ArtifactScope::Local)
        .unwrap();
    // Byte-identical republish after a restart-equivalent (new instance).
    let fresh = DiskExchange::new(root.path());
    fresh
        .publish("compile", "lib", b"object code", ArtifactScope::Local)
        .unwrap();

    let refs = fresh.retrieve("compile").unwrap();
    let names: Vec<&str> = refs.iter().map(|a| a.logical_name.as_str()).collect();
    assert_eq!(names, vec!["dbg", "lib"]);
    assert_eq!(fresh.open(&refs[1]).unwrap(), b"object code");

    match fresh.publish("compile", "lib", b"mutated", ArtifactScope::Local) {
        Err(ForgedagError::ArtifactConflict { .. }) => {}
        other => panic!("expected ArtifactConflict, got: {:?}", other),
    }
}

#[test]
fn shared_artifacts_cross_agents_local_ones_do_not() {
    init_tracing();

    // Two agents with private local roots and a common shared root.
    let shared = tempfile::tempdir().unwrap();
    let agent_a_local = tempfile::tempdir().unwrap();
    let agent_b_local = tempfile::tempdir().unwrap();

    let agent_a = DiskExchange::new(agent_a_local.path()).with_shared(shared.path());
    let agent_b = DiskExchange::new(agent_b_local.path()).with_shared(shared.path());

    agent_a
        .publish("cook", "pak", b"cooked data", ArtifactScope::Shared)
        .unwrap();
    agent_a
        .publish("scratch", "tmp", b"local only", ArtifactScope::Local)
        .unwrap();

    // Shared artifact is visible from the other agent.
    let refs = agent_b.retrieve("cook").unwrap();
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].scope, ArtifactScope::Shared);
    assert_eq!(agent_b.open(&refs[0]).unwrap(), b"cooked data");

    // Local artifact is not.
    match agent_b.retrieve("scratch") {
        Err(ForgedagError::ArtifactMissing(producer)) => assert_eq!(producer, "scratch"),
        other => panic!("expected ArtifactMissing, got: {:?}", other),
    }

    // The producing agent sees its own local artifact.
    assert_eq!(agent_a.retrieve("scratch").unwrap().len(), 1);
}
