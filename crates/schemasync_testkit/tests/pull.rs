//! Pulling the branch schema into the local schema file.

use schemasync_engine::{
    backup_path, pull_schema, Answer, EngineConfig, NonInteractive, ScriptedDecisions, SyncError,
};
use schemasync_schema::{parse_schema, SchemaFormat};
use schemasync_testkit::prelude::*;
use std::fs;
use tempfile::tempdir;

const OLD_SCHEMA: &str = "tables:\n  - name: legacy\n";

#[test]
fn pull_overwrites_and_keeps_backup() {
    let remote = MemoryRemote::new();
    remote.seed_branch(&branch("main"), blog_schema());
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("schema.yaml");
    fs::write(&path, OLD_SCHEMA).unwrap();
    let config = EngineConfig::default();

    let summary = pull_schema(
        &remote,
        &NonInteractive,
        &config,
        &branch("main"),
        &path,
        SchemaFormat::Yaml,
        &mut std::io::sink(),
    )
    .unwrap();

    let pulled = parse_schema(&fs::read(&path).unwrap(), SchemaFormat::Yaml).unwrap();
    assert_eq!(pulled, blog_schema());
    let backup = summary.backup.unwrap();
    assert_eq!(backup, backup_path(&path, ".bak"));
    assert_eq!(fs::read_to_string(backup).unwrap(), OLD_SCHEMA);
}

#[test]
fn failed_pull_restores_schema_file() {
    let remote = MemoryRemote::new();
    remote.seed_branch(&branch("main"), blog_schema());
    remote.fail_on(Op::BranchDetails, 1, SyncError::network(500, "boom"));
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("schema.json");
    fs::write(&path, OLD_SCHEMA).unwrap();

    let err = pull_schema(
        &remote,
        &NonInteractive,
        &EngineConfig::default(),
        &branch("main"),
        &path,
        SchemaFormat::Json,
        &mut std::io::sink(),
    )
    .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(fs::read_to_string(&path).unwrap(), OLD_SCHEMA);
    assert_eq!(
        fs::read_to_string(backup_path(&path, ".bak")).unwrap(),
        OLD_SCHEMA
    );
}

#[test]
fn missing_branch_offers_existing_ones() {
    let remote = MemoryRemote::new();
    remote.seed_branch(&branch("main"), blog_schema());
    let decisions = ScriptedDecisions::new([Answer::Select("main".into())]);
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("schema.json");
    let mut out = Vec::new();

    let summary = pull_schema(
        &remote,
        &decisions,
        &EngineConfig::default(),
        &branch("feature"),
        &path,
        SchemaFormat::Json,
        &mut out,
    )
    .unwrap();

    assert_eq!(summary.branch, branch("main"));
    assert_eq!(summary.backup, None);
    assert!(decisions.is_exhausted());
    assert!(String::from_utf8(out)
        .unwrap()
        .starts_with("Pulling schema from branch [blog:main]\n"));
    let pulled = parse_schema(&fs::read(&path).unwrap(), SchemaFormat::Json).unwrap();
    assert_eq!(pulled, blog_schema());
}

#[test]
fn missing_branch_without_user_is_a_conflict() {
    let remote = MemoryRemote::new();
    remote.seed_branch(&branch("main"), blog_schema());
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("schema.json");

    let err = pull_schema(
        &remote,
        &NonInteractive,
        &EngineConfig::default(),
        &branch("feature"),
        &path,
        SchemaFormat::Json,
        &mut std::io::sink(),
    )
    .unwrap_err();

    assert!(matches!(err, SyncError::Conflict(_)));
    assert!(!path.exists());
}
