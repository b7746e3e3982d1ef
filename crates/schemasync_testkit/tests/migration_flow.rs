//! Deploy flow against the in-memory service.

use schemasync_engine::{
    resolve_deploy_branch, Answer, Approval, EngineConfig, MigrationOutcome, MigrationState,
    Migrator, NonInteractive, Provenance, ScriptedDecisions, SyncError,
};
use schemasync_protocol::BranchMetadata;
use schemasync_schema::{Column, ColumnType, Schema};
use schemasync_testkit::prelude::*;

fn users_only() -> Schema {
    Schema::new(vec![users_table()])
}

#[test]
fn unchanged_schema_is_never_applied() {
    let remote = MemoryRemote::new();
    remote.seed_branch(&branch("main"), blog_schema());
    let mut out = Vec::new();

    let outcome = Migrator::new(&remote, &NonInteractive)
        .run(&branch("main"), &blog_schema(), Approval::Prompt, None, &mut out)
        .unwrap();

    assert_eq!(outcome, MigrationOutcome::UpToDate);
    assert_eq!(remote.call_count(Op::ExecuteMigrationPlan), 0);
    assert_eq!(String::from_utf8(out).unwrap(), "Your schema is up to date.\n");
}

#[test]
fn applied_schema_is_then_up_to_date() {
    let remote = MemoryRemote::new();
    remote.seed_branch(&branch("main"), users_only());
    let provenance = Provenance {
        git_revision: Some("abc123".into()),
        local_changes: true,
    };
    let mut out = Vec::new();

    let outcome = Migrator::new(&remote, &NonInteractive)
        .run(
            &branch("main"),
            &blog_schema(),
            Approval::AutoApprove,
            Some(&provenance),
            &mut out,
        )
        .unwrap();
    assert!(matches!(outcome, MigrationOutcome::Applied(_)));
    assert_eq!(remote.schema(&branch("main")), Some(blog_schema()));

    let out = String::from_utf8(out).unwrap();
    assert!(out.starts_with("Migration plan preview:\n\nCREATE table posts\n"));
    assert!(out.ends_with("Done.\n"));

    let again = Migrator::new(&remote, &NonInteractive)
        .run(&branch("main"), &blog_schema(), Approval::Prompt, None, &mut std::io::sink())
        .unwrap();
    assert_eq!(again, MigrationOutcome::UpToDate);
    assert_eq!(remote.call_count(Op::ExecuteMigrationPlan), 1);

    let history = remote.migrations(&branch("main"));
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].last_git_revision.as_deref(), Some("abc123"));
    assert!(history[0].local_changes);
    assert!(history[0].created_at.is_some());
    assert_eq!(history[0].parent_id, history[1].id);
}

#[test]
fn declined_plan_leaves_branch_alone() {
    let remote = MemoryRemote::new();
    remote.seed_branch(&branch("main"), users_only());
    let decisions = ScriptedDecisions::new([Answer::Confirm(false)]);

    let mut migrator = Migrator::new(&remote, &decisions);
    let outcome = migrator
        .run(&branch("main"), &blog_schema(), Approval::Prompt, None, &mut std::io::sink())
        .unwrap();

    assert_eq!(outcome, MigrationOutcome::Declined);
    assert_eq!(migrator.state(), MigrationState::Aborted);
    assert_eq!(remote.schema(&branch("main")), Some(users_only()));
    assert_eq!(decisions.prompts(), ["Apply the above migration?"]);
}

#[test]
fn prompt_without_user_is_refused() {
    let remote = MemoryRemote::new();
    remote.seed_branch(&branch("main"), users_only());

    let err = Migrator::new(&remote, &NonInteractive)
        .run(&branch("main"), &blog_schema(), Approval::Prompt, None, &mut std::io::sink())
        .unwrap_err();

    assert!(matches!(err, SyncError::Validation(_)));
    assert_eq!(remote.call_count(Op::ExecuteMigrationPlan), 0);
}

#[test]
fn failed_apply_is_reported_and_not_recorded() {
    let remote = MemoryRemote::new();
    remote.seed_branch(&branch("main"), users_only());
    remote.fail_on(
        Op::ExecuteMigrationPlan,
        1,
        SyncError::network(500, "migration failed"),
    );

    let err = Migrator::new(&remote, &NonInteractive)
        .run(&branch("main"), &blog_schema(), Approval::AutoApprove, None, &mut std::io::sink())
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(remote.migrations(&branch("main")).len(), 1);
}

#[test]
fn modified_columns_render_previous_name() {
    let remote = MemoryRemote::new();
    remote.seed_branch(&branch("main"), blog_schema());
    let mut changed = blog_schema();
    changed.tables[0].columns[0] = Column::new("name", ColumnType::Text);
    let mut out = Vec::new();

    Migrator::new(&remote, &NonInteractive)
        .run(&branch("main"), &changed, Approval::AutoApprove, None, &mut out)
        .unwrap();

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Table [users]:\n  MODIFY column name\n"));
    assert_eq!(remote.schema(&branch("main")), Some(changed));
}

#[test]
fn first_deploy_creates_database_then_migrates() {
    let remote = MemoryRemote::new();
    let config = EngineConfig::default();
    let mut out = Vec::new();

    let target = resolve_deploy_branch(
        &remote,
        &NonInteractive,
        &config,
        &branch("main"),
        BranchMetadata::default(),
        &mut out,
    )
    .unwrap();
    Migrator::new(&remote, &NonInteractive)
        .run(&target, &blog_schema(), Approval::AutoApprove, None, &mut out)
        .unwrap();

    assert_eq!(remote.schema(&branch("main")), Some(blog_schema()));
    assert!(String::from_utf8(out)
        .unwrap()
        .starts_with("Database [blog/main] created\n"));
}

#[test]
fn deploy_to_new_git_branch_forks_with_metadata() {
    let remote = MemoryRemote::new();
    remote.seed_branch(&branch("main"), users_only());
    let decisions = ScriptedDecisions::new([
        Answer::Confirm(true),
        Answer::Select("main".into()),
        Answer::Confirm(true),
    ]);
    let metadata = BranchMetadata {
        repository: Some("blog-app".into()),
        branch: Some("feature-posts".into()),
    };

    let target = resolve_deploy_branch(
        &remote,
        &decisions,
        &EngineConfig::default(),
        &branch("feature-posts"),
        metadata,
        &mut std::io::sink(),
    )
    .unwrap();
    Migrator::new(&remote, &decisions)
        .run(&target, &blog_schema(), Approval::Prompt, None, &mut std::io::sink())
        .unwrap();

    assert!(decisions.is_exhausted());
    assert_eq!(remote.schema(&branch("feature-posts")), Some(blog_schema()));
    assert_eq!(remote.schema(&branch("main")), Some(users_only()));
}
