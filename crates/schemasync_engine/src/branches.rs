//! Making sure a target branch exists before writing to it.

use crate::config::EngineConfig;
use crate::decision::DecisionProvider;
use crate::error::{SyncError, SyncResult};
use crate::transport::RemoteService;
use schemasync_protocol::{BranchMetadata, BranchRef, CreateBranchRequest, CreateDatabaseRequest};
use std::io::Write;
use tracing::info;

/// Creates `branch` if it does not exist yet.
///
/// A missing database is created with `branch` as its first branch; otherwise
/// the branch is forked from the first branch the service lists. Returns
/// true if anything was created.
pub fn ensure_branch_exists<R, W>(remote: &R, branch: &BranchRef, out: &mut W) -> SyncResult<bool>
where
    R: RemoteService + ?Sized,
    W: Write + ?Sized,
{
    if remote.branch_details(branch)?.is_some() {
        return Ok(false);
    }
    create_branch(remote, branch, out)?;
    Ok(true)
}

/// Creates a branch known to be missing; see [`ensure_branch_exists`].
pub fn create_branch<R, W>(remote: &R, branch: &BranchRef, out: &mut W) -> SyncResult<()>
where
    R: RemoteService + ?Sized,
    W: Write + ?Sized,
{
    let database = branch.database();
    let Some(existing) = remote.list_branches(database)? else {
        remote.create_database(
            database,
            &CreateDatabaseRequest {
                branch_name: branch.branch().to_string(),
            },
        )?;
        info!(database, branch = branch.branch(), "database created");
        writeln!(out, "Created database [{}] with branch [{}]", database, branch.branch())?;
        return Ok(());
    };

    let from = existing.first().map(|b| b.name.clone()).ok_or_else(|| {
        SyncError::conflict(format!("no branches found in database [{}]", database))
    })?;
    remote.create_branch(
        branch,
        &CreateBranchRequest {
            from: Some(from),
            metadata: None,
        },
    )?;
    info!(branch = %branch, "branch created");
    writeln!(out, "Created branch [{}]", branch)?;
    Ok(())
}

/// Picks the branch a deploy writes to, creating it if needed.
///
/// - a database without branches is created with `branch`
/// - an existing `branch` is used as is
/// - otherwise the user either forks `branch` from an existing branch
///   (tagged with `metadata`) or picks an existing branch instead
pub fn resolve_deploy_branch<R, D, W>(
    remote: &R,
    decisions: &D,
    config: &EngineConfig,
    branch: &BranchRef,
    metadata: BranchMetadata,
    out: &mut W,
) -> SyncResult<BranchRef>
where
    R: RemoteService + ?Sized,
    D: DecisionProvider + ?Sized,
    W: Write + ?Sized,
{
    let database = branch.database();
    let existing: Vec<String> = remote
        .list_branches(database)?
        .unwrap_or_default()
        .into_iter()
        .map(|b| b.name)
        .collect();

    if existing.is_empty() {
        remote.create_database(
            database,
            &CreateDatabaseRequest {
                branch_name: branch.branch().to_string(),
            },
        )?;
        writeln!(out, "Database [{}/{}] created", database, branch.branch())?;
        return Ok(branch.clone());
    }

    if existing.iter().any(|b| b == branch.branch()) {
        return Ok(branch.clone());
    }

    let default_from = if existing.contains(&config.default_branch) {
        config.default_branch.clone()
    } else {
        existing[0].clone()
    };

    let start_new = decisions.confirm(
        &format!(
            "Database [{}] doesn't have a branch [{}]. Would you like to start a new branch?",
            database,
            branch.branch()
        ),
        true,
    )?;

    if start_new {
        let from = decisions.select(
            "From which branch should I fork the new branch?",
            &existing,
            Some(default_from.as_str()),
        )?;
        remote.create_branch(
            branch,
            &CreateBranchRequest {
                from: Some(from.clone()),
                metadata: Some(metadata),
            },
        )?;
        writeln!(
            out,
            "Branch [{}] created starting from the schema of [{}]",
            branch.branch(),
            from
        )?;
        Ok(branch.clone())
    } else {
        let chosen = decisions.select(
            "To which existing branch should I deploy?",
            &existing,
            Some(default_from.as_str()),
        )?;
        Ok(branch.with_branch(chosen)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{Answer, NonInteractive, ScriptedDecisions};
    use crate::transport::{MockRemote, RemoteCall};
    use schemasync_protocol::{BranchDetails, BranchSummary};

    fn summaries(names: &[&str]) -> Vec<BranchSummary> {
        names
            .iter()
            .map(|n| BranchSummary {
                name: n.to_string(),
                created_at: None,
            })
            .collect()
    }

    fn branch(name: &str) -> BranchRef {
        BranchRef::new("blog", name).unwrap()
    }

    #[test]
    fn existing_branch_is_left_alone() {
        let remote = MockRemote::new();
        remote.push_branch_details(Ok(Some(BranchDetails::default())));
        assert!(!ensure_branch_exists(&remote, &branch("main"), &mut std::io::sink()).unwrap());
        assert_eq!(remote.calls().len(), 1);
    }

    #[test]
    fn missing_database_is_created_with_branch() {
        let remote = MockRemote::new();
        remote.push_branch_details(Ok(None));
        remote.push_branches(Ok(None));
        let mut out = Vec::new();

        assert!(ensure_branch_exists(&remote, &branch("dev"), &mut out).unwrap());
        assert_eq!(
            remote.calls()[2],
            RemoteCall::CreateDatabase {
                database: "blog".into(),
                branch: "dev".into(),
            }
        );
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Created database [blog] with branch [dev]\n"
        );
    }

    #[test]
    fn missing_branch_forks_first_listed_branch() {
        let remote = MockRemote::new();
        remote.push_branch_details(Ok(None));
        remote.push_branches(Ok(Some(summaries(&["staging", "main"]))));

        assert!(ensure_branch_exists(&remote, &branch("dev"), &mut std::io::sink()).unwrap());
        assert_eq!(
            remote.calls()[2],
            RemoteCall::CreateBranch {
                branch: "blog:dev".into(),
                from: Some("staging".into()),
            }
        );
    }

    #[test]
    fn database_without_branches_is_a_conflict() {
        let remote = MockRemote::new();
        remote.push_branches(Ok(Some(vec![])));
        let err = create_branch(&remote, &branch("dev"), &mut std::io::sink()).unwrap_err();
        assert!(matches!(err, SyncError::Conflict(_)));
    }

    #[test]
    fn deploy_creates_database_when_empty() {
        let remote = MockRemote::new();
        remote.push_branches(Ok(None));
        let config = EngineConfig::default();

        let target = resolve_deploy_branch(
            &remote,
            &NonInteractive,
            &config,
            &branch("main"),
            BranchMetadata::default(),
            &mut std::io::sink(),
        )
        .unwrap();
        assert_eq!(target, branch("main"));
        assert!(matches!(remote.calls()[1], RemoteCall::CreateDatabase { .. }));
    }

    #[test]
    fn deploy_uses_existing_branch_without_prompting() {
        let remote = MockRemote::new();
        remote.push_branches(Ok(Some(summaries(&["main", "dev"]))));
        let config = EngineConfig::default();

        let target = resolve_deploy_branch(
            &remote,
            &NonInteractive,
            &config,
            &branch("dev"),
            BranchMetadata::default(),
            &mut std::io::sink(),
        )
        .unwrap();
        assert_eq!(target, branch("dev"));
        assert_eq!(remote.calls().len(), 1);
    }

    #[test]
    fn deploy_forks_new_branch_with_metadata() {
        let remote = MockRemote::new();
        remote.push_branches(Ok(Some(summaries(&["staging", "main"]))));
        let decisions = ScriptedDecisions::new([Answer::Confirm(true), Answer::Select("main".into())]);
        let config = EngineConfig::default();
        let mut out = Vec::new();

        let target = resolve_deploy_branch(
            &remote,
            &decisions,
            &config,
            &branch("feature-x"),
            BranchMetadata {
                repository: Some("github.com/acme/blog".into()),
                branch: Some("feature-x".into()),
            },
            &mut out,
        )
        .unwrap();

        assert_eq!(target, branch("feature-x"));
        assert_eq!(
            remote.calls()[1],
            RemoteCall::CreateBranch {
                branch: "blog:feature-x".into(),
                from: Some("main".into()),
            }
        );
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Branch [feature-x] created starting from the schema of [main]\n"
        );
    }

    #[test]
    fn deploy_can_target_another_existing_branch() {
        let remote = MockRemote::new();
        remote.push_branches(Ok(Some(summaries(&["main", "staging"]))));
        let decisions =
            ScriptedDecisions::new([Answer::Confirm(false), Answer::Select("staging".into())]);
        let config = EngineConfig::default();

        let target = resolve_deploy_branch(
            &remote,
            &decisions,
            &config,
            &branch("feature-x"),
            BranchMetadata::default(),
            &mut std::io::sink(),
        )
        .unwrap();
        assert_eq!(target, branch("staging"));
        assert_eq!(remote.calls().len(), 1);
    }

    #[test]
    fn deploy_to_missing_branch_needs_a_user() {
        let remote = MockRemote::new();
        remote.push_branches(Ok(Some(summaries(&["main"]))));
        let config = EngineConfig::default();

        let err = resolve_deploy_branch(
            &remote,
            &NonInteractive,
            &config,
            &branch("feature-x"),
            BranchMetadata::default(),
            &mut std::io::sink(),
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
    }
}
