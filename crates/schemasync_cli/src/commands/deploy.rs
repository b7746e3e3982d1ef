//! Deploy the local schema to the branch matching the git branch.

use super::Context;
use crate::git;
use crate::terminal::TerminalDecisions;
use schemasync_engine::{resolve_deploy_branch, MigrationOutcome, Migrator};
use schemasync_protocol::BranchMetadata;
use std::io;
use tracing::info;

/// Runs the deploy command.
pub fn run(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let settings = ctx.settings()?;
    let schema = settings.read_schema()?;
    let branch = ctx.project_branch(&settings)?;
    let remote = ctx.connect(&settings)?;
    let decisions = TerminalDecisions::stdio();
    let mut out = io::stdout();

    let metadata = BranchMetadata {
        repository: git::repo_and_branch().map(|(repo, _)| repo),
        branch: Some(branch.branch().to_string()),
    };
    let target = resolve_deploy_branch(&remote, &decisions, &ctx.engine, &branch, metadata, &mut out)?;

    let provenance = git::provenance(&settings.schema_path());
    let outcome = Migrator::new(&remote, &decisions).run(
        &target,
        &schema,
        ctx.approval(),
        Some(&provenance),
        &mut out,
    )?;
    if outcome == MigrationOutcome::Declined {
        info!(branch = %target, "migration declined");
    }
    Ok(())
}
