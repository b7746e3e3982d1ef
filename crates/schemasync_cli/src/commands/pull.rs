//! Overwrite the local schema file with the branch schema.

use super::Context;
use crate::terminal::TerminalDecisions;
use schemasync_engine::pull_schema;
use std::io;

/// Runs the pull command.
pub fn run(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let settings = ctx.settings()?;
    let branch = ctx.project_branch(&settings)?;
    let remote = ctx.connect(&settings)?;
    let decisions = TerminalDecisions::stdio();

    pull_schema(
        &remote,
        &decisions,
        &ctx.engine,
        &branch,
        &settings.schema_path(),
        settings.format,
        &mut io::stdout(),
    )?;
    Ok(())
}
