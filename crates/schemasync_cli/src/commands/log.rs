//! Print the migration history of the current branch.

use super::Context;
use schemasync_engine::{render_history_entry, render_origin, LineageEntry, LineageWalker};

/// Runs the log command.
pub fn run(ctx: &Context, follow: bool) -> Result<(), Box<dyn std::error::Error>> {
    let settings = ctx.settings()?;
    let branch = ctx.project_branch(&settings)?;
    let remote = ctx.connect(&settings)?;

    let entries = LineageWalker::new(&remote, &ctx.engine).walk(&branch, follow)?;

    println!("Migrations log of [{}]:\n", settings.db_name);
    for entry in &entries {
        match entry {
            LineageEntry::Migration { migration, .. } => {
                println!("{}", render_history_entry(migration));
            }
            LineageEntry::Origin { origin, .. } => {
                println!("{}", render_origin(origin));
            }
        }
    }
    Ok(())
}
