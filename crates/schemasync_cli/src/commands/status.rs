//! Show the git status of the local schema file.

use super::Context;
use crate::git;

/// Runs the status command.
pub fn run(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let settings = ctx.settings()?;
    let path = settings.schema_path();
    if !path.exists() {
        return Err(format!("Schema file [{}] doesn't exist", path.display()).into());
    }

    let sha = git::last_sha().ok_or("Error getting git sha: not inside a git repository")?;
    let status = if git::has_local_changes(&path) { "modified" } else { "" };
    println!("{}: {} {}", path.display(), sha, status);
    Ok(())
}
