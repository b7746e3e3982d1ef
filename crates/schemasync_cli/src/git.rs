//! Git provenance of the working tree.
//!
//! Every lookup is best effort: outside a repository, or without a `git`
//! binary, the values are simply unknown.

use heck::ToKebabCase;
use schemasync_engine::Provenance;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Database branch used when the git branch is unknown.
pub const DEFAULT_BRANCH: &str = "main";

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        debug!(?args, status = ?output.status, "git command failed");
        return None;
    }
    String::from_utf8(output.stdout).ok()
}

/// SHA of `HEAD`.
pub fn last_sha() -> Option<String> {
    git(&["rev-parse", "HEAD"])
        .map(|out| out.trim().to_string())
        .filter(|sha| !sha.is_empty())
}

/// Whether `file` is untracked or modified.
pub fn has_local_changes(file: &Path) -> bool {
    let file = file.to_string_lossy();
    git(&["-c", "color.status=false", "status", "-s", &file])
        .map(|out| is_change_status(&out))
        .unwrap_or(false)
}

fn is_change_status(status: &str) -> bool {
    status.starts_with("??") || status.starts_with(" M") || status.starts_with("M ")
}

/// Repository directory name and current branch.
pub fn repo_and_branch() -> Option<(String, String)> {
    let out = git(&["rev-parse", "--show-toplevel", "--abbrev-ref", "HEAD"])?;
    let mut lines = out.lines().map(str::trim);
    let toplevel = lines.next()?;
    let branch = lines.next()?;
    let repo = Path::new(toplevel)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())?;
    Some((repo, branch.to_string()))
}

/// Database branch name for a git branch: kebab-cased, `main` when unknown.
pub fn database_branch(git_branch: Option<&str>) -> String {
    match git_branch.map(|b| b.to_kebab_case()) {
        Some(branch) if !branch.is_empty() => branch,
        _ => DEFAULT_BRANCH.to_string(),
    }
}

/// Provenance recorded on migrations of `schema_file`.
pub fn provenance(schema_file: &Path) -> Provenance {
    match last_sha() {
        Some(sha) => Provenance {
            local_changes: has_local_changes(schema_file),
            git_revision: Some(sha),
        },
        None => Provenance::default(),
    }
}
