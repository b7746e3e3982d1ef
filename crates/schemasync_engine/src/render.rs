//! Plain-text rendering of migrations.
//!
//! Entries are rendered in the order the service listed them.

use schemasync_protocol::{Migration, StartedFrom};
use std::fmt::Write;

const INDENT: &str = "  ";

/// Renders the diff of a migration, one change per line.
///
/// ```text
/// CREATE table users
/// DELETE table drafts
/// RENAME table post TO posts
/// Table [posts]:
///   ADD column slug
///   DELETE column body
///   MODIFY column title
/// ```
pub fn render_migration(migration: &Migration) -> String {
    let mut out = String::new();

    for table in migration.new_tables.iter().flat_map(|t| t.keys()) {
        let _ = writeln!(out, "CREATE table {}", table);
    }
    for table in migration.removed_tables.iter().flatten() {
        let _ = writeln!(out, "DELETE table {}", table);
    }
    for rename in migration.renamed_tables.iter().flatten() {
        let _ = writeln!(out, "RENAME table {} TO {}", rename.old_name, rename.new_name);
    }

    for (table, changes) in migration.table_migrations.iter().flatten() {
        let _ = writeln!(out, "Table [{}]:", table);
        for column in changes.new_columns.iter().flat_map(|c| c.keys()) {
            let _ = writeln!(out, "{}ADD column {}", INDENT, column);
        }
        for column in changes.removed_columns.iter().flatten() {
            let _ = writeln!(out, "{}DELETE column {}", INDENT, column);
        }
        // Only the previous name is shown.
        for column in changes.modified_columns.iter().flatten() {
            let _ = writeln!(out, "{}MODIFY column {}", INDENT, column.old.name);
        }
    }

    out
}

/// Renders a migration history entry: its metadata followed by its diff.
pub fn render_history_entry(migration: &Migration) -> String {
    let mut out = String::new();

    if let Some(title) = &migration.title {
        let _ = writeln!(
            out,
            "* {} [status: {}]",
            title,
            migration.status.as_deref().unwrap_or_default()
        );
    }
    if let Some(id) = &migration.id {
        let _ = writeln!(out, "ID: {}", id);
    }
    if let Some(sha) = &migration.last_git_revision {
        let _ = write!(out, "git commit sha1: {}", sha);
        if migration.local_changes {
            out.push_str(" + local changes");
        }
        out.push('\n');
    }
    if let Some(at) = &migration.created_at {
        let _ = writeln!(out, "Date: {}", at.format("%Y-%m-%d %H:%M:%S %Z"));
    }

    out.push_str(&render_migration(migration));
    out
}

/// Renders the fork marker printed after a branch's own migrations.
pub fn render_origin(origin: &StartedFrom) -> String {
    format!(
        "➜ created by copying schema from branch [{} @ {}]\n",
        origin.branch_name, origin.migration_id
    )
}
