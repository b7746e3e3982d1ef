//! Pulling a branch schema into the local schema file.

use crate::config::EngineConfig;
use crate::decision::DecisionProvider;
use crate::error::{SyncError, SyncResult};
use crate::transport::RemoteService;
use schemasync_protocol::{BranchDetails, BranchRef};
use schemasync_schema::{serialize_schema, SchemaFormat};
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Backup of a file about to be overwritten.
///
/// The existing file is copied to `<path><suffix>` when the guard is created.
/// Dropping the guard without [`commit`](Self::commit) copies the backup back
/// over `path`. The backup itself is never removed.
#[derive(Debug)]
pub struct SchemaFileGuard {
    path: PathBuf,
    backup: Option<PathBuf>,
    committed: bool,
}

impl SchemaFileGuard {
    /// Backs up `path` if it exists.
    pub fn create(path: &Path, suffix: &str) -> SyncResult<Self> {
        let backup = if path.exists() {
            let backup = backup_path(path, suffix);
            fs::copy(path, &backup).map_err(|e| {
                SyncError::Io(std::io::Error::new(
                    e.kind(),
                    format!("creating backup {}: {}", backup.display(), e),
                ))
            })?;
            info!(path = %path.display(), backup = %backup.display(), "backup created");
            Some(backup)
        } else {
            None
        };
        Ok(Self {
            path: path.to_path_buf(),
            backup,
            committed: false,
        })
    }

    /// Returns the backup file, if one was made.
    pub fn backup(&self) -> Option<&Path> {
        self.backup.as_deref()
    }

    /// Keeps the new contents of the file.
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for SchemaFileGuard {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let Some(backup) = &self.backup else {
            return;
        };
        match fs::copy(backup, &self.path) {
            Ok(_) => info!(path = %self.path.display(), "schema file restored from backup"),
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "failed to restore schema file from backup"
            ),
        }
    }
}

/// `<path><suffix>`, keeping non UTF-8 paths intact.
pub fn backup_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Result of a pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullSummary {
    /// Branch the schema was taken from; may differ from the requested one.
    pub branch: BranchRef,
    /// Schema file written.
    pub path: PathBuf,
    /// Backup of the previous schema file.
    pub backup: Option<PathBuf>,
}

/// Overwrites the schema file at `path` with the schema of `branch`.
///
/// The existing file is backed up first and restored if anything fails. When
/// `branch` does not exist an interactive user may pick another branch of the
/// same database; without a user this is a conflict.
pub fn pull_schema<R, D, W>(
    remote: &R,
    decisions: &D,
    config: &EngineConfig,
    branch: &BranchRef,
    path: &Path,
    format: SchemaFormat,
    out: &mut W,
) -> SyncResult<PullSummary>
where
    R: RemoteService + ?Sized,
    D: DecisionProvider + ?Sized,
    W: Write + ?Sized,
{
    let guard = SchemaFileGuard::create(path, &config.backup_suffix)?;

    let (branch, details) = fetch_or_substitute(remote, decisions, config, branch, out)?;

    let mut schema = details.schema;
    schema.format_version = config.schema_format_version.clone();
    let bytes = serialize_schema(&schema, format)?;
    fs::write(path, bytes).map_err(|e| {
        SyncError::Io(std::io::Error::new(
            e.kind(),
            format!("writing {}: {}", path.display(), e),
        ))
    })?;

    let backup = guard.backup().map(Path::to_path_buf);
    guard.commit();
    info!(branch = %branch, path = %path.display(), "schema pulled");
    writeln!(out, "Schema of [{}] written in: {}", branch, path.display())?;
    Ok(PullSummary {
        branch,
        path: path.to_path_buf(),
        backup,
    })
}

fn fetch_or_substitute<R, D, W>(
    remote: &R,
    decisions: &D,
    config: &EngineConfig,
    branch: &BranchRef,
    out: &mut W,
) -> SyncResult<(BranchRef, BranchDetails)>
where
    R: RemoteService + ?Sized,
    D: DecisionProvider + ?Sized,
    W: Write + ?Sized,
{
    if let Some(details) = remote.branch_details(branch)? {
        return Ok((branch.clone(), details));
    }

    if !decisions.is_interactive() {
        return Err(SyncError::conflict(format!("branch [{}] does not exist", branch)));
    }

    let existing: Vec<String> = remote
        .list_branches(branch.database())?
        .unwrap_or_default()
        .into_iter()
        .map(|b| b.name)
        .collect();
    if existing.is_empty() {
        return Err(SyncError::conflict(format!(
            "database [{}] has no branches",
            branch.database()
        )));
    }

    let default = existing
        .iter()
        .find(|b| **b == config.default_branch)
        .map(String::as_str);
    let chosen = decisions.select(
        &format!(
            "Branch [{}] doesn't exist. Which branch should I pull the schema from?",
            branch
        ),
        &existing,
        default,
    )?;
    let substitute = branch.with_branch(chosen)?;
    writeln!(out, "Pulling schema from branch [{}]", substitute)?;

    let details = remote
        .branch_details(&substitute)?
        .ok_or_else(|| SyncError::conflict(format!("branch [{}] does not exist", substitute)))?;
    Ok((substitute, details))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{Answer, NonInteractive, ScriptedDecisions};
    use crate::transport::MockRemote;
    use schemasync_protocol::BranchSummary;
    use schemasync_schema::{parse_schema, Column, ColumnType, Schema, Table};
    use tempfile::tempdir;

    const OLD: &[u8] = b"{\n  \"formatVersion\": \"0.9\",\n  \"tables\": []\n}\n";

    fn branch(name: &str) -> BranchRef {
        BranchRef::new("blog", name).unwrap()
    }

    fn details() -> BranchDetails {
        let mut schema = Schema::new(vec![Table::new(
            "posts",
            vec![Column::new("title", ColumnType::String)],
        )]);
        schema.format_version = "0.1".into();
        BranchDetails {
            database_name: "blog".into(),
            branch_name: "main".into(),
            metadata: None,
            schema,
        }
    }

    #[test]
    fn backup_path_appends_suffix() {
        assert_eq!(
            backup_path(Path::new("/tmp/schema.json"), ".bak"),
            PathBuf::from("/tmp/schema.json.bak")
        );
    }

    #[test]
    fn pull_writes_schema_and_keeps_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("schema.json");
        fs::write(&path, OLD).unwrap();
        let remote = MockRemote::new();
        remote.push_branch_details(Ok(Some(details())));

        let summary = pull_schema(
            &remote,
            &NonInteractive,
            &EngineConfig::default(),
            &branch("main"),
            &path,
            SchemaFormat::Json,
            &mut std::io::sink(),
        )
        .unwrap();

        assert_eq!(summary.branch, branch("main"));
        assert_eq!(fs::read(dir.path().join("schema.json.bak")).unwrap(), OLD);
        let pulled = parse_schema(&fs::read(&path).unwrap(), SchemaFormat::Json).unwrap();
        assert_eq!(pulled.format_version, "1.0");
        assert_eq!(pulled.tables, details().schema.tables);
    }

    #[test]
    fn pull_without_existing_file_makes_no_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("schema.yaml");
        let remote = MockRemote::new();
        remote.push_branch_details(Ok(Some(details())));

        let summary = pull_schema(
            &remote,
            &NonInteractive,
            &EngineConfig::default(),
            &branch("main"),
            &path,
            SchemaFormat::Yaml,
            &mut std::io::sink(),
        )
        .unwrap();

        assert!(summary.backup.is_none());
        assert!(!dir.path().join("schema.yaml.bak").exists());
        let pulled = parse_schema(&fs::read(&path).unwrap(), SchemaFormat::Yaml).unwrap();
        assert_eq!(pulled.tables.len(), 1);
    }

    #[test]
    fn failed_pull_restores_file_and_keeps_identical_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("schema.json");
        fs::write(&path, OLD).unwrap();
        let remote = MockRemote::new();
        remote.push_branch_details(Err(SyncError::network(500, "boom")));

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
        assert_eq!(fs::read(&path).unwrap(), OLD);
        assert_eq!(fs::read(dir.path().join("schema.json.bak")).unwrap(), OLD);
    }

    #[test]
    fn guard_restores_on_drop_unless_committed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("schema.json");
        fs::write(&path, b"before").unwrap();

        {
            let _guard = SchemaFileGuard::create(&path, ".bak").unwrap();
            fs::write(&path, b"half written").unwrap();
        }
        assert_eq!(fs::read(&path).unwrap(), b"before");

        let guard = SchemaFileGuard::create(&path, ".bak").unwrap();
        fs::write(&path, b"after").unwrap();
        guard.commit();
        assert_eq!(fs::read(&path).unwrap(), b"after");
        assert_eq!(fs::read(dir.path().join("schema.json.bak")).unwrap(), b"before");
    }

    #[test]
    fn missing_branch_without_user_is_a_conflict() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("schema.json");
        fs::write(&path, OLD).unwrap();
        let remote = MockRemote::new();
        remote.push_branch_details(Ok(None));

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
        assert_eq!(fs::read(&path).unwrap(), OLD);
    }

    #[test]
    fn missing_branch_can_be_substituted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("schema.json");
        let remote = MockRemote::new();
        remote.push_branch_details(Ok(None));
        remote.push_branches(Ok(Some(vec![
            BranchSummary {
                name: "main".into(),
                created_at: None,
            },
            BranchSummary {
                name: "staging".into(),
                created_at: None,
            },
        ])));
        remote.push_branch_details(Ok(Some(details())));
        let decisions = ScriptedDecisions::new([Answer::Select("staging".into())]);
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

        assert_eq!(summary.branch, branch("staging"));
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("[blog:staging]"));
        assert!(!out.contains("blog:feature"));
    }
}
