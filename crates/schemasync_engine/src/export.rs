//! Paginated dump of a branch to a directory of line-delimited records.
//!
//! Layout of a dump directory:
//!
//! ```text
//! <dir>/schema.json        branch schema, pretty JSON
//! <dir>/<table>.ndjson     one JSON object per record
//! ```

use crate::cancel::CancelToken;
use crate::config::EngineConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::RemoteService;
use schemasync_protocol::{BranchRef, QueryRequest};
use schemasync_schema::{serialize_schema, SchemaFormat};
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of the schema inside a dump directory.
pub const DUMP_SCHEMA_FILE: &str = "schema.json";

/// Extension of the per-table record files.
pub const TABLE_FILE_EXTENSION: &str = "ndjson";

/// Path of the record file of `table` inside a dump directory.
pub fn table_file(dir: &Path, table: &str) -> PathBuf {
    dir.join(format!("{}.{}", table, TABLE_FILE_EXTENSION))
}

/// Result of dumping one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableExport {
    /// Table name.
    pub table: String,
    /// Records written.
    pub records: usize,
    /// Pages fetched.
    pub pages: usize,
    /// File written.
    pub path: PathBuf,
}

/// Result of a dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Schema file written.
    pub schema_path: PathBuf,
    /// Per-table results in schema order.
    pub tables: Vec<TableExport>,
}

/// Dumps branches to disk.
pub struct Exporter<'a, R: ?Sized> {
    remote: &'a R,
    config: &'a EngineConfig,
    cancel: CancelToken,
}

impl<'a, R: RemoteService + ?Sized> Exporter<'a, R> {
    /// Creates an exporter.
    pub fn new(remote: &'a R, config: &'a EngineConfig) -> Self {
        Self {
            remote,
            config,
            cancel: CancelToken::new(),
        }
    }

    /// Uses `cancel` to stop the dump between pages.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Dumps the schema and every table of `branch` into `dir`.
    ///
    /// `dir` must not exist yet. Progress lines are written to `out`.
    pub fn dump_branch<W: Write + ?Sized>(
        &self,
        branch: &BranchRef,
        dir: &Path,
        out: &mut W,
    ) -> SyncResult<ExportSummary> {
        if dir.exists() {
            return Err(SyncError::AlreadyExists {
                path: dir.to_path_buf(),
            });
        }

        self.cancel.check()?;
        let details = self
            .remote
            .branch_details(branch)?
            .ok_or_else(|| SyncError::conflict(format!("branch [{}] does not exist", branch)))?;

        create_output_dir(dir)?;

        let schema_path = dir.join(DUMP_SCHEMA_FILE);
        fs::write(&schema_path, serialize_schema(&details.schema, SchemaFormat::Json)?)?;
        writeln!(out, "Schema file written in: {}", schema_path.display())?;

        let mut tables = Vec::with_capacity(details.schema.tables.len());
        for table in &details.schema.tables {
            tables.push(self.dump_table(branch, &table.name, dir, out)?);
        }

        info!(branch = %branch, tables = tables.len(), "branch dumped");
        Ok(ExportSummary {
            schema_path,
            tables,
        })
    }

    /// Dumps one table into `<dir>/<table>.ndjson`.
    ///
    /// The file must not exist. A failure after the file was opened is
    /// reported as [`SyncError::ExportInterrupted`], except rejected
    /// credentials which propagate unchanged.
    pub fn dump_table<W: Write + ?Sized>(
        &self,
        branch: &BranchRef,
        table: &str,
        dir: &Path,
        out: &mut W,
    ) -> SyncResult<TableExport> {
        let path = table_file(dir, table);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => SyncError::AlreadyExists { path: path.clone() },
                _ => SyncError::Io(e),
            })?;
        let mut writer = BufWriter::new(file);

        let mut pages = 0;
        let mut records = 0;
        let mut cursor: Option<String> = None;

        let result = loop {
            match self.dump_page(branch, table, cursor.clone(), &mut writer) {
                Ok((count, next, more)) => {
                    pages += 1;
                    records += count;
                    debug!(table, page = pages, records = count, "page written");
                    if !more {
                        break writer.flush().map_err(SyncError::from);
                    }
                    if next.is_empty() || cursor.as_deref() == Some(next.as_str()) {
                        break Err(SyncError::conflict(format!(
                            "server returned cursor `{}` for table [{}] without advancing",
                            next, table
                        )));
                    }
                    if let Err(e) = writeln!(out, "Continuing with {}", next) {
                        break Err(e.into());
                    }
                    cursor = Some(next);
                }
                Err(e) => break Err(e),
            }
        };

        match result {
            Ok(()) => {
                writeln!(out, "Table {} dumped to {}", table, path.display())?;
                info!(table, records, pages, "table dumped");
                Ok(TableExport {
                    table: table.to_string(),
                    records,
                    pages,
                    path,
                })
            }
            Err(e) if e.is_unauthorized() => Err(e),
            Err(e) => Err(SyncError::ExportInterrupted {
                table: table.to_string(),
                pages_completed: pages,
                last_cursor: cursor,
                source: Box::new(e),
            }),
        }
    }

    /// Fetches one page and appends it; returns (records, cursor, more).
    fn dump_page<F: Write>(
        &self,
        branch: &BranchRef,
        table: &str,
        after: Option<String>,
        writer: &mut F,
    ) -> SyncResult<(usize, String, bool)> {
        self.cancel.check()?;
        let request = QueryRequest::page(self.config.page_size, after);
        let page = self.remote.query_table(branch, table, &request)?;

        for record in &page.records {
            serde_json::to_writer(&mut *writer, &record.to_object())?;
            writer.write_all(b"\n")?;
        }
        Ok((page.records.len(), page.meta.page.cursor, page.meta.page.more))
    }
}

fn create_output_dir(dir: &Path) -> SyncResult<()> {
    if let Some(parent) = dir.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::create_dir(dir).map_err(|e| match e.kind() {
        io::ErrorKind::AlreadyExists => SyncError::AlreadyExists {
            path: dir.to_path_buf(),
        },
        _ => SyncError::Io(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockRemote, RemoteCall};
    use schemasync_protocol::{BranchDetails, PageInfo, QueryMeta, QueryPage, Record};
    use schemasync_schema::{Column, ColumnType, Schema, Table};
    use serde_json::{json, Map, Value};
    use tempfile::tempdir;

    fn branch() -> BranchRef {
        BranchRef::new("blog", "main").unwrap()
    }

    fn details(tables: &[&str]) -> BranchDetails {
        BranchDetails {
            database_name: "blog".into(),
            branch_name: "main".into(),
            metadata: None,
            schema: Schema::new(
                tables
                    .iter()
                    .map(|t| Table::new(*t, vec![Column::new("name", ColumnType::String)]))
                    .collect(),
            ),
        }
    }

    fn record(id: &str, name: &str) -> Record {
        let mut fields = Map::new();
        fields.insert("name".into(), Value::from(name));
        Record {
            id: id.into(),
            meta: Some(json!({"version": 0})),
            fields,
        }
    }

    fn page(records: Vec<Record>, cursor: &str, more: bool) -> QueryPage {
        QueryPage {
            records,
            meta: QueryMeta {
                page: PageInfo {
                    cursor: cursor.into(),
                    more,
                },
            },
        }
    }

    #[test]
    fn dumps_schema_and_paginated_records() {
        let root = tempdir().unwrap();
        let dir = root.path().join("dump");
        let remote = MockRemote::new();
        remote.push_branch_details(Ok(Some(details(&["users"]))));
        remote.push_page(Ok(page(vec![record("r1", "ada"), record("r2", "bob")], "c1", true)));
        remote.push_page(Ok(page(vec![record("r3", "cy")], "c2", false)));
        let config = EngineConfig::default().with_page_size(2);
        let mut out = Vec::new();

        let summary = Exporter::new(&remote, &config)
            .dump_branch(&branch(), &dir, &mut out)
            .unwrap();

        assert_eq!(summary.tables.len(), 1);
        assert_eq!(summary.tables[0].records, 3);
        assert_eq!(summary.tables[0].pages, 2);

        let schema = fs::read_to_string(dir.join("schema.json")).unwrap();
        assert!(schema.contains("\"formatVersion\": \"1.0\""));

        let lines: Vec<Value> = fs::read_to_string(dir.join("users.ndjson"))
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], json!({"id": "r1", "name": "ada", "_meta": {"version": 0}}));

        let calls = remote.calls();
        assert_eq!(
            calls[2],
            RemoteCall::QueryTable {
                branch: "blog:main".into(),
                table: "users".into(),
                after: Some("c1".into()),
            }
        );
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Continuing with c1\n"));
        assert!(text.contains("Table users dumped to "));
    }

    #[test]
    fn existing_output_dir_is_rejected_before_any_request() {
        let root = tempdir().unwrap();
        let remote = MockRemote::new();
        let config = EngineConfig::default();

        let err = Exporter::new(&remote, &config)
            .dump_branch(&branch(), root.path(), &mut std::io::sink())
            .unwrap_err();

        assert!(matches!(err, SyncError::AlreadyExists { .. }));
        assert!(remote.calls().is_empty());
    }

    #[test]
    fn missing_branch_creates_nothing() {
        let root = tempdir().unwrap();
        let dir = root.path().join("dump");
        let remote = MockRemote::new();
        remote.push_branch_details(Ok(None));
        let config = EngineConfig::default();

        let err = Exporter::new(&remote, &config)
            .dump_branch(&branch(), &dir, &mut std::io::sink())
            .unwrap_err();
        assert!(matches!(err, SyncError::Conflict(_)));
        assert!(!dir.exists());
    }

    #[test]
    fn failure_mid_pagination_reports_progress() {
        let root = tempdir().unwrap();
        let dir = root.path().join("dump");
        let remote = MockRemote::new();
        remote.push_branch_details(Ok(Some(details(&["users", "posts"]))));
        remote.push_page(Ok(page(vec![record("r1", "ada")], "c1", true)));
        remote.push_page(Err(SyncError::network(503, "unavailable")));
        let config = EngineConfig::default();

        let err = Exporter::new(&remote, &config)
            .dump_branch(&branch(), &dir, &mut std::io::sink())
            .unwrap_err();

        match err {
            SyncError::ExportInterrupted {
                table,
                pages_completed,
                last_cursor,
                source,
            } => {
                assert_eq!(table, "users");
                assert_eq!(pages_completed, 1);
                assert_eq!(last_cursor.as_deref(), Some("c1"));
                assert_eq!(source.status(), Some(503));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        // The completed page stays on disk; the next table was never started.
        let written = fs::read_to_string(dir.join("users.ndjson")).unwrap();
        assert_eq!(written.lines().count(), 1);
        assert!(!dir.join("posts.ndjson").exists());
    }

    #[test]
    fn unauthorized_is_not_wrapped() {
        let root = tempdir().unwrap();
        let dir = root.path().join("dump");
        let remote = MockRemote::new();
        remote.push_branch_details(Ok(Some(details(&["users"]))));
        remote.push_page(Err(SyncError::Unauthorized("expired".into())));
        let config = EngineConfig::default();

        let err = Exporter::new(&remote, &config)
            .dump_branch(&branch(), &dir, &mut std::io::sink())
            .unwrap_err();
        assert!(matches!(err, SyncError::Unauthorized(_)));
    }

    #[test]
    fn repeated_cursor_stops_the_dump() {
        let root = tempdir().unwrap();
        let dir = root.path().join("dump");
        let remote = MockRemote::new();
        remote.push_branch_details(Ok(Some(details(&["users"]))));
        remote.push_page(Ok(page(vec![record("r1", "ada")], "same", true)));
        remote.push_page(Ok(page(vec![record("r2", "bob")], "same", true)));
        remote.push_page(Ok(page(vec![record("r3", "cy")], "same", true)));
        let config = EngineConfig::default();

        let err = Exporter::new(&remote, &config)
            .dump_branch(&branch(), &dir, &mut std::io::sink())
            .unwrap_err();

        match err {
            SyncError::ExportInterrupted {
                pages_completed,
                last_cursor,
                source,
                ..
            } => {
                assert_eq!(pages_completed, 2);
                assert_eq!(last_cursor.as_deref(), Some("same"));
                assert!(matches!(*source, SyncError::Conflict(_)));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        // branch details plus two pages
        assert_eq!(remote.calls().len(), 3);
    }

    #[test]
    fn empty_cursor_with_more_pages_stops_the_dump() {
        let root = tempdir().unwrap();
        let dir = root.path().join("dump");
        let remote = MockRemote::new();
        remote.push_branch_details(Ok(Some(details(&["users"]))));
        remote.push_page(Ok(page(vec![record("r1", "ada")], "", true)));
        let config = EngineConfig::default();

        let err = Exporter::new(&remote, &config)
            .dump_branch(&branch(), &dir, &mut std::io::sink())
            .unwrap_err();

        assert!(matches!(
            err,
            SyncError::ExportInterrupted { pages_completed: 1, last_cursor: None, .. }
        ));
        assert_eq!(remote.calls().len(), 2);
    }

    /// Accepts the schema line, then refuses further progress output.
    struct FailingOut {
        lines: usize,
    }

    impl Write for FailingOut {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.lines >= 1 {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
            }
            self.lines += buf.iter().filter(|b| **b == b'\n').count();
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn progress_write_failure_keeps_export_position() {
        let root = tempdir().unwrap();
        let dir = root.path().join("dump");
        let remote = MockRemote::new();
        remote.push_branch_details(Ok(Some(details(&["users"]))));
        remote.push_page(Ok(page(vec![record("r1", "ada")], "c1", true)));
        let config = EngineConfig::default();

        let err = Exporter::new(&remote, &config)
            .dump_branch(&branch(), &dir, &mut FailingOut { lines: 0 })
            .unwrap_err();

        match err {
            SyncError::ExportInterrupted {
                table,
                pages_completed,
                source,
                ..
            } => {
                assert_eq!(table, "users");
                assert_eq!(pages_completed, 1);
                assert!(matches!(*source, SyncError::Io(_)));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn existing_table_file_is_not_overwritten() {
        let root = tempdir().unwrap();
        fs::write(root.path().join("users.ndjson"), "keep\n").unwrap();
        let remote = MockRemote::new();
        let config = EngineConfig::default();

        let err = Exporter::new(&remote, &config)
            .dump_table(&branch(), "users", root.path(), &mut std::io::sink())
            .unwrap_err();
        assert!(matches!(err, SyncError::AlreadyExists { .. }));
        assert_eq!(
            fs::read_to_string(root.path().join("users.ndjson")).unwrap(),
            "keep\n"
        );
    }
}
