//! Streaming load of a dump directory into a branch.

use crate::branches::create_branch;
use crate::cancel::CancelToken;
use crate::decision::{Approval, DecisionProvider};
use crate::error::{SyncError, SyncResult};
use crate::export::{table_file, DUMP_SCHEMA_FILE};
use crate::migrate::{MigrationOutcome, Migrator};
use crate::transport::RemoteService;
use schemasync_protocol::{BranchRef, ID_FIELD, META_FIELD};
use schemasync_schema::{is_valid_identifier, parse_schema, Column, ColumnType, Schema, SchemaFormat, Table};
use serde_json::{Map, Value};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use tracing::{debug, info};

/// Result of loading one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableImport {
    /// Table name.
    pub table: String,
    /// Records inserted.
    pub records: usize,
}

/// Result of a load.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSummary {
    /// Whether the branch (or its database) had to be created.
    pub branch_created: bool,
    /// Outcome of the schema migration.
    pub migration: MigrationOutcome,
    /// Per-table results in schema order.
    pub tables: Vec<TableImport>,
}

/// Loads dump directories into branches.
pub struct Importer<'a, R: ?Sized, D: ?Sized> {
    remote: &'a R,
    decisions: &'a D,
    cancel: CancelToken,
}

impl<'a, R, D> Importer<'a, R, D>
where
    R: RemoteService + ?Sized,
    D: DecisionProvider + ?Sized,
{
    /// Creates an importer.
    pub fn new(remote: &'a R, decisions: &'a D) -> Self {
        Self {
            remote,
            decisions,
            cancel: CancelToken::new(),
        }
    }

    /// Uses `cancel` to stop the load between records.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Loads the dump in `dir` into `branch`.
    ///
    /// The dumped schema is read first, so a bad dump touches nothing remote.
    /// The branch is then created when missing, migrated to the dumped schema
    /// (without asking when it was just created), and every table file is
    /// replayed in schema order. Declining the migration cancels the load.
    pub fn load_branch<W: Write + ?Sized>(
        &self,
        branch: &BranchRef,
        dir: &Path,
        approval: Approval,
        out: &mut W,
    ) -> SyncResult<ImportSummary> {
        let schema = read_dump_schema(dir)?;

        self.cancel.check()?;
        let branch_created = match self.remote.branch_details(branch)? {
            Some(_) => false,
            None => {
                writeln!(out, "Branch [{}] does not exist. Creating it...", branch)?;
                create_branch(self.remote, branch, out)?;
                true
            }
        };

        let approval = if branch_created {
            Approval::AutoApprove
        } else {
            approval
        };
        let migration = Migrator::new(self.remote, self.decisions).run(
            branch,
            &schema,
            approval,
            None,
            out,
        )?;
        if migration == MigrationOutcome::Declined {
            return Err(SyncError::Cancelled);
        }

        let mut tables = Vec::with_capacity(schema.tables.len());
        for table in &schema.tables {
            let records = self.load_table(branch, table, &table_file(dir, &table.name))?;
            writeln!(out, "Table [{}] loaded: {} records", table.name, records)?;
            tables.push(TableImport {
                table: table.name.clone(),
                records,
            });
        }

        info!(branch = %branch, tables = tables.len(), "branch loaded");
        Ok(ImportSummary {
            branch_created,
            migration,
            tables,
        })
    }

    /// Replays one table file; returns the number of records inserted.
    ///
    /// Stops at the first failing line. Records before it stay inserted.
    pub fn load_table(&self, branch: &BranchRef, table: &Table, path: &Path) -> SyncResult<usize> {
        let file = File::open(path).map_err(|e| {
            SyncError::partial_write(
                &table.name,
                0,
                format!("opening table file {}: {}", path.display(), e),
            )
        })?;

        let mut inserted = 0;
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line_no = index + 1;
            let line = line.map_err(|e| SyncError::partial_write(&table.name, line_no, e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }

            let (id, record) = prepare_record(&table.columns, &line)
                .map_err(|message| SyncError::partial_write(&table.name, line_no, message))?;

            self.cancel.check()?;
            match self.remote.insert_record_with_id(branch, &table.name, &id, &record) {
                Ok(()) => {}
                Err(e) if e.is_unauthorized() => return Err(e),
                Err(e) => {
                    return Err(SyncError::partial_write(
                        &table.name,
                        line_no,
                        format!("inserting record [{}]: {}", id, e),
                    ))
                }
            }
            debug!(table = %table.name, line = line_no, id = %id, "record inserted");
            inserted += 1;
        }
        Ok(inserted)
    }
}

/// Reads `schema.json` from a dump directory.
pub fn read_dump_schema(dir: &Path) -> SyncResult<Schema> {
    let path = dir.join(DUMP_SCHEMA_FILE);
    let bytes = fs::read(&path).map_err(|e| {
        SyncError::validation(format!("reading schema file {}: {}", path.display(), e))
    })?;
    Ok(parse_schema(&bytes, SchemaFormat::Json)?)
}

/// Turns one dump line into the id and the insertable record.
fn prepare_record(columns: &[Column], line: &str) -> Result<(String, Map<String, Value>), String> {
    let mut record = match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(record)) => record,
        Ok(_) => return Err("record is not a JSON object".to_string()),
        Err(e) => return Err(format!("parsing json: {}", e)),
    };

    let id = match record.remove(ID_FIELD) {
        Some(Value::String(id)) => id,
        Some(_) => return Err("id should be a string".to_string()),
        None => return Err("record has no id".to_string()),
    };
    if !is_valid_identifier(&id) {
        return Err(format!("invalid record id `{}`", id));
    }
    record.remove(META_FIELD);

    strip_links(columns, &mut record)?;
    Ok((id, record))
}

/// Removes the values of link columns, descending into object columns.
///
/// Link values are ids of the source branch and cannot be replayed. A `null`
/// object value is kept; any other non-object value is an error.
pub fn strip_links(columns: &[Column], record: &mut Map<String, Value>) -> Result<(), String> {
    for column in columns {
        match column.column_type {
            ColumnType::Link => {
                record.remove(&column.name);
            }
            ColumnType::Object => match record.get_mut(&column.name) {
                None | Some(Value::Null) => {}
                Some(Value::Object(nested)) => strip_links(&column.columns, nested)?,
                Some(_) => {
                    return Err(format!(
                        "unexpected non-object value for column {}",
                        column.name
                    ))
                }
            },
            _ => {}
        }
    }
    Ok(())
}
