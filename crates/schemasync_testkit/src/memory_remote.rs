//! A stateful in-memory remote service.
//!
//! [`MemoryRemote`] behaves like the real service closely enough for
//! end-to-end tests: it computes schema diffs, records applied migrations
//! with their parents, remembers where forked branches started, paginates
//! records and history, and validates written records against the schema.

use indexmap::IndexMap;
use parking_lot::Mutex;
use schemasync_engine::{RemoteService, SyncError, SyncResult};
use schemasync_protocol::{
    BranchDetails, BranchMetadata, BranchRef, BranchSummary, BulkInsertRequest, ColumnMigration,
    CreateBranchRequest, CreateDatabaseRequest, HistoryPage, HistoryRequest, Migration,
    MigrationPlan, PageInfo, QueryMeta, QueryPage, QueryRequest, Record, StartedFrom,
    TableMigration,
};
use schemasync_schema::{is_valid_identifier, Column, ColumnType, Schema, Table};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Page size used when a query does not ask for one.
pub const DEFAULT_QUERY_PAGE_SIZE: usize = 20;

/// Remote operations, for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// `branch_details`
    BranchDetails,
    /// `list_branches`
    ListBranches,
    /// `create_database`
    CreateDatabase,
    /// `create_branch`
    CreateBranch,
    /// `migration_plan`
    MigrationPlan,
    /// `execute_migration_plan`
    ExecuteMigrationPlan,
    /// `migration_history`
    MigrationHistory,
    /// `query_table`
    QueryTable,
    /// `insert_record_with_id`
    InsertRecord,
    /// `bulk_insert`
    BulkInsert,
}

#[derive(Debug, Clone)]
struct StoredRecord {
    fields: Map<String, Value>,
    version: u64,
}

#[derive(Debug, Clone, Default)]
struct BranchState {
    schema: Schema,
    metadata: Option<BranchMetadata>,
    /// Oldest first.
    migrations: Vec<Migration>,
    started_from: Option<StartedFrom>,
    tables: HashMap<String, IndexMap<String, StoredRecord>>,
}

#[derive(Debug)]
struct Failure {
    op: Op,
    nth: usize,
    error: SyncError,
}

#[derive(Debug, Default)]
struct State {
    databases: IndexMap<String, IndexMap<String, BranchState>>,
    calls: HashMap<Op, usize>,
    failures: Vec<Failure>,
    next_migration: u64,
    next_record: u64,
    history_limit: Option<usize>,
}

/// In-memory implementation of [`RemoteService`].
#[derive(Debug, Default)]
pub struct MemoryRemote {
    state: Mutex<State>,
}

fn not_found(what: impl std::fmt::Display) -> SyncError {
    SyncError::network(404, format!("{} not found", what))
}

fn bad_request(message: impl Into<String>) -> SyncError {
    SyncError::network(400, message)
}

impl MemoryRemote {
    /// Creates a service without databases.
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps history pages at `limit` migrations unless a request asks for fewer.
    pub fn with_history_limit(self, limit: usize) -> Self {
        self.state.lock().history_limit = Some(limit);
        self
    }

    /// Creates `branch` (and its database) with `schema`, recorded as one
    /// applied migration.
    pub fn seed_branch(&self, branch: &BranchRef, schema: Schema) {
        let mut state = self.state.lock();
        let current = state
            .databases
            .entry(branch.database().to_string())
            .or_default()
            .entry(branch.branch().to_string())
            .or_default()
            .schema
            .clone();
        let mut migration = diff(&current, &schema);
        migration.title = Some("initial schema".to_string());
        record_migration(&mut state, branch, migration);
        if let Some(b) = branch_mut(&mut state, branch) {
            b.schema = schema;
        }
    }

    /// Stores a record directly, bypassing validation.
    pub fn seed_record(&self, branch: &BranchRef, table: &str, id: &str, fields: Map<String, Value>) {
        let mut state = self.state.lock();
        if let Some(b) = branch_mut(&mut state, branch) {
            b.tables
                .entry(table.to_string())
                .or_default()
                .insert(id.to_string(), StoredRecord { fields, version: 0 });
        }
    }

    /// Makes the `nth` call (1-based, counted from now on) of `op` fail with `error`.
    pub fn fail_on(&self, op: Op, nth: usize, error: SyncError) {
        let mut state = self.state.lock();
        let done = state.calls.get(&op).copied().unwrap_or(0);
        state.failures.push(Failure {
            op,
            nth: done + nth,
            error,
        });
    }

    /// Number of calls of `op` so far, failed ones included.
    pub fn call_count(&self, op: Op) -> usize {
        self.state.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Current schema of `branch`.
    pub fn schema(&self, branch: &BranchRef) -> Option<Schema> {
        let state = self.state.lock();
        branch_ref(&state, branch).map(|b| b.schema.clone())
    }

    /// Records of `table` in insertion order, as `(id, fields)`.
    pub fn records(&self, branch: &BranchRef, table: &str) -> Vec<(String, Map<String, Value>)> {
        let state = self.state.lock();
        branch_ref(&state, branch)
            .and_then(|b| b.tables.get(table))
            .map(|records| {
                records
                    .iter()
                    .map(|(id, r)| (id.clone(), r.fields.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Applied migrations of `branch`, newest first.
    pub fn migrations(&self, branch: &BranchRef) -> Vec<Migration> {
        let state = self.state.lock();
        branch_ref(&state, branch)
            .map(|b| b.migrations.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    /// Counts the call and returns an injected failure, if one is due.
    fn enter(&self, op: Op) -> SyncResult<parking_lot::MutexGuard<'_, State>> {
        let mut state = self.state.lock();
        let count = {
            let count = state.calls.entry(op).or_insert(0);
            *count += 1;
            *count
        };
        if let Some(pos) = state
            .failures
            .iter()
            .position(|f| f.op == op && f.nth == count)
        {
            return Err(state.failures.remove(pos).error);
        }
        Ok(state)
    }
}

fn branch_ref<'a>(state: &'a State, branch: &BranchRef) -> Option<&'a BranchState> {
    state
        .databases
        .get(branch.database())
        .and_then(|db| db.get(branch.branch()))
}

fn branch_mut<'a>(state: &'a mut State, branch: &BranchRef) -> Option<&'a mut BranchState> {
    state
        .databases
        .get_mut(branch.database())
        .and_then(|db| db.get_mut(branch.branch()))
}

fn existing_mut<'a>(state: &'a mut State, branch: &BranchRef) -> SyncResult<&'a mut BranchState> {
    branch_mut(state, branch).ok_or_else(|| not_found(format!("branch [{}]", branch)))
}

/// Computes the migration turning `current` into `target`.
fn diff(current: &Schema, target: &Schema) -> Migration {
    let mut new_tables = IndexMap::new();
    let mut table_migrations = IndexMap::new();

    for table in &target.tables {
        match current.table(&table.name) {
            None => {
                new_tables.insert(table.name.clone(), table.clone());
            }
            Some(existing) => {
                let changes = diff_table(existing, table);
                if changes.new_columns.is_some()
                    || changes.removed_columns.is_some()
                    || changes.modified_columns.is_some()
                {
                    table_migrations.insert(table.name.clone(), changes);
                }
            }
        }
    }
    let removed_tables: Vec<String> = current
        .table_names()
        .filter(|name| target.table(name).is_none())
        .map(str::to_string)
        .collect();

    Migration {
        new_tables: (!new_tables.is_empty()).then_some(new_tables),
        removed_tables: (!removed_tables.is_empty()).then_some(removed_tables),
        table_migrations: (!table_migrations.is_empty()).then_some(table_migrations),
        ..Default::default()
    }
}

fn diff_table(current: &Table, target: &Table) -> TableMigration {
    let mut new_columns = IndexMap::new();
    let mut modified = Vec::new();
    for column in &target.columns {
        match current.column(&column.name) {
            None => {
                new_columns.insert(column.name.clone(), column.clone());
            }
            Some(old) if old != column => modified.push(ColumnMigration {
                old: old.clone(),
                new: column.clone(),
            }),
            Some(_) => {}
        }
    }
    let removed: Vec<String> = current
        .columns
        .iter()
        .filter(|c| target.column(&c.name).is_none())
        .map(|c| c.name.clone())
        .collect();

    TableMigration {
        new_columns: (!new_columns.is_empty()).then_some(new_columns),
        removed_columns: (!removed.is_empty()).then_some(removed),
        modified_columns: (!modified.is_empty()).then_some(modified),
    }
}

/// Applies a migration diff to a schema.
fn apply(schema: &mut Schema, migration: &Migration) {
    for name in migration.removed_tables.iter().flatten() {
        schema.tables.retain(|t| &t.name != name);
    }
    for rename in migration.renamed_tables.iter().flatten() {
        if let Some(table) = schema.tables.iter_mut().find(|t| t.name == rename.old_name) {
            table.name = rename.new_name.clone();
        }
    }
    for table in migration.new_tables.iter().flat_map(|t| t.values()) {
        schema.tables.push(table.clone());
    }
    for (name, changes) in migration.table_migrations.iter().flatten() {
        let Some(table) = schema.tables.iter_mut().find(|t| &t.name == name) else {
            continue;
        };
        for removed in changes.removed_columns.iter().flatten() {
            table.columns.retain(|c| &c.name != removed);
        }
        for modified in changes.modified_columns.iter().flatten() {
            if let Some(column) = table.columns.iter_mut().find(|c| c.name == modified.old.name) {
                *column = modified.new.clone();
            }
        }
        for column in changes.new_columns.iter().flat_map(|c| c.values()) {
            table.columns.push(column.clone());
        }
    }
}

fn record_migration(state: &mut State, branch: &BranchRef, mut migration: Migration) {
    state.next_migration += 1;
    let id = format!("mig_{:04}", state.next_migration);
    if let Some(b) = branch_mut(state, branch) {
        migration.id = Some(id);
        migration.parent_id = b.migrations.last().and_then(|m| m.id.clone());
        migration.status = Some("completed".to_string());
        if migration.title.is_none() {
            migration.title = Some(format!("migration of {}", branch.branch()));
        }
        b.migrations.push(migration);
    }
}

/// Checks a record against the columns of a table.
fn validate_fields(
    state: &State,
    branch: &BranchRef,
    columns: &[Column],
    fields: &Map<String, Value>,
) -> SyncResult<()> {
    for (name, value) in fields {
        let column = columns
            .iter()
            .find(|c| &c.name == name)
            .ok_or_else(|| bad_request(format!("column [{}] does not exist", name)))?;
        match column.column_type {
            ColumnType::Link => {
                let target = column.link.as_ref().map(|l| l.table.as_str()).unwrap_or_default();
                let linked = value.as_str().is_some_and(|id| {
                    branch_ref(state, branch)
                        .and_then(|b| b.tables.get(target))
                        .is_some_and(|records| records.contains_key(id))
                });
                if !value.is_null() && !linked {
                    return Err(bad_request(format!(
                        "invalid link in column [{}]: record not found in table [{}]",
                        name, target
                    )));
                }
            }
            ColumnType::Object => match value {
                Value::Object(nested) => validate_fields(state, branch, &column.columns, nested)?,
                Value::Null => {}
                _ => return Err(bad_request(format!("column [{}] expects an object", name))),
            },
            _ => {}
        }
    }
    Ok(())
}

fn table_columns(state: &State, branch: &BranchRef, table: &str) -> SyncResult<Vec<Column>> {
    let b = branch_ref(state, branch).ok_or_else(|| not_found(format!("branch [{}]", branch)))?;
    b.schema
        .table(table)
        .map(|t| t.columns.clone())
        .ok_or_else(|| not_found(format!("table [{}]", table)))
}

fn store(state: &mut State, branch: &BranchRef, table: &str, id: String, fields: Map<String, Value>) -> SyncResult<()> {
    let b = existing_mut(state, branch)?;
    let records = b.tables.entry(table.to_string()).or_default();
    let version = records.get(&id).map_or(0, |r| r.version + 1);
    records.insert(id, StoredRecord { fields, version });
    Ok(())
}

impl RemoteService for MemoryRemote {
    fn branch_details(&self, branch: &BranchRef) -> SyncResult<Option<BranchDetails>> {
        let state = self.enter(Op::BranchDetails)?;
        Ok(branch_ref(&state, branch).map(|b| BranchDetails {
            database_name: branch.database().to_string(),
            branch_name: branch.branch().to_string(),
            metadata: b.metadata.clone(),
            schema: b.schema.clone(),
        }))
    }

    fn list_branches(&self, database: &str) -> SyncResult<Option<Vec<BranchSummary>>> {
        let state = self.enter(Op::ListBranches)?;
        Ok(state.databases.get(database).map(|db| {
            db.keys()
                .map(|name| BranchSummary {
                    name: name.clone(),
                    created_at: None,
                })
                .collect()
        }))
    }

    fn create_database(&self, database: &str, request: &CreateDatabaseRequest) -> SyncResult<()> {
        let mut state = self.enter(Op::CreateDatabase)?;
        if !is_valid_identifier(database) || !is_valid_identifier(&request.branch_name) {
            return Err(bad_request("invalid database or branch name"));
        }
        if !state.databases.contains_key(database) {
            let mut branches = IndexMap::new();
            let first = BranchState {
                schema: Schema::new(Vec::new()),
                ..Default::default()
            };
            branches.insert(request.branch_name.clone(), first);
            state.databases.insert(database.to_string(), branches);
        }
        Ok(())
    }

    fn create_branch(&self, branch: &BranchRef, request: &CreateBranchRequest) -> SyncResult<()> {
        let mut state = self.enter(Op::CreateBranch)?;
        let db = state
            .databases
            .get(branch.database())
            .ok_or_else(|| not_found(format!("database [{}]", branch.database())))?;
        if db.contains_key(branch.branch()) {
            return Ok(());
        }

        let mut created = BranchState {
            metadata: request.metadata.clone(),
            ..Default::default()
        };
        if let Some(from) = &request.from {
            let source = db
                .get(from)
                .ok_or_else(|| not_found(format!("branch [{}:{}]", branch.database(), from)))?;
            created.schema = source.schema.clone();
            created.started_from = Some(StartedFrom {
                branch_name: from.clone(),
                migration_id: source
                    .migrations
                    .last()
                    .and_then(|m| m.id.clone())
                    .unwrap_or_default(),
            });
        }
        if let Some(db) = state.databases.get_mut(branch.database()) {
            db.insert(branch.branch().to_string(), created);
        }
        Ok(())
    }

    fn migration_plan(&self, branch: &BranchRef, schema: &Schema) -> SyncResult<MigrationPlan> {
        let state = self.enter(Op::MigrationPlan)?;
        let current = branch_ref(&state, branch)
            .ok_or_else(|| not_found(format!("branch [{}]", branch)))?;
        schema
            .validate()
            .map_err(|e| SyncError::network(422, e.to_string()))?;
        Ok(MigrationPlan::new(diff(&current.schema, schema)))
    }

    fn execute_migration_plan(&self, branch: &BranchRef, plan: &MigrationPlan) -> SyncResult<()> {
        let mut state = self.enter(Op::ExecuteMigrationPlan)?;
        let b = existing_mut(&mut state, branch)?;
        apply(&mut b.schema, &plan.migration);
        record_migration(&mut state, branch, plan.migration.clone());
        Ok(())
    }

    fn migration_history(
        &self,
        branch: &BranchRef,
        request: &HistoryRequest,
    ) -> SyncResult<HistoryPage> {
        let state = self.enter(Op::MigrationHistory)?;
        let b = branch_ref(&state, branch)
            .ok_or_else(|| not_found(format!("branch [{}]", branch)))?;

        let newest_first: Vec<&Migration> = b.migrations.iter().rev().collect();
        let start = match &request.start_from {
            None => 0,
            Some(id) => match newest_first.iter().position(|m| m.id.as_ref() == Some(id)) {
                Some(pos) => pos,
                None => newest_first.len(),
            },
        };
        let limit = match (request.limit, state.history_limit) {
            (Some(asked), Some(cap)) => asked.min(cap),
            (Some(asked), None) => asked,
            (None, Some(cap)) => cap,
            (None, None) => usize::MAX,
        };
        Ok(HistoryPage {
            migrations: newest_first
                .into_iter()
                .skip(start)
                .take(limit)
                .cloned()
                .collect(),
            started_from: b.started_from.clone(),
        })
    }

    fn query_table(
        &self,
        branch: &BranchRef,
        table: &str,
        request: &QueryRequest,
    ) -> SyncResult<QueryPage> {
        let state = self.enter(Op::QueryTable)?;
        table_columns(&state, branch, table)?;
        let page = request.page.clone().unwrap_or_default();
        let size = page.size.unwrap_or(DEFAULT_QUERY_PAGE_SIZE).max(1);
        let offset = match &page.after {
            None => 0,
            Some(cursor) => cursor
                .strip_prefix("offset:")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| bad_request(format!("invalid cursor [{}]", cursor)))?,
        };

        let empty = IndexMap::new();
        let records = branch_ref(&state, branch)
            .and_then(|b| b.tables.get(table))
            .unwrap_or(&empty);
        let end = (offset + size).min(records.len());
        let page_records = records
            .iter()
            .skip(offset)
            .take(size)
            .map(|(id, r)| Record {
                id: id.clone(),
                meta: Some(json!({ "version": r.version })),
                fields: r.fields.clone(),
            })
            .collect();

        Ok(QueryPage {
            records: page_records,
            meta: QueryMeta {
                page: PageInfo {
                    cursor: format!("offset:{}", end),
                    more: end < records.len(),
                },
            },
        })
    }

    fn insert_record_with_id(
        &self,
        branch: &BranchRef,
        table: &str,
        id: &str,
        record: &Map<String, Value>,
    ) -> SyncResult<()> {
        let mut state = self.enter(Op::InsertRecord)?;
        if !is_valid_identifier(id) {
            return Err(bad_request(format!("invalid record id [{}]", id)));
        }
        let columns = table_columns(&state, branch, table)?;
        validate_fields(&state, branch, &columns, record)?;
        store(&mut state, branch, table, id.to_string(), record.clone())
    }

    fn bulk_insert(
        &self,
        branch: &BranchRef,
        table: &str,
        request: &BulkInsertRequest,
    ) -> SyncResult<()> {
        let mut state = self.enter(Op::BulkInsert)?;
        let columns = table_columns(&state, branch, table)?;
        for record in &request.records {
            validate_fields(&state, branch, &columns, record)?;
        }
        for record in &request.records {
            state.next_record += 1;
            let id = format!("rec_{:06}", state.next_record);
            store(&mut state, branch, table, id, record.clone())?;
        }
        Ok(())
    }
}
