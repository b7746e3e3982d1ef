//! Remote service abstraction.

use crate::error::{SyncError, SyncResult};
use parking_lot::Mutex;
use schemasync_protocol::{
    BranchDetails, BranchRef, BranchSummary, BulkInsertRequest, CreateBranchRequest,
    CreateDatabaseRequest, HistoryPage, HistoryRequest, MigrationPlan, QueryPage, QueryRequest,
};
use schemasync_schema::Schema;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::Arc;

/// The operations the engine needs from the branch-versioned database service.
///
/// This trait abstracts the network layer, allowing the HTTP implementation
/// to be swapped for in-memory or scripted services in tests.
pub trait RemoteService: Send + Sync {
    /// Returns the details of a branch, or `None` if it does not exist.
    fn branch_details(&self, branch: &BranchRef) -> SyncResult<Option<BranchDetails>>;

    /// Lists the branches of a database, or `None` if the database does not exist.
    fn list_branches(&self, database: &str) -> SyncResult<Option<Vec<BranchSummary>>>;

    /// Creates a database with an initial branch.
    fn create_database(&self, database: &str, request: &CreateDatabaseRequest) -> SyncResult<()>;

    /// Creates a branch, optionally forked from another one.
    fn create_branch(&self, branch: &BranchRef, request: &CreateBranchRequest) -> SyncResult<()>;

    /// Computes the migration from the branch's schema to `schema`.
    fn migration_plan(&self, branch: &BranchRef, schema: &Schema) -> SyncResult<MigrationPlan>;

    /// Applies a migration plan.
    fn execute_migration_plan(&self, branch: &BranchRef, plan: &MigrationPlan) -> SyncResult<()>;

    /// Returns one page of applied migrations, newest first.
    fn migration_history(
        &self,
        branch: &BranchRef,
        request: &HistoryRequest,
    ) -> SyncResult<HistoryPage>;

    /// Returns one page of records of a table.
    fn query_table(
        &self,
        branch: &BranchRef,
        table: &str,
        request: &QueryRequest,
    ) -> SyncResult<QueryPage>;

    /// Inserts a record under an explicit id.
    fn insert_record_with_id(
        &self,
        branch: &BranchRef,
        table: &str,
        id: &str,
        record: &Map<String, Value>,
    ) -> SyncResult<()>;

    /// Inserts records with service-assigned ids.
    fn bulk_insert(
        &self,
        branch: &BranchRef,
        table: &str,
        request: &BulkInsertRequest,
    ) -> SyncResult<()>;
}

impl<T: RemoteService + ?Sized> RemoteService for Arc<T> {
    fn branch_details(&self, branch: &BranchRef) -> SyncResult<Option<BranchDetails>> {
        (**self).branch_details(branch)
    }

    fn list_branches(&self, database: &str) -> SyncResult<Option<Vec<BranchSummary>>> {
        (**self).list_branches(database)
    }

    fn create_database(&self, database: &str, request: &CreateDatabaseRequest) -> SyncResult<()> {
        (**self).create_database(database, request)
    }

    fn create_branch(&self, branch: &BranchRef, request: &CreateBranchRequest) -> SyncResult<()> {
        (**self).create_branch(branch, request)
    }

    fn migration_plan(&self, branch: &BranchRef, schema: &Schema) -> SyncResult<MigrationPlan> {
        (**self).migration_plan(branch, schema)
    }

    fn execute_migration_plan(&self, branch: &BranchRef, plan: &MigrationPlan) -> SyncResult<()> {
        (**self).execute_migration_plan(branch, plan)
    }

    fn migration_history(
        &self,
        branch: &BranchRef,
        request: &HistoryRequest,
    ) -> SyncResult<HistoryPage> {
        (**self).migration_history(branch, request)
    }

    fn query_table(
        &self,
        branch: &BranchRef,
        table: &str,
        request: &QueryRequest,
    ) -> SyncResult<QueryPage> {
        (**self).query_table(branch, table, request)
    }

    fn insert_record_with_id(
        &self,
        branch: &BranchRef,
        table: &str,
        id: &str,
        record: &Map<String, Value>,
    ) -> SyncResult<()> {
        (**self).insert_record_with_id(branch, table, id, record)
    }

    fn bulk_insert(
        &self,
        branch: &BranchRef,
        table: &str,
        request: &BulkInsertRequest,
    ) -> SyncResult<()> {
        (**self).bulk_insert(branch, table, request)
    }
}

/// A call received by a [`MockRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    /// `branch_details(branch)`.
    BranchDetails(String),
    /// `list_branches(database)`.
    ListBranches(String),
    /// `create_database(database)` with the initial branch.
    CreateDatabase {
        /// Database name.
        database: String,
        /// Initial branch.
        branch: String,
    },
    /// `create_branch(branch)` with the fork source.
    CreateBranch {
        /// Created branch.
        branch: String,
        /// Fork source.
        from: Option<String>,
    },
    /// `migration_plan(branch)`.
    MigrationPlan(String),
    /// `execute_migration_plan(branch)`.
    ExecuteMigrationPlan(String),
    /// `migration_history(branch)` with the start cursor.
    MigrationHistory {
        /// Branch.
        branch: String,
        /// Start cursor.
        start_from: Option<String>,
    },
    /// `query_table(branch, table)` with the page cursor.
    QueryTable {
        /// Branch.
        branch: String,
        /// Table.
        table: String,
        /// Page cursor.
        after: Option<String>,
    },
    /// `insert_record_with_id(branch, table, id)`.
    InsertRecord {
        /// Branch.
        branch: String,
        /// Table.
        table: String,
        /// Record id.
        id: String,
    },
    /// `bulk_insert(branch, table)` with the record count.
    BulkInsert {
        /// Branch.
        branch: String,
        /// Table.
        table: String,
        /// Number of records.
        count: usize,
    },
}

type Queue<T> = Mutex<VecDeque<SyncResult<T>>>;

/// A scripted remote service for testing.
///
/// Read operations pop scripted responses in order and fail when none is
/// left. Write operations succeed unless a failure is scripted.
#[derive(Debug, Default)]
pub struct MockRemote {
    branch_details: Queue<Option<BranchDetails>>,
    branches: Queue<Option<Vec<BranchSummary>>>,
    plans: Queue<MigrationPlan>,
    history: Queue<HistoryPage>,
    pages: Queue<QueryPage>,
    write_results: Queue<()>,
    calls: Mutex<Vec<RemoteCall>>,
    executed: Mutex<Vec<MigrationPlan>>,
    inserted: Mutex<Vec<(String, String, Map<String, Value>)>>,
    bulk: Mutex<Vec<(String, Vec<Map<String, Value>>)>>,
}

impl MockRemote {
    /// Creates a mock with nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a `branch_details` response.
    pub fn push_branch_details(&self, response: SyncResult<Option<BranchDetails>>) {
        self.branch_details.lock().push_back(response);
    }

    /// Queues a `list_branches` response.
    pub fn push_branches(&self, response: SyncResult<Option<Vec<BranchSummary>>>) {
        self.branches.lock().push_back(response);
    }

    /// Queues a `migration_plan` response.
    pub fn push_plan(&self, response: SyncResult<MigrationPlan>) {
        self.plans.lock().push_back(response);
    }

    /// Queues a `migration_history` response.
    pub fn push_history(&self, response: SyncResult<HistoryPage>) {
        self.history.lock().push_back(response);
    }

    /// Queues a `query_table` response.
    pub fn push_page(&self, response: SyncResult<QueryPage>) {
        self.pages.lock().push_back(response);
    }

    /// Queues the result of the next write operation.
    pub fn push_write_result(&self, response: SyncResult<()>) {
        self.write_results.lock().push_back(response);
    }

    /// Returns the calls received so far.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().clone()
    }

    /// Returns the plans passed to `execute_migration_plan`.
    pub fn executed_plans(&self) -> Vec<MigrationPlan> {
        self.executed.lock().clone()
    }

    /// Returns the `(table, id, record)` triples passed to `insert_record_with_id`.
    pub fn inserted_records(&self) -> Vec<(String, String, Map<String, Value>)> {
        self.inserted.lock().clone()
    }

    /// Returns the `(table, records)` pairs passed to `bulk_insert`.
    pub fn bulk_inserts(&self) -> Vec<(String, Vec<Map<String, Value>>)> {
        self.bulk.lock().clone()
    }

    fn record(&self, call: RemoteCall) {
        self.calls.lock().push(call);
    }

    fn next<T>(queue: &Queue<T>, operation: &str) -> SyncResult<T> {
        queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(SyncError::transport(format!("no scripted {} response", operation))))
    }

    fn next_write(&self) -> SyncResult<()> {
        self.write_results.lock().pop_front().unwrap_or(Ok(()))
    }
}

impl RemoteService for MockRemote {
    fn branch_details(&self, branch: &BranchRef) -> SyncResult<Option<BranchDetails>> {
        self.record(RemoteCall::BranchDetails(branch.to_string()));
        Self::next(&self.branch_details, "branch details")
    }

    fn list_branches(&self, database: &str) -> SyncResult<Option<Vec<BranchSummary>>> {
        self.record(RemoteCall::ListBranches(database.to_string()));
        Self::next(&self.branches, "branch list")
    }

    fn create_database(&self, database: &str, request: &CreateDatabaseRequest) -> SyncResult<()> {
        self.record(RemoteCall::CreateDatabase {
            database: database.to_string(),
            branch: request.branch_name.clone(),
        });
        self.next_write()
    }

    fn create_branch(&self, branch: &BranchRef, request: &CreateBranchRequest) -> SyncResult<()> {
        self.record(RemoteCall::CreateBranch {
            branch: branch.to_string(),
            from: request.from.clone(),
        });
        self.next_write()
    }

    fn migration_plan(&self, branch: &BranchRef, _schema: &Schema) -> SyncResult<MigrationPlan> {
        self.record(RemoteCall::MigrationPlan(branch.to_string()));
        Self::next(&self.plans, "migration plan")
    }

    fn execute_migration_plan(&self, branch: &BranchRef, plan: &MigrationPlan) -> SyncResult<()> {
        self.record(RemoteCall::ExecuteMigrationPlan(branch.to_string()));
        self.next_write()?;
        self.executed.lock().push(plan.clone());
        Ok(())
    }

    fn migration_history(
        &self,
        branch: &BranchRef,
        request: &HistoryRequest,
    ) -> SyncResult<HistoryPage> {
        self.record(RemoteCall::MigrationHistory {
            branch: branch.to_string(),
            start_from: request.start_from.clone(),
        });
        Self::next(&self.history, "migration history")
    }

    fn query_table(
        &self,
        branch: &BranchRef,
        table: &str,
        request: &QueryRequest,
    ) -> SyncResult<QueryPage> {
        self.record(RemoteCall::QueryTable {
            branch: branch.to_string(),
            table: table.to_string(),
            after: request.page.as_ref().and_then(|p| p.after.clone()),
        });
        Self::next(&self.pages, "query")
    }

    fn insert_record_with_id(
        &self,
        branch: &BranchRef,
        table: &str,
        id: &str,
        record: &Map<String, Value>,
    ) -> SyncResult<()> {
        self.record(RemoteCall::InsertRecord {
            branch: branch.to_string(),
            table: table.to_string(),
            id: id.to_string(),
        });
        self.next_write()?;
        self.inserted
            .lock()
            .push((table.to_string(), id.to_string(), record.clone()));
        Ok(())
    }

    fn bulk_insert(
        &self,
        branch: &BranchRef,
        table: &str,
        request: &BulkInsertRequest,
    ) -> SyncResult<()> {
        self.record(RemoteCall::BulkInsert {
            branch: branch.to_string(),
            table: table.to_string(),
            count: request.records.len(),
        });
        self.next_write()?;
        self.bulk
            .lock()
            .push((table.to_string(), request.records.clone()));
        Ok(())
    }
}
