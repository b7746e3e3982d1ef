//! HTTP implementation of the remote service.
//!
//! The actual HTTP client is abstracted via a trait so the mapping of
//! endpoints, bodies and status codes can be tested without a network.

use crate::error::{SyncError, SyncResult};
use crate::transport::RemoteService;
use schemasync_protocol::{
    BranchDetails, BranchListing, BranchRef, BranchSummary, BulkInsertRequest,
    CreateBranchRequest, CreateDatabaseRequest, ErrorBody, HistoryPage, HistoryRequest,
    MigrationPlan, QueryPage, QueryRequest,
};
use schemasync_schema::Schema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

/// HTTP methods used by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
}

impl Method {
    /// Method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }
}

/// A raw HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction.
///
/// Implementations carry authentication and the request timeout. A returned
/// `Err` means no response was received.
pub trait HttpClient: Send + Sync {
    /// Sends a request with an optional JSON body.
    fn send(&self, method: Method, url: &str, body: Option<Vec<u8>>) -> Result<HttpResponse, String>;
}

/// HTTP-based remote service.
pub struct HttpRemote<C: HttpClient> {
    /// Base URL of the workspace endpoint (e.g. "https://acme-1234.example.sh").
    base_url: String,
    client: C,
}

impl<C: HttpClient> HttpRemote<C> {
    /// Creates a new HTTP remote.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> SyncResult<HttpResponse> {
        let body = body.map(serde_json::to_vec).transpose()?;
        let url = format!("{}{}", self.base_url, path);
        debug!(method = method.as_str(), url = %url, "sending request");
        let response = self
            .client
            .send(method, &url, body)
            .map_err(SyncError::transport)?;
        debug!(status = response.status, "received response");
        Ok(response)
    }

    fn decode<T: DeserializeOwned>(response: HttpResponse) -> SyncResult<T> {
        let response = check(response)?;
        serde_json::from_slice(&response.body)
            .map_err(|e| SyncError::Codec(format!("failed to decode response: {}", e)))
    }
}

/// Maps non-success responses to errors.
fn check(response: HttpResponse) -> SyncResult<HttpResponse> {
    if response.is_success() {
        return Ok(response);
    }
    let message = ErrorBody::message_from(&response.body);
    if response.status == 401 {
        return Err(SyncError::Unauthorized(message));
    }
    Err(SyncError::network(response.status, message))
}

/// Like [`check`], but a 422 ("already exists") also passes.
fn check_created(response: HttpResponse) -> SyncResult<()> {
    if response.status == 422 {
        debug!("resource already exists");
        return Ok(());
    }
    check(response).map(|_| ())
}

impl<C: HttpClient> RemoteService for HttpRemote<C> {
    fn branch_details(&self, branch: &BranchRef) -> SyncResult<Option<BranchDetails>> {
        let response = self.send::<()>(Method::Get, &branch.path(), None)?;
        if response.status == 404 {
            return Ok(None);
        }
        Self::decode(response).map(Some)
    }

    fn list_branches(&self, database: &str) -> SyncResult<Option<Vec<BranchSummary>>> {
        let response = self.send::<()>(Method::Get, &format!("/dbs/{}", database), None)?;
        if response.status == 404 {
            return Ok(None);
        }
        let listing: BranchListing = Self::decode(response)?;
        Ok(Some(listing.branches))
    }

    fn create_database(&self, database: &str, request: &CreateDatabaseRequest) -> SyncResult<()> {
        let response = self.send(Method::Put, &format!("/dbs/{}", database), Some(request))?;
        check_created(response)
    }

    fn create_branch(&self, branch: &BranchRef, request: &CreateBranchRequest) -> SyncResult<()> {
        let path = match &request.from {
            Some(from) => format!("{}?from={}", branch.path(), from),
            None => branch.path(),
        };
        let response = self.send(Method::Put, &path, Some(request))?;
        check_created(response)
    }

    fn migration_plan(&self, branch: &BranchRef, schema: &Schema) -> SyncResult<MigrationPlan> {
        let path = format!("{}/migrations/plan", branch.path());
        Self::decode(self.send(Method::Post, &path, Some(schema))?)
    }

    fn execute_migration_plan(&self, branch: &BranchRef, plan: &MigrationPlan) -> SyncResult<()> {
        let path = format!("{}/migrations/execute", branch.path());
        check(self.send(Method::Post, &path, Some(plan))?).map(|_| ())
    }

    fn migration_history(
        &self,
        branch: &BranchRef,
        request: &HistoryRequest,
    ) -> SyncResult<HistoryPage> {
        let path = format!("{}/migrations", branch.path());
        Self::decode(self.send(Method::Post, &path, Some(request))?)
    }

    fn query_table(
        &self,
        branch: &BranchRef,
        table: &str,
        request: &QueryRequest,
    ) -> SyncResult<QueryPage> {
        let path = format!("{}/tables/{}/query", branch.path(), table);
        Self::decode(self.send(Method::Post, &path, Some(request))?)
    }

    fn insert_record_with_id(
        &self,
        branch: &BranchRef,
        table: &str,
        id: &str,
        record: &Map<String, Value>,
    ) -> SyncResult<()> {
        let path = format!("{}/tables/{}/data/{}", branch.path(), table, id);
        check(self.send(Method::Put, &path, Some(record))?).map(|_| ())
    }

    fn bulk_insert(
        &self,
        branch: &BranchRef,
        table: &str,
        request: &BulkInsertRequest,
    ) -> SyncResult<()> {
        let path = format!("{}/tables/{}/bulk", branch.path(), table);
        check(self.send(Method::Post, &path, Some(request))?).map(|_| ())
    }
}
