//! Request and response bodies of the remote service.

use crate::migration::{Migration, StartedFrom};
use chrono::{DateTime, Utc};
use schemasync_schema::Schema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the record id field.
pub const ID_FIELD: &str = "id";

/// Name of the service-maintained metadata field of a record.
pub const META_FIELD: &str = "_meta";

/// A record as returned by a table query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Record id.
    pub id: String,
    /// Service metadata (version and similar), passed through untouched.
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    /// Column values.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Returns the record as one JSON object: id, then the columns, then the metadata.
    pub fn to_object(&self) -> Map<String, Value> {
        let mut object = Map::with_capacity(self.fields.len() + 2);
        object.insert(ID_FIELD.to_string(), Value::String(self.id.clone()));
        for (key, value) in &self.fields {
            object.insert(key.clone(), value.clone());
        }
        if let Some(meta) = &self.meta {
            object.insert(META_FIELD.to_string(), meta.clone());
        }
        object
    }
}

/// Body of a migration history request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRequest {
    /// Migration id to start from (inclusive); newest when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_from: Option<String>,
    /// Maximum number of migrations to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// One page of migration history, newest first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    /// Migrations, newest first.
    #[serde(default)]
    pub migrations: Vec<Migration>,
    /// Fork origin of the branch, if it was forked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_from: Option<StartedFrom>,
}

/// Body of a table query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Paging options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<PageConfig>,
}

impl QueryRequest {
    /// A request for the page of `size` records following `after`.
    pub fn page(size: usize, after: Option<String>) -> Self {
        Self {
            page: Some(PageConfig {
                size: Some(size),
                after,
            }),
        }
    }
}

/// Cursor paging options.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageConfig {
    /// Page size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    /// Cursor of the previous page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryPage {
    /// Records of the page.
    #[serde(default)]
    pub records: Vec<Record>,
    /// Paging metadata.
    #[serde(default)]
    pub meta: QueryMeta,
}

/// Metadata of a query page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryMeta {
    /// Cursor state.
    #[serde(default)]
    pub page: PageInfo,
}

/// Cursor state after a page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageInfo {
    /// Cursor to continue from.
    #[serde(default)]
    pub cursor: String,
    /// Whether more records follow.
    #[serde(default)]
    pub more: bool,
}

/// Details of a branch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchDetails {
    /// Database name.
    pub database_name: String,
    /// Branch name.
    pub branch_name: String,
    /// Metadata recorded when the branch was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BranchMetadata>,
    /// Current schema of the branch.
    #[serde(default)]
    pub schema: Schema,
}

/// Branches of a database.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchListing {
    /// Database name.
    #[serde(default)]
    pub database_name: String,
    /// Branches, in the order the service lists them.
    #[serde(default)]
    pub branches: Vec<BranchSummary>,
}

/// A branch entry of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchSummary {
    /// Branch name.
    pub name: String,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Git provenance recorded on a branch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BranchMetadata {
    /// Repository the branch was created from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    /// Git branch the branch was created from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

/// Body of a branch creation request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreateBranchRequest {
    /// Branch to fork from; an empty branch is created when absent.
    ///
    /// Sent as the `from` query parameter, not in the body.
    #[serde(skip)]
    pub from: Option<String>,
    /// Provenance metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BranchMetadata>,
}

/// Body of a database creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDatabaseRequest {
    /// Name of the initial branch.
    pub branch_name: String,
}

/// Body of a bulk insert request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BulkInsertRequest {
    /// Records to insert; ids are assigned by the service.
    pub records: Vec<Map<String, Value>>,
}

/// Error body returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human readable message.
    #[serde(default)]
    pub message: String,
}

impl ErrorBody {
    /// Extracts the message from an error body, falling back to the raw text.
    pub fn message_from(body: &[u8]) -> String {
        match serde_json::from_slice::<ErrorBody>(body) {
            Ok(parsed) if !parsed.message.is_empty() => parsed.message,
            _ => String::from_utf8_lossy(body).trim().to_string(),
        }
    }
}
