//! # SchemaSync Protocol
//!
//! Request and response shapes of the branch-versioned database service.
//!
//! This crate provides:
//! - `BranchRef` and `BranchUrl` locators
//! - `MigrationPlan` / `Migration` diffs with ordered maps
//! - Migration history pages with fork ("started from") markers
//! - Record query pages and cursors
//! - Branch and database management messages
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod branch;
mod error;
mod messages;
mod migration;

pub use branch::{BranchRef, BranchUrl};
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{
    BranchDetails, BranchListing, BranchMetadata, BranchSummary, BulkInsertRequest,
    CreateBranchRequest, CreateDatabaseRequest, ErrorBody, HistoryPage, HistoryRequest,
    PageConfig, PageInfo, QueryMeta, QueryPage, QueryRequest, Record, ID_FIELD, META_FIELD,
};
pub use migration::{
    ColumnMigration, Migration, MigrationPlan, StartedFrom, TableMigration, TableRename,
};
