//! # SchemaSync Engine
//!
//! Schema migration and bulk data sync against a branch-versioned database.
//!
//! This crate provides:
//! - The two-phase migration protocol (compute plan, confirm, stamp, apply)
//! - Plain-text rendering of migration diffs and history entries
//! - Lineage walks over migration history across branch forks
//! - Paginated export of a branch to line-delimited files, and streaming import
//! - Backup-guarded pull of a branch schema into the local schema file
//! - Random record generation for development branches
//! - HTTP transport abstraction with a scripted mock for tests
//!
//! ## Architecture
//!
//! Every operation talks to the service through [`RemoteService`] and asks the
//! user through [`DecisionProvider`]. Both are injected, so the engine performs
//! no terminal or network I/O of its own. Progress lines are written to a
//! caller-supplied `io::Write`; diagnostics go through `tracing`.
//!
//! ## Key Invariants
//!
//! - An empty plan is never applied
//! - A plan is stamped after confirmation and right before it is applied
//! - Requests of a paginated transfer are strictly sequential
//! - An overwritten schema file always leaves a byte-identical backup

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod branches;
mod cancel;
mod config;
mod decision;
mod error;
mod export;
mod http;
mod import;
mod lineage;
mod migrate;
mod pull;
mod random_data;
mod render;
mod transport;

pub use branches::{create_branch, ensure_branch_exists, resolve_deploy_branch};
pub use cancel::CancelToken;
pub use config::EngineConfig;
pub use decision::{Answer, Approval, DecisionProvider, NonInteractive, ScriptedDecisions};
pub use error::{SyncError, SyncResult};
pub use export::{table_file, ExportSummary, Exporter, TableExport, DUMP_SCHEMA_FILE, TABLE_FILE_EXTENSION};
pub use http::{HttpClient, HttpRemote, HttpResponse, Method};
pub use import::{read_dump_schema, strip_links, ImportSummary, Importer, TableImport};
pub use lineage::{LineageEntry, LineageWalker};
pub use migrate::{stamp, MigrationOutcome, MigrationState, Migrator, Provenance, CONFIRM_PROMPT};
pub use pull::{backup_path, pull_schema, PullSummary, SchemaFileGuard};
pub use random_data::{generate_record, seed_tables};
pub use render::{render_history_entry, render_migration, render_origin};
pub use transport::{MockRemote, RemoteCall, RemoteService};
