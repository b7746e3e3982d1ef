//! # SchemaSync Testkit
//!
//! Test utilities for SchemaSync.
//!
//! This crate provides:
//! - `MemoryRemote`, a stateful in-memory remote service with call counting
//!   and failure injection
//! - Schema, record and dump-directory fixtures
//! - Property-based generators for record sets
//!
//! ## Usage
//!
//! ```rust,ignore
//! use schemasync_testkit::prelude::*;
//!
//! #[test]
//! fn deploy_is_idempotent() {
//!     let remote = MemoryRemote::new();
//!     remote.seed_branch(&branch("main"), blog_schema());
//!     // ... run a Migrator against `remote`
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod memory_remote;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::memory_remote::*;
}

pub use fixtures::*;
pub use generators::*;
pub use memory_remote::*;
