//! # SchemaSync Schema
//!
//! Typed schema model for branch-versioned databases.
//!
//! This crate provides:
//! - `Schema`, `Table` and `Column` with declaration order preserved
//! - The closed `ColumnType` enum and its string mapping
//! - Identifier validation for database, branch, table and column names
//! - JSON and YAML schema file codecs
//!
//! This is a pure data crate with no I/O operations.
//!
//! ## Usage
//!
//! ```
//! use schemasync_schema::{parse_schema, serialize_schema, SchemaFormat};
//!
//! let json = br#"{"formatVersion":"1.0","tables":[{"name":"users","columns":[{"name":"email","type":"email"}]}]}"#;
//! let schema = parse_schema(json, SchemaFormat::Json).unwrap();
//! let yaml = serialize_schema(&schema, SchemaFormat::Yaml).unwrap();
//! assert_eq!(parse_schema(&yaml, SchemaFormat::Yaml).unwrap(), schema);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod column;
mod error;
mod format;
mod identifier;
mod schema;

pub use column::{Column, ColumnLink, ColumnType};
pub use error::{SchemaError, SchemaResult};
pub use format::{parse_schema, serialize_schema, SchemaFormat};
pub use identifier::{is_valid_identifier, validate_identifier};
pub use schema::{Schema, Table, SCHEMA_FORMAT_VERSION};
