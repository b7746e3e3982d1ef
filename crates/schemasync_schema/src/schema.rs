//! Schema and table definitions.

use crate::column::{Column, ColumnType};
use crate::error::{SchemaError, SchemaResult};
use crate::identifier::validate_identifier;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Format version written into schema files.
pub const SCHEMA_FORMAT_VERSION: &str = "1.0";

/// A database schema: an ordered list of tables.
///
/// Field order matters: it is the key order of the serialized files, and
/// the table/column order is preserved exactly so that users can diff files.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Version of the file format.
    #[serde(default)]
    pub format_version: String,
    /// Tables in declaration order.
    #[serde(default)]
    pub tables: Vec<Table>,
}

/// A table: a name and an ordered list of columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    #[serde(default)]
    pub columns: Vec<Column>,
}

impl Table {
    /// Creates a table.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Finds a top-level column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

impl Schema {
    /// Creates a schema with the current format version.
    pub fn new(tables: Vec<Table>) -> Self {
        Self {
            format_version: SCHEMA_FORMAT_VERSION.to_string(),
            tables,
        }
    }

    /// Finds a table by name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Returns the table names in declaration order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    /// Checks the structural invariants of the schema.
    ///
    /// - table names are valid identifiers and unique
    /// - column names are valid identifiers and unique within their parent
    /// - only object columns have nested columns
    /// - link columns, and only link columns, have a link target
    pub fn validate(&self) -> SchemaResult<()> {
        let mut seen = HashSet::new();
        for table in &self.tables {
            validate_identifier("table", &table.name)?;
            if !seen.insert(table.name.as_str()) {
                return Err(SchemaError::DuplicateTable(table.name.clone()));
            }
            validate_columns(&table.name, &table.columns)?;
        }
        Ok(())
    }
}

fn validate_columns(table: &str, columns: &[Column]) -> SchemaResult<()> {
    let mut seen = HashSet::new();
    for column in columns {
        validate_identifier("column", &column.name)?;
        if !seen.insert(column.name.as_str()) {
            return Err(SchemaError::DuplicateColumn {
                table: table.to_string(),
                column: column.name.clone(),
            });
        }

        if column.column_type != ColumnType::Object && !column.columns.is_empty() {
            return Err(SchemaError::invalid_column(
                table,
                &column.name,
                format!("nested columns on a {} column", column.column_type),
            ));
        }
        match (column.column_type, &column.link) {
            (ColumnType::Link, None) => {
                return Err(SchemaError::invalid_column(
                    table,
                    &column.name,
                    "link column without a target table",
                ));
            }
            (ColumnType::Link, Some(link)) => validate_identifier("table", &link.table)?,
            (other, Some(_)) => {
                return Err(SchemaError::invalid_column(
                    table,
                    &column.name,
                    format!("link target on a {} column", other),
                ));
            }
            _ => {}
        }

        if column.column_type == ColumnType::Object {
            validate_columns(table, &column.columns)?;
        }
    }
    Ok(())
}
