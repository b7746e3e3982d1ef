//! Error types for the schema crate.

use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur while parsing, validating or serializing a schema.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The JSON document could not be parsed or produced.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// The YAML document could not be parsed or produced.
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A column type token is not one of the known types.
    #[error("invalid column type [{0}]")]
    InvalidColumnType(String),

    /// A schema format name is not `json` or `yaml`.
    #[error("unknown schema format `{0}`, expected `json` or `yaml`")]
    UnknownFormat(String),

    /// A database, branch, table or column name is not a valid identifier.
    #[error("invalid {kind} name `{name}`")]
    InvalidIdentifier {
        /// What the identifier names (table, column, branch, ...).
        kind: &'static str,
        /// The rejected name.
        name: String,
    },

    /// Two tables share a name.
    #[error("duplicate table `{0}`")]
    DuplicateTable(String),

    /// Two columns of the same table (or object) share a name.
    #[error("duplicate column `{column}` in table `{table}`")]
    DuplicateColumn {
        /// Table holding the column.
        table: String,
        /// Column name.
        column: String,
    },

    /// A column carries settings that do not match its type.
    #[error("column `{column}` in table `{table}`: {message}")]
    InvalidColumn {
        /// Table holding the column.
        table: String,
        /// Column name.
        column: String,
        /// What is wrong with it.
        message: String,
    },
}

impl SchemaError {
    /// Creates an invalid identifier error.
    pub fn invalid_identifier(kind: &'static str, name: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            kind,
            name: name.into(),
        }
    }

    /// Creates an invalid column error.
    pub fn invalid_column(
        table: impl Into<String>,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidColumn {
            table: table.into(),
            column: column.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SchemaError::InvalidColumnType("uuid".into());
        assert_eq!(err.to_string(), "invalid column type [uuid]");

        let err = SchemaError::invalid_identifier("branch", "bad/name");
        assert_eq!(err.to_string(), "invalid branch name `bad/name`");

        let err = SchemaError::invalid_column("users", "team", "link column without target");
        assert!(err.to_string().contains("users"));
        assert!(err.to_string().contains("team"));
    }
}
