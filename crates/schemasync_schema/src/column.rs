//! Column definitions and the closed set of column types.

use crate::error::SchemaError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The type of a column.
///
/// The string form is the only external representation; unknown tokens are
/// rejected instead of mapped to a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// Short string (up to 255 characters).
    String,
    /// Boolean.
    Bool,
    /// Nested object with its own columns.
    Object,
    /// Array of strings.
    Multiple,
    /// Long text.
    Text,
    /// Email address.
    Email,
    /// Reference to a record of another table, by id.
    Link,
    /// 64-bit integer.
    Int,
    /// Double precision float.
    Float,
}

impl ColumnType {
    /// All column types, in declaration order.
    pub const ALL: [ColumnType; 9] = [
        ColumnType::String,
        ColumnType::Bool,
        ColumnType::Object,
        ColumnType::Multiple,
        ColumnType::Text,
        ColumnType::Email,
        ColumnType::Link,
        ColumnType::Int,
        ColumnType::Float,
    ];

    /// Returns the wire name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Bool => "bool",
            ColumnType::Object => "object",
            ColumnType::Multiple => "multiple",
            ColumnType::Text => "text",
            ColumnType::Email => "email",
            ColumnType::Link => "link",
            ColumnType::Int => "int",
            ColumnType::Float => "float",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColumnType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| SchemaError::InvalidColumnType(s.to_string()))
    }
}

impl Serialize for ColumnType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ColumnType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Target of a link column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnLink {
    /// Referenced table.
    pub table: String,
    /// Columns of the referenced table merged into query results.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lookup_fields: Vec<String>,
}

/// A column of a table, or of an object column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Column type.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Nested columns; only used by object columns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<Column>,
    /// Link target; only used by link columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<ColumnLink>,
    /// Whether a value is required.
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    /// Whether values must be unique.
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique: bool,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Column {
    /// Creates a plain column of the given type.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            columns: Vec::new(),
            link: None,
            required: false,
            unique: false,
            description: String::new(),
        }
    }

    /// Creates an object column holding `columns`.
    pub fn object(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            columns,
            ..Self::new(name, ColumnType::Object)
        }
    }

    /// Creates a link column referencing `table`.
    pub fn link(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            link: Some(ColumnLink {
                table: table.into(),
                lookup_fields: Vec::new(),
            }),
            ..Self::new(name, ColumnType::Link)
        }
    }

    /// Marks the column as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks the column as unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Returns true for link columns.
    pub fn is_link(&self) -> bool {
        self.column_type == ColumnType::Link
    }

    /// Returns true for object columns.
    pub fn is_object(&self) -> bool {
        self.column_type == ColumnType::Object
    }
}
