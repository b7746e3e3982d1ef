//! Textual schema encodings.
//!
//! Schemas are stored either as JSON or as YAML. Both encodings carry the
//! same fields in the same order, and both preserve table and column
//! declaration order.

use crate::error::{SchemaError, SchemaResult};
use crate::schema::Schema;
use std::fmt;
use std::str::FromStr;

/// Textual encoding of a schema file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaFormat {
    /// Pretty-printed JSON.
    #[default]
    Json,
    /// YAML.
    Yaml,
}

impl SchemaFormat {
    /// Conventional file name for a schema in this format.
    pub fn file_name(&self) -> &'static str {
        match self {
            SchemaFormat::Json => "schema.json",
            SchemaFormat::Yaml => "schema.yaml",
        }
    }

    /// Settings token for this format.
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaFormat::Json => "json",
            SchemaFormat::Yaml => "yaml",
        }
    }
}

impl fmt::Display for SchemaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaFormat {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(SchemaFormat::Json),
            "yaml" => Ok(SchemaFormat::Yaml),
            other => Err(SchemaError::UnknownFormat(other.to_string())),
        }
    }
}

/// Parses and validates a schema document.
pub fn parse_schema(bytes: &[u8], format: SchemaFormat) -> SchemaResult<Schema> {
    let schema: Schema = match format {
        SchemaFormat::Json => serde_json::from_slice(bytes)?,
        SchemaFormat::Yaml => serde_yaml::from_slice(bytes)?,
    };
    schema.validate()?;
    Ok(schema)
}

/// Serializes a schema. The output parses back to an equal schema.
pub fn serialize_schema(schema: &Schema, format: SchemaFormat) -> SchemaResult<Vec<u8>> {
    match format {
        SchemaFormat::Json => {
            let mut bytes = serde_json::to_vec_pretty(schema)?;
            bytes.push(b'\n');
            Ok(bytes)
        }
        SchemaFormat::Yaml => Ok(serde_yaml::to_string(schema)?.into_bytes()),
    }
}
