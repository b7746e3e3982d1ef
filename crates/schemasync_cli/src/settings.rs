//! Project settings (`<dir>/config.json`) and the local schema file.

use schemasync_schema::{parse_schema, Schema, SchemaError, SchemaFormat};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the project settings inside the project directory.
pub const SETTINGS_FILE: &str = "config.json";

/// Errors reading the project settings or schema file.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The project directory is missing.
    #[error("Directory `{0}` doesn't exist. Create it with a config.json first")]
    MissingDir(PathBuf),

    /// A file could not be read.
    #[error("reading `{path}`: {source}")]
    Read {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// The settings file is not valid JSON.
    #[error("parsing `{path}`: {source}")]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// `schemaFileFormat` is neither `json` nor `yaml`.
    #[error("the schemaFileFormat setting must be either `json` or `yaml`")]
    BadFormat,

    /// `workspaceID` is empty.
    #[error("workspaceID is missing from settings")]
    MissingWorkspace,

    /// `dbName` is empty.
    #[error("dbName is missing from settings")]
    MissingDatabase,

    /// The schema file does not exist.
    #[error("Schema file {0} doesn't exist. Pull it from a branch or write one first")]
    MissingSchema(PathBuf),

    /// The schema file is invalid.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    schema_file_format: String,
    #[serde(default)]
    db_name: String,
    #[serde(default, rename = "workspaceID")]
    workspace_id: String,
}

/// Validated project settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    dir: PathBuf,
    /// Encoding of the schema file.
    pub format: SchemaFormat,
    /// Database name.
    pub db_name: String,
    workspace_id: String,
}

impl Settings {
    /// Reads `<dir>/config.json`.
    pub fn read(dir: &Path) -> Result<Self, SettingsError> {
        if !dir.exists() {
            return Err(SettingsError::MissingDir(dir.to_path_buf()));
        }
        let path = dir.join(SETTINGS_FILE);
        let bytes = fs::read(&path).map_err(|source| SettingsError::Read {
            path: path.clone(),
            source,
        })?;
        let file: SettingsFile =
            serde_json::from_slice(&bytes).map_err(|source| SettingsError::Parse { path, source })?;

        let format = file
            .schema_file_format
            .parse::<SchemaFormat>()
            .map_err(|_| SettingsError::BadFormat)?;
        if file.db_name.is_empty() {
            return Err(SettingsError::MissingDatabase);
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            format,
            db_name: file.db_name,
            workspace_id: file.workspace_id,
        })
    }

    /// Workspace id; required by every command talking to the service.
    pub fn workspace_id(&self) -> Result<&str, SettingsError> {
        if self.workspace_id.is_empty() {
            return Err(SettingsError::MissingWorkspace);
        }
        Ok(&self.workspace_id)
    }

    /// Path of the schema file for the configured format.
    pub fn schema_path(&self) -> PathBuf {
        self.dir.join(self.format.file_name())
    }

    /// Reads and validates the local schema file.
    pub fn read_schema(&self) -> Result<Schema, SettingsError> {
        let path = self.schema_path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SettingsError::MissingSchema(path))
            }
            Err(source) => return Err(SettingsError::Read { path, source }),
        };
        Ok(parse_schema(&bytes, self.format)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_settings(dir: &Path, body: &str) {
        fs::write(dir.join(SETTINGS_FILE), body).unwrap();
    }

    #[test]
    fn reads_valid_settings() {
        let dir = tempdir().unwrap();
        write_settings(
            dir.path(),
            r#"{"schemaFileFormat":"yaml","dbName":"blog","workspaceID":"acme-1234"}"#,
        );

        let settings = Settings::read(dir.path()).unwrap();
        assert_eq!(settings.format, SchemaFormat::Yaml);
        assert_eq!(settings.db_name, "blog");
        assert_eq!(settings.workspace_id().unwrap(), "acme-1234");
        assert_eq!(settings.schema_path(), dir.path().join("schema.yaml"));
    }

    #[test]
    fn rejects_unknown_format() {
        let dir = tempdir().unwrap();
        write_settings(dir.path(), r#"{"schemaFileFormat":"toml","dbName":"blog"}"#);
        assert!(matches!(Settings::read(dir.path()), Err(SettingsError::BadFormat)));
    }

    #[test]
    fn missing_workspace_is_reported_on_use() {
        let dir = tempdir().unwrap();
        write_settings(dir.path(), r#"{"schemaFileFormat":"json","dbName":"blog"}"#);
        let settings = Settings::read(dir.path()).unwrap();
        let err = settings.workspace_id().unwrap_err();
        assert_eq!(err.to_string(), "workspaceID is missing from settings");
    }

    #[test]
    fn missing_directory_and_schema() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            Settings::read(&dir.path().join("nope")),
            Err(SettingsError::MissingDir(_))
        ));

        write_settings(dir.path(), r#"{"schemaFileFormat":"json","dbName":"blog"}"#);
        let settings = Settings::read(dir.path()).unwrap();
        assert!(matches!(
            settings.read_schema(),
            Err(SettingsError::MissingSchema(_))
        ));
    }

    #[test]
    fn reads_schema_file() {
        let dir = tempdir().unwrap();
        write_settings(dir.path(), r#"{"schemaFileFormat":"json","dbName":"blog"}"#);
        fs::write(
            dir.path().join("schema.json"),
            r#"{"formatVersion":"1.0","tables":[{"name":"posts","columns":[{"name":"title","type":"string"}]}]}"#,
        )
        .unwrap();

        let schema = Settings::read(dir.path()).unwrap().read_schema().unwrap();
        assert_eq!(schema.tables[0].name, "posts");
    }
}
