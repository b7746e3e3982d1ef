//! Migration plans and migration diffs.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use schemasync_schema::{Column, Table};
use serde::{Deserialize, Serialize};

/// Envelope returned by the plan endpoint and submitted to the execute endpoint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MigrationPlan {
    /// The migration to apply.
    pub migration: Migration,
}

impl MigrationPlan {
    /// Wraps a migration.
    pub fn new(migration: Migration) -> Self {
        Self { migration }
    }

    /// Returns true if the plan would not change the branch.
    pub fn is_empty(&self) -> bool {
        self.migration.is_empty()
    }
}

/// A schema migration: the diff plus the metadata recorded when applied.
///
/// Map-valued diff fields keep the order in which the service listed them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Migration {
    /// Migration id, assigned by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Id of the previous migration on the branch.
    #[serde(default, rename = "parentID", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Status reported by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Human readable title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Branch and migration this migration's branch was forked from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_from: Option<StartedFrom>,
    /// Last git commit of the working tree that produced the schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_git_revision: Option<String>,
    /// Whether the schema file had uncommitted changes.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub local_changes: bool,
    /// When the migration was applied.
    #[serde(default, with = "rfc3339_seconds", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Tables to create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_tables: Option<IndexMap<String, Table>>,
    /// Tables to delete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed_tables: Option<Vec<String>>,
    /// Tables to rename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renamed_tables: Option<Vec<TableRename>>,
    /// Column changes of existing tables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_migrations: Option<IndexMap<String, TableMigration>>,
}

impl Migration {
    /// Returns true if the migration has nothing to apply.
    ///
    /// Renames alone do not make a migration non-empty.
    pub fn is_empty(&self) -> bool {
        self.new_tables.as_ref().map_or(true, IndexMap::is_empty)
            && self.removed_tables.is_none()
            && self.table_migrations.is_none()
    }
}

/// Fork origin of a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartedFrom {
    /// Origin branch.
    #[serde(rename = "branchName")]
    pub branch_name: String,
    /// Migration of the origin branch the fork was taken at.
    #[serde(rename = "migrationID")]
    pub migration_id: String,
}

/// A table rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRename {
    /// Previous name.
    pub old_name: String,
    /// New name.
    pub new_name: String,
}

/// Column changes of one table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMigration {
    /// Columns to add.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_columns: Option<IndexMap<String, Column>>,
    /// Columns to delete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed_columns: Option<Vec<String>>,
    /// Columns whose definition changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_columns: Option<Vec<ColumnMigration>>,
}

/// A column definition change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMigration {
    /// Definition before the change.
    pub old: Column,
    /// Definition after the change.
    pub new: Column,
}

mod rfc3339_seconds {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(at) => serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Secs, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|at| at.with_timezone(&Utc))
                .map_err(de::Error::custom)
        })
        .transpose()
    }
}
