//! Configuration for the engine.

use schemasync_schema::SCHEMA_FORMAT_VERSION;

/// Configuration for engine operations.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Records requested per page when dumping a table.
    pub page_size: usize,
    /// Migrations requested per history page; the service default when `None`.
    pub history_page_size: Option<usize>,
    /// Maximum number of branches visited by a followed lineage walk.
    pub max_lineage_hops: usize,
    /// Suffix of the schema file backup.
    pub backup_suffix: String,
    /// Format version stamped on pulled schemas.
    pub schema_format_version: String,
    /// Branch used when nothing else names one.
    pub default_branch: String,
}

impl EngineConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            page_size: 10,
            history_page_size: None,
            max_lineage_hops: 64,
            backup_suffix: ".bak".to_string(),
            schema_format_version: SCHEMA_FORMAT_VERSION.to_string(),
            default_branch: "main".to_string(),
        }
    }

    /// Sets the export page size.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    /// Sets the history page size.
    pub fn with_history_page_size(mut self, size: usize) -> Self {
        self.history_page_size = Some(size);
        self
    }

    /// Sets the lineage hop bound.
    pub fn with_max_lineage_hops(mut self, hops: usize) -> Self {
        self.max_lineage_hops = hops;
        self
    }

    /// Sets the backup suffix.
    pub fn with_backup_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.backup_suffix = suffix.into();
        self
    }

    /// Sets the default branch.
    pub fn with_default_branch(mut self, branch: impl Into<String>) -> Self {
        self.default_branch = branch.into();
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
