//! Branch locators.

use crate::error::{ProtocolError, ProtocolResult};
use percent_encoding::percent_decode_str;
use schemasync_schema::validate_identifier;
use std::fmt;
use url::Url;

/// A database branch, addressed as `{database}:{branch}`.
///
/// Both names are validated identifiers, so a `BranchRef` can be placed in a
/// request path without escaping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchRef {
    database: String,
    branch: String,
}

impl BranchRef {
    /// Creates a locator after validating both names.
    pub fn new(database: impl Into<String>, branch: impl Into<String>) -> ProtocolResult<Self> {
        let database = database.into();
        let branch = branch.into();
        validate_identifier("database", &database)?;
        validate_identifier("branch", &branch)?;
        Ok(Self { database, branch })
    }

    /// Database name.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Branch name.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Returns a locator for another branch of the same database.
    pub fn with_branch(&self, branch: impl Into<String>) -> ProtocolResult<Self> {
        Self::new(self.database.clone(), branch)
    }

    /// Request path prefix for this branch.
    pub fn path(&self) -> String {
        format!("/db/{}", self)
    }
}

impl fmt::Display for BranchRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.database, self.branch)
    }
}

/// A branch URL of the form `https://{workspace}.{domain}/db/{database}:{branch}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchUrl {
    /// Base URL of the workspace endpoint (scheme, host and port).
    pub base_url: String,
    /// Workspace id (first host label).
    pub workspace: String,
    /// Database name, not yet validated.
    pub database: String,
    /// Branch name, not yet validated.
    pub branch: String,
}

impl BranchUrl {
    /// Parses a branch URL.
    pub fn parse(input: &str) -> ProtocolResult<Self> {
        let url = Url::parse(input)
            .map_err(|e| ProtocolError::InvalidBranchUrl(format!("invalid URL `{}`: {}", input, e)))?;
        let host = url.host_str().unwrap_or_default();

        let labels: Vec<&str> = host.split('.').collect();
        if labels.len() != 3 || labels.iter().any(|l| l.is_empty()) {
            return Err(ProtocolError::InvalidBranchUrl(format!(
                "Expected URL hostname to be a single subdomain of the service domain (Example demo-1234.example.sh). Got: {}",
                host
            )));
        }

        let path = percent_decode_str(url.path()).decode_utf8().map_err(|e| {
            ProtocolError::InvalidBranchUrl(format!("invalid URL path `{}`: {}", url.path(), e))
        })?;
        let path_error = || {
            ProtocolError::InvalidBranchUrl(format!(
                "Expected URL path to be of the form /db/{{database}}:{{branch}}. Got: {}",
                path
            ))
        };
        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() < 3 || !segments[0].is_empty() || segments[1] != "db" {
            return Err(path_error());
        }
        let parts: Vec<&str> = segments[2].split(':').collect();
        if parts.len() != 2 {
            return Err(path_error());
        }

        let base_url = match url.port() {
            Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
            None => format!("{}://{}", url.scheme(), host),
        };

        Ok(Self {
            base_url,
            workspace: labels[0].to_string(),
            database: parts[0].to_string(),
            branch: parts[1].to_string(),
        })
    }

    /// Validates the names and returns the branch locator.
    pub fn branch_ref(&self) -> ProtocolResult<BranchRef> {
        BranchRef::new(self.database.clone(), self.branch.clone())
    }
}
