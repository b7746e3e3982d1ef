//! Error types for the sync engine.

use schemasync_protocol::ProtocolError;
use schemasync_schema::SchemaError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while migrating, walking history or moving data.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The remote service failed or returned a non-success status.
    #[error("{}", network_message(*status, message))]
    Network {
        /// HTTP status, if a response was received.
        status: Option<u16>,
        /// Error message.
        message: String,
    },

    /// The credentials were rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Input rejected before any remote call was made.
    #[error("{0}")]
    Validation(String),

    /// The remote state does not allow the operation.
    #[error("{0}")]
    Conflict(String),

    /// A data load stopped at a line of a table file.
    #[error("error loading table [{table}] at line {line}: {message}")]
    PartialWrite {
        /// Table being loaded.
        table: String,
        /// 1-based line number of the failing record.
        line: usize,
        /// Cause.
        message: String,
    },

    /// A data dump stopped during pagination.
    #[error("error dumping table [{table}] after {pages_completed} pages: {source}")]
    ExportInterrupted {
        /// Table being dumped.
        table: String,
        /// Pages fully written before the failure.
        pages_completed: usize,
        /// Cursor of the last completed page.
        last_cursor: Option<String>,
        /// Cause.
        #[source]
        source: Box<SyncError>,
    },

    /// An output path already exists.
    #[error("output path {} already exists", path.display())]
    AlreadyExists {
        /// Offending path.
        path: PathBuf,
    },

    /// Schema parsing or validation error.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Local file system error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A message or record could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// The operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,
}

fn network_message(status: Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("request failed with status {}: {}", status, message),
        None => format!("request failed: {}", message),
    }
}

impl SyncError {
    /// Creates a network error for a response with the given status.
    pub fn network(status: u16, message: impl Into<String>) -> Self {
        Self::Network {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Creates a network error for a request that got no response.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Network {
            status: None,
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Creates a partial write error.
    pub fn partial_write(table: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::PartialWrite {
            table: table.into(),
            line,
            message: message.into(),
        }
    }

    /// Returns true if the credentials were rejected.
    ///
    /// Looks through export wrappers so callers can surface the login hint.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            SyncError::Unauthorized(_) => true,
            SyncError::ExportInterrupted { source, .. } => source.is_unauthorized(),
            _ => false,
        }
    }

    /// Returns the HTTP status of a network error.
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Network { status, .. } => *status,
            SyncError::Unauthorized(_) => Some(401),
            _ => None,
        }
    }
}

impl From<ProtocolError> for SyncError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::InvalidBranchUrl(message) => SyncError::Validation(message),
            ProtocolError::Schema(err) => SyncError::Schema(err),
            ProtocolError::Codec(err) => SyncError::Codec(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Codec(err.to_string())
    }
}
