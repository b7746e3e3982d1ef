//! Error types for the protocol crate.

use schemasync_schema::SchemaError;
use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while building or decoding protocol values.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// A branch URL does not have the expected shape.
    #[error("{0}")]
    InvalidBranchUrl(String),

    /// A name failed identifier validation.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A message could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}
