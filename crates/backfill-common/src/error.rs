//! Error types for field-backfill

use thiserror::Error;

/// Result type alias for backfill operations
pub type Result<T> = std::result::Result<T, BackfillError>;

/// Error kinds of a backfill run, one per phase
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackfillError {
    /// One or more required settings are absent or empty
    #[error("Missing configuration: {0}")]
    Configuration(String),

    /// Establishing the connection or selecting the database failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// Cursor iteration or a document update failed
    #[error("Operation error: {0}")]
    Operation(String),
}

impl BackfillError {
    /// Returns true if this error should terminate the process with a failure status
    pub fn is_fatal(&self) -> bool {
        matches!(self, BackfillError::Connection(_))
    }

    /// Short label of the error kind, used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            BackfillError::Configuration(_) => "configuration",
            BackfillError::Connection(_) => "connection",
            BackfillError::Operation(_) => "operation",
        }
    }
}
