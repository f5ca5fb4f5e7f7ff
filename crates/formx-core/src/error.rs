//! Error types for formx-core

use thiserror::Error;

/// Result type alias using [`CoreError`]
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Errors that can occur in formx-core
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed path string (empty, or containing empty segments)
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// List index too far past the end of the list
    #[error("Index {index} out of bounds at '{path}' (len: {len})")]
    IndexOutOfBounds {
        path: String,
        index: usize,
        len: usize,
    },

    /// Path segment addressed a key on a non-record value
    #[error("Not a record at '{0}'")]
    NotARecord(String),

    /// Path segment addressed an index on a non-list value
    #[error("Not a list at '{0}'")]
    NotAList(String),
}
