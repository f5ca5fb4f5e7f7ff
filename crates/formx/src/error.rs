//! Engine error types

use thiserror::Error;

/// Errors raised while constructing an engine
///
/// Runtime faults (broken formulas, unknown functions, out-of-scope writes)
/// are contained and logged, never returned; only schema construction can
/// fail.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Two fields in the flattened schema share a key
    #[error("duplicate field key: {0}")]
    DuplicateKey(String),

    /// Error from the core data model
    #[error(transparent)]
    Core(#[from] formx_core::CoreError),
}

/// Result alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
