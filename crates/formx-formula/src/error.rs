//! Formula error types
//!
//! All three variants are contained faults from the engine's point of
//! view: a field whose formula raises one keeps its previous value.

use thiserror::Error;

/// Result type for formula operations
pub type ExprResult<T> = std::result::Result<T, ExprError>;

/// Errors raised while tokenizing, compiling or evaluating a formula
#[derive(Debug, Error)]
pub enum ExprError {
    /// Unexpected character in the formula text
    #[error("Unexpected character '{character}' at position {position}")]
    Tokenize { position: usize, character: char },

    /// Structural error while compiling to postfix
    #[error("Parse error: {0}")]
    Parse(String),

    /// Stack-machine fault while evaluating a program
    #[error("Evaluation error: {0}")]
    Eval(String),
}
