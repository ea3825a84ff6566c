//! Crate-level error types

use thiserror::Error;

/// Errors surfaced by the engine.
///
/// Parse failures on individual quote lines are intentionally absent: the
/// tick source folds them into a line skip and the stream continues.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
