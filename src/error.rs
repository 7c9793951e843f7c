//! Error types for the generation completion engine.

use crate::types::{GenerationId, ShotId};
use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Generation not found: {0}")]
    GenerationNotFound(GenerationId),

    #[error("Shot not found: {0}")]
    ShotNotFound(ShotId),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Write rejected: {0}")]
    Rejected(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StorageError {
    /// Wrap a backend failure as an I/O error with context.
    pub(crate) fn backend(context: &str, err: impl std::fmt::Display) -> Self {
        StorageError::IoError(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("{}: {}", context, err),
        ))
    }
}

/// Errors surfaced by a completion
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The storage collaborator refused a read or write; the completion is aborted.
    #[error("Persistence failure: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid completion signal: {0}")]
    InvalidSignal(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for CompletionError {
    fn from(err: config::ConfigError) -> Self {
        CompletionError::ConfigError(err.to_string())
    }
}
