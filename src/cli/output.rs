//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{CompletionError, StorageError};

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &CompletionError) -> String {
    match e {
        CompletionError::Storage(StorageError::Rejected(msg)) => {
            format!("Store rejected the write: {}", msg)
        }
        CompletionError::InvalidSignal(msg) => format!("Invalid payload: {}", msg),
        other => other.to_string(),
    }
}
