//! Error types for pokedex-store.

use std::path::PathBuf;

/// Result type for pokedex-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in pokedex-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to create the store directory.
    #[error("Failed to create store directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write the store file.
    #[error("Failed to write store file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
