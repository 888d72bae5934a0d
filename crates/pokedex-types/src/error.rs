//! Error types for parsing identifiers in pokedex-types.

use thiserror::Error;

/// Errors that can occur when interpreting upstream identifiers.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    /// The generation name is not one of `generation-i` through `generation-ix`.
    #[error("Unknown generation: {0}")]
    UnknownGeneration(String),

    /// A resource URL does not end in a numeric id segment.
    #[error("Resource URL has no numeric id: {0}")]
    InvalidResourceUrl(String),
}

/// Result type alias using pokedex-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
