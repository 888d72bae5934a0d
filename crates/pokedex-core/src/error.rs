//! Error types for pokedex-core.
//!
//! Two layers of errors exist:
//!
//! - [`UpstreamError`] describes a single failed upstream request. It is what
//!   an [`Upstream`](crate::Upstream) implementation returns.
//! - [`Error`] is what the aggregation engine returns. It names the record
//!   that could not be resolved and wraps the upstream cause.
//!
//! ## Propagation
//!
//! | Operation | On failure |
//! |-----------|------------|
//! | Single-record lookups | First hard failure is returned |
//! | Bulk crawl items | Logged and skipped |
//! | Ability fan-out items | Logged and skipped |
//! | Crawl listing page | Logged, crawl stops with partial results |
//!
//! No request is retried; callers decide whether to try again.

use thiserror::Error;

/// Boxed transport-level cause.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by a single upstream request.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UpstreamError {
    /// The upstream answered 404.
    #[error("Upstream resource not found: {url}")]
    NotFound { url: String },

    /// The request never produced a response.
    #[error("Upstream request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },

    /// The upstream answered with a non-success status other than 404.
    #[error("Upstream returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// The body was not the expected shape.
    #[error("Unexpected upstream response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl UpstreamError {
    /// Whether this is a 404 from upstream.
    pub fn is_not_found(&self) -> bool {
        matches!(self, UpstreamError::NotFound { .. })
    }
}

/// Result type alias for upstream requests.
pub type UpstreamResult<T> = std::result::Result<T, UpstreamError>;

/// Errors returned by the aggregation engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The id or name cannot be resolved upstream.
    #[error("{0}")]
    NotFound(String),

    /// An upstream call failed while resolving a record.
    #[error("Failed to fetch {context}: {source}")]
    Upstream {
        context: String,
        #[source]
        source: UpstreamError,
    },

    /// Persisting a result failed.
    #[error("Store error: {0}")]
    Store(#[from] pokedex_store::Error),

    /// The caller passed an argument the engine cannot act on.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Wrap an upstream failure with the record it was resolving.
    pub fn upstream(context: impl Into<String>, source: UpstreamError) -> Self {
        Error::Upstream {
            context: context.into(),
            source,
        }
    }

    /// Whether the failure means "does not exist" rather than "could not fetch".
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) => true,
            Error::Upstream { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

/// Result type alias using pokedex-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
