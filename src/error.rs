//! Crate-level error taxonomy
//!
//! Retrieval never panics on data anomalies; only configuration and
//! programmer errors are fatal. Inconsistent graph state is logged as a
//! `data_integrity` warning at the site that observes it and skipped —
//! it never appears in this taxonomy.

use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::retrieve::Hit;
use crate::store::StoreError;

/// Errors surfaced by the retrieval engine.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// A store or provider stayed unreachable through the bounded retries
    #[error("external dependency unavailable: {0}")]
    ExternalUnavailable(String),

    /// A document failed validation; nothing was persisted
    #[error("document rejected at unit '{unit}': {reason}")]
    IngestionRejected { unit: String, reason: String },

    /// The deadline expired; `partial` holds whatever was finalized in time
    #[error("query cancelled at deadline with {} partial hits", partial.len())]
    Cancelled { partial: Vec<Hit> },

    /// Configuration or programmer error, raised at startup
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// Storage error other than unavailability
    #[error("storage error: {0}")]
    Store(StoreError),

    /// Embedding provider error
    #[error("embedding error: {0}")]
    Embedding(EmbeddingError),
}

/// Result type for engine operations.
pub type RetrievalResult<T> = Result<T, RetrievalError>;

impl From<StoreError> for RetrievalError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => RetrievalError::ExternalUnavailable(msg),
            other => RetrievalError::Store(other),
        }
    }
}

impl From<EmbeddingError> for RetrievalError {
    fn from(err: EmbeddingError) -> Self {
        match err {
            EmbeddingError::Unavailable(msg) => RetrievalError::ExternalUnavailable(msg),
            other => RetrievalError::Embedding(other),
        }
    }
}
