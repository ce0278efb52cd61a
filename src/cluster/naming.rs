//! Advisory domain naming
//!
//! The clusterer hands up to five sample paragraph texts to an external
//! collaborator and gets a short human-readable name back. Naming is strictly
//! advisory: on failure or an empty answer the domain keeps its uuid-derived
//! name, and clustering proceeds unaffected.

use async_trait::async_trait;
use thiserror::Error;

/// Error type for naming operations.
#[derive(Debug, Error)]
#[error("domain naming failed: {0}")]
pub struct NamingError(pub String);

/// External collaborator that names a cluster from sample paragraph texts.
#[async_trait]
pub trait DomainNamer: Send + Sync {
    /// Propose a short name for a cluster given up to 5 sample texts.
    async fn name_domain(&self, samples: &[String]) -> Result<String, NamingError>;
}

/// Namer that never proposes anything; domains keep their uuid-derived names.
pub struct NoopNamer;

#[async_trait]
impl DomainNamer for NoopNamer {
    async fn name_domain(&self, _samples: &[String]) -> Result<String, NamingError> {
        Err(NamingError("naming collaborator not configured".into()))
    }
}
