//! Domain entities for the self-organizing clustering layer
//!
//! A domain is a cluster of paragraphs with coherent semantics, owned by the
//! clusterer in process memory and mirrored into the graph store for
//! observability. Every embedded paragraph belongs to exactly one domain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use super::unit::UnitId;

/// Unique identifier for a domain
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainId(String);

impl DomainId {
    /// Create a new random DomainId (UUID-based)
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a DomainId from a string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form used as the fallback domain name.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(8)]
    }
}

impl Default for DomainId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DomainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DomainId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle phase of a domain, derived from its size against the configured
/// bounds. Split and merge destroy the domain, so there is no terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainPhase {
    /// Below the minimum size; awaits a merge
    Nascent,
    /// Within bounds
    Stable,
    /// Above the maximum size; awaits a split
    Oversized,
}

/// A cluster of paragraphs with a mean-embedding centroid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    /// Unique identifier
    pub id: DomainId,
    /// Human-readable name; advisory, falls back to the uuid-derived id
    pub name: String,
    /// Component-wise mean of the member paragraph embeddings
    pub centroid: Vec<f32>,
    /// Member paragraph ids
    pub node_ids: HashSet<UnitId>,
    /// Domains adjacent through cross-law links
    pub neighbors: HashSet<DomainId>,
    /// When the domain was created
    pub created_at: DateTime<Utc>,
}

impl Domain {
    /// Create a single-member domain seeded with the paragraph's embedding.
    pub fn seeded(paragraph: UnitId, embedding: Vec<f32>) -> Self {
        let id = DomainId::new();
        let name = format!("domain-{}", id.short());
        let mut node_ids = HashSet::new();
        node_ids.insert(paragraph);
        Self {
            id,
            name,
            centroid: embedding,
            node_ids,
            neighbors: HashSet::new(),
            created_at: Utc::now(),
        }
    }

    /// Create an empty domain with the given centroid (bootstrap/split path).
    pub fn with_centroid(centroid: Vec<f32>) -> Self {
        let id = DomainId::new();
        let name = format!("domain-{}", id.short());
        Self {
            id,
            name,
            centroid,
            node_ids: HashSet::new(),
            neighbors: HashSet::new(),
            created_at: Utc::now(),
        }
    }

    pub fn size(&self) -> usize {
        self.node_ids.len()
    }

    /// Phase against the configured size bounds.
    pub fn phase(&self, min_size: usize, max_size: usize) -> DomainPhase {
        let n = self.size();
        if n < min_size {
            DomainPhase::Nascent
        } else if n > max_size {
            DomainPhase::Oversized
        } else {
            DomainPhase::Stable
        }
    }

    /// Fold one more member embedding into the centroid.
    ///
    /// Call before inserting the member id so the previous size is the
    /// denominator base.
    pub fn fold_into_centroid(&mut self, embedding: &[f32]) {
        let n = self.size() as f32;
        for (c, x) in self.centroid.iter_mut().zip(embedding.iter()) {
            *c = (*c * n + x) / (n + 1.0);
        }
    }
}
