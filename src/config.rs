//! Engine configuration
//!
//! All tunables recognized by the engine, with the calibrated defaults for a
//! three-tier statute/decree/rule corpus. Configuration errors are programmer
//! errors and fail loudly at startup; they are never surfaced per query.

use serde::{Deserialize, Serialize};

use crate::error::{RetrievalError, RetrievalResult};

/// Engine configuration.
///
/// Deserializable from JSON so deployments can ship a config file; every
/// field has a default, so `LexGraphConfig::default()` is a working setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LexGraphConfig {
    /// Dimension of paragraph/query vectors and the paragraph vector index
    pub node_embedding_dim: usize,
    /// Dimension of relation-context vectors and index
    pub relation_embedding_dim: usize,
    /// Minimum centroid similarity for adding a paragraph to an existing
    /// domain; below this a new domain is created
    pub domain_similarity_threshold: f32,
    /// Domain size lower bound; smaller domains await a merge
    pub min_agent_size: usize,
    /// Domain size upper bound; larger domains await a split
    pub max_agent_size: usize,
    /// Minimum cross-law link count to declare two domains neighbors
    pub neighbor_threshold: usize,
    /// Below this quality score an agent asks its neighbors for help
    pub collab_quality_threshold: f32,
    /// Upper bound on neighbor fan-out per query
    pub max_neighbors_consulted: usize,
    /// Default semantic radius for range expansion
    pub rne_default_threshold: f32,
    /// Default seed breadth for range expansion
    pub rne_initial_k: usize,
    /// Hits an agent collects from its own scope per query
    pub agent_hit_limit: usize,
    /// Timeout for a single neighbor collaboration call, in milliseconds
    pub collaboration_timeout_ms: u64,
    /// Bounded-backoff retry attempts at the store boundary
    pub store_retry_attempts: usize,
    /// Base delay between store retries, in milliseconds (doubles per attempt)
    pub store_retry_base_ms: u64,
    /// Inclusive k range swept by the bootstrap clustering
    pub bootstrap_k_min: usize,
    pub bootstrap_k_max: usize,
    /// Pending-assignment count above which rebalancing yields the write lock
    pub rebalance_yield_threshold: usize,
}

impl Default for LexGraphConfig {
    fn default() -> Self {
        Self {
            node_embedding_dim: 768,
            relation_embedding_dim: 3072,
            domain_similarity_threshold: 0.85,
            min_agent_size: 50,
            max_agent_size: 500,
            neighbor_threshold: 10,
            collab_quality_threshold: 0.6,
            max_neighbors_consulted: 3,
            rne_default_threshold: 0.75,
            rne_initial_k: 10,
            agent_hit_limit: 10,
            collaboration_timeout_ms: 2_000,
            store_retry_attempts: 3,
            store_retry_base_ms: 50,
            bootstrap_k_min: 3,
            bootstrap_k_max: 10,
            rebalance_yield_threshold: 32,
        }
    }
}

impl LexGraphConfig {
    /// Validate the configuration at startup.
    pub fn validate(&self) -> RetrievalResult<()> {
        if self.node_embedding_dim == 0 {
            return Err(RetrievalError::ConfigInvalid(
                "node_embedding_dim must be positive".into(),
            ));
        }
        if self.relation_embedding_dim == 0 {
            return Err(RetrievalError::ConfigInvalid(
                "relation_embedding_dim must be positive".into(),
            ));
        }
        for (name, value) in [
            ("domain_similarity_threshold", self.domain_similarity_threshold),
            ("collab_quality_threshold", self.collab_quality_threshold),
            ("rne_default_threshold", self.rne_default_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(RetrievalError::ConfigInvalid(format!(
                    "{} must lie in [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.min_agent_size == 0 || self.min_agent_size > self.max_agent_size {
            return Err(RetrievalError::ConfigInvalid(format!(
                "agent size bounds must satisfy 0 < min <= max, got ({}, {})",
                self.min_agent_size, self.max_agent_size
            )));
        }
        if self.bootstrap_k_min < 2 || self.bootstrap_k_min > self.bootstrap_k_max {
            return Err(RetrievalError::ConfigInvalid(format!(
                "bootstrap k range must satisfy 2 <= min <= max, got ({}, {})",
                self.bootstrap_k_min, self.bootstrap_k_max
            )));
        }
        if self.rne_initial_k == 0 || self.agent_hit_limit == 0 {
            return Err(RetrievalError::ConfigInvalid(
                "rne_initial_k and agent_hit_limit must be positive".into(),
            ));
        }
        Ok(())
    }
}
