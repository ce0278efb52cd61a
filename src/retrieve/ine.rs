//! Incremental network expansion
//!
//! Returns exactly k paragraphs ranked by semantic cost, stopping as soon as
//! k are finalized. No threshold is applied, so low-relevance paragraphs can
//! appear when nothing closer is reachable — recall at a fixed cardinality.

use std::collections::HashSet;

use super::expand::{expand, materialize, StopRule};
use super::types::Hit;
use crate::embedding::{normalize, Embedder};
use crate::error::RetrievalResult;
use crate::graph::UnitId;
use crate::store::GraphStore;

/// Query for k-nearest incremental expansion.
#[derive(Debug, Clone)]
pub struct NearestQuery {
    /// Number of paragraphs to return
    pub k: usize,
    /// Seed breadth; defaults to `2k` since seed diversity matters more here
    pub initial_k: Option<usize>,
    /// Restrict search and expansion to these paragraphs
    pub scope: Option<HashSet<UnitId>>,
}

impl NearestQuery {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            initial_k: None,
            scope: None,
        }
    }

    /// Override the seed breadth
    pub fn with_initial_k(mut self, initial_k: usize) -> Self {
        self.initial_k = Some(initial_k);
        self
    }

    /// Restrict to a paragraph scope
    pub fn with_scope(mut self, scope: HashSet<UnitId>) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Execute against a store, embedding the query text with `embedder`.
    ///
    /// Returns `min(k, reachable)` hits in ascending cost order.
    pub async fn execute(
        &self,
        store: &dyn GraphStore,
        embedder: &dyn Embedder,
        query_text: &str,
    ) -> RetrievalResult<Vec<Hit>> {
        let mut query = embedder.embed(query_text).await?;
        normalize(&mut query);

        let finalized = expand(
            store,
            &query,
            self.initial_k.unwrap_or(self.k * 2).max(1),
            self.scope.as_ref(),
            StopRule::Count { k: self.k },
        )
        .await?;

        // Finalization order is already ascending cost
        let mut hits = materialize(store, finalized).await?;
        hits.truncate(self.k);
        Ok(hits)
    }
}
