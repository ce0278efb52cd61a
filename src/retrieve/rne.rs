//! Range network expansion
//!
//! Returns every paragraph whose similarity-derived distance to the query
//! stays within a semantic radius. Favors precision at a fixed radius; the
//! k-bounded counterpart lives in [`super::ine`].

use std::collections::HashSet;

use super::expand::{expand, materialize, StopRule};
use super::types::Hit;
use crate::embedding::{normalize, Embedder};
use crate::error::RetrievalResult;
use crate::graph::UnitId;
use crate::store::GraphStore;

/// Query for threshold-bounded range expansion.
#[derive(Debug, Clone)]
pub struct RangeQuery {
    /// Minimum relevance of a returned hit
    pub threshold: f32,
    /// Seed breadth of the initial vector search
    pub initial_k: usize,
    /// Optional cap on the number of hits
    pub max_results: Option<usize>,
    /// Restrict search and expansion to these paragraphs
    pub scope: Option<HashSet<UnitId>>,
}

impl RangeQuery {
    /// Create a query with the given semantic radius.
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            initial_k: 10,
            max_results: None,
            scope: None,
        }
    }

    /// Set the seed breadth
    pub fn with_initial_k(mut self, initial_k: usize) -> Self {
        self.initial_k = initial_k;
        self
    }

    /// Cap the number of hits
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Restrict to a paragraph scope
    pub fn with_scope(mut self, scope: HashSet<UnitId>) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Execute against a store, embedding the query text with `embedder`.
    ///
    /// Hits come back sorted by relevance descending, ties broken by
    /// paragraph id; every hit satisfies `relevance >= threshold`.
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
            self.initial_k,
            self.scope.as_ref(),
            StopRule::Threshold {
                threshold: self.threshold,
                max_results: self.max_results,
            },
        )
        .await?;

        let mut hits = materialize(store, finalized).await?;
        hits.sort_by(|a, b| {
            b.relevance
                .total_cmp(&a.relevance)
                .then_with(|| a.paragraph_id.cmp(&b.paragraph_id))
        });
        Ok(hits)
    }
}
