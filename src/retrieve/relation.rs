//! Relation retrieval
//!
//! Pure vector search over embedded containment contexts. Surfaces the
//! connective evidence node-level search misses — the clause carving out an
//! exception, the paragraph citing another article. No type-based filtering
//! is applied: ranking is similarity-only.

use super::types::RelationHit;
use crate::embedding::{normalize, Embedder};
use crate::error::RetrievalResult;
use crate::store::GraphStore;

/// Query for top-k relation-context search.
#[derive(Debug, Clone)]
pub struct RelationQuery {
    pub top_k: usize,
}

impl RelationQuery {
    pub fn new(top_k: usize) -> Self {
        Self { top_k }
    }

    /// Execute against a store, embedding the query text with the relation
    /// provider.
    pub async fn execute(
        &self,
        store: &dyn GraphStore,
        embedder: &dyn Embedder,
        query_text: &str,
    ) -> RetrievalResult<Vec<RelationHit>> {
        let mut query = embedder.embed(query_text).await?;
        normalize(&mut query);

        let matches = store.vector_search_relations(&query, self.top_k).await?;
        Ok(matches
            .into_iter()
            .map(|m| RelationHit {
                from_id: m.from_id,
                to_id: m.to_id,
                context_text: m.context_text,
                similarity: m.similarity,
            })
            .collect())
    }
}
