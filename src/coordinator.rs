//! Query coordination across domains
//!
//! Maps a query to one or more domain agents, runs them in parallel, and
//! merges the answers. Two routing modes: broadcast to every domain, or
//! centroid routing to the top-R domains by query/centroid similarity.
//! Queries may carry a deadline; agents still in flight at the deadline
//! contribute nothing and the outcome is flagged truncated.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::agent::{AgentRegistry, SearchTrace};
use crate::cluster::{DomainClusterer, DomainMap};
use crate::config::LexGraphConfig;
use crate::embedding::{cosine_similarity, normalize, Embedder};
use crate::error::{RetrievalError, RetrievalResult};
use crate::graph::DomainId;
use crate::retrieve::{merge_hits, Hit, RangeQuery};
use crate::store::GraphStore;

/// How a query is mapped to domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMode {
    /// Run every domain agent; feasible while the domain count is small
    Broadcast,
    /// Embed the query once and run the top-R domains by centroid similarity
    Centroid { top_r: usize },
}

/// Merged multi-domain search result.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub hits: Vec<Hit>,
    /// True when the deadline cut off at least one in-flight agent
    pub truncated: bool,
    /// Domains the query was routed to
    pub routed_domains: Vec<DomainId>,
}

/// Runs domain agents in parallel and merges their answers.
pub struct QueryCoordinator {
    store: Arc<dyn GraphStore>,
    clusterer: Arc<DomainClusterer>,
    registry: Arc<AgentRegistry>,
    embedder: Arc<dyn Embedder>,
    config: LexGraphConfig,
}

impl QueryCoordinator {
    pub fn new(
        store: Arc<dyn GraphStore>,
        clusterer: Arc<DomainClusterer>,
        registry: Arc<AgentRegistry>,
        embedder: Arc<dyn Embedder>,
        config: LexGraphConfig,
    ) -> Self {
        Self {
            store,
            clusterer,
            registry,
            embedder,
            config,
        }
    }

    /// Domains the query is routed to under the given mode.
    async fn route(&self, snapshot: &DomainMap, query_text: &str, mode: RouteMode)
        -> RetrievalResult<Vec<DomainId>> {
        match mode {
            RouteMode::Broadcast => {
                let mut ids: Vec<DomainId> = snapshot.domains().map(|d| d.id.clone()).collect();
                ids.sort();
                Ok(ids)
            }
            RouteMode::Centroid { top_r } => {
                let mut query = self.embedder.embed(query_text).await?;
                normalize(&mut query);
                let mut ranked: Vec<(DomainId, f32)> = snapshot
                    .domains()
                    .filter_map(|d| {
                        cosine_similarity(&query, &d.centroid).map(|sim| (d.id.clone(), sim))
                    })
                    .collect();
                ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                ranked.truncate(top_r);
                Ok(ranked.into_iter().map(|(id, _)| id).collect())
            }
        }
    }

    /// Run the routed agents in parallel and merge, deduplicating by
    /// paragraph id and keeping the maximum relevance.
    pub async fn search(
        &self,
        query_text: &str,
        mode: RouteMode,
        limit: usize,
        deadline: Option<Duration>,
    ) -> RetrievalResult<SearchOutcome> {
        if deadline == Some(Duration::ZERO) {
            return Err(RetrievalError::Cancelled { partial: Vec::new() });
        }

        let snapshot = self.clusterer.snapshot();
        // Bootstrap regime: no domains yet, fall back to a global search
        if snapshot.is_empty() {
            let mut hits = RangeQuery::new(self.config.rne_default_threshold)
                .with_initial_k(self.config.rne_initial_k)
                .execute(self.store.as_ref(), self.embedder.as_ref(), query_text)
                .await?;
            hits.truncate(limit);
            return Ok(SearchOutcome {
                hits,
                truncated: false,
                routed_domains: Vec::new(),
            });
        }

        let routed = self.route(&snapshot, query_text, mode).await?;
        debug!(domains = routed.len(), "query routed");

        let mut join_set = tokio::task::JoinSet::new();
        for domain in &routed {
            let registry = Arc::clone(&self.registry);
            let domain = domain.clone();
            let query = query_text.to_string();
            join_set.spawn(async move {
                let result = registry.search(&domain, &query, SearchTrace::new()).await;
                (domain, result)
            });
        }

        let mut contributions: Vec<Vec<Hit>> = Vec::new();
        let mut truncated = false;
        let collect = async {
            while let Some(joined) = join_set.join_next().await {
                match joined {
                    Ok((_, Ok(Some(response)))) => contributions.push(response.hits),
                    Ok((domain, Ok(None))) => {
                        warn!(%domain, "routed domain has no agent, skipping");
                    }
                    // One domain failing must not sink the others
                    Ok((domain, Err(err))) => {
                        warn!(%domain, error = %err, "domain agent failed");
                    }
                    Err(join_err) => {
                        warn!(error = %join_err, "domain agent task aborted");
                    }
                }
            }
        };

        match deadline {
            Some(remaining) => {
                if tokio::time::timeout(remaining, collect).await.is_err() {
                    truncated = true;
                }
            }
            None => collect.await,
        }

        let mut hits = merge_hits(contributions);
        hits.truncate(limit);
        Ok(SearchOutcome {
            hits,
            truncated,
            routed_domains: routed,
        })
    }
}
