//! Domain agents
//!
//! One retrieval worker per domain. An agent searches its own paragraph
//! scope, scores the quality of what it found, and — below the quality
//! threshold — asks up to `max_neighbors_consulted` adjacent domain agents
//! for help in parallel. Every collaboration call carries a trace with the
//! set of visited domains; an agent that finds itself already visited
//! answers from its own scope only, which bounds the fan-out and guarantees
//! termination. Agents never mutate the graph.

use dashmap::DashMap;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cluster::DomainMap;
use crate::config::LexGraphConfig;
use crate::embedding::Embedder;
use crate::error::RetrievalResult;
use crate::graph::{DomainId, UnitId};
use crate::retrieve::{merge_hits, Hit, NearestQuery, RangeQuery};
use crate::store::GraphStore;

/// Retrieval algorithm an agent runs inside its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentAlgorithm {
    /// Threshold-bounded range expansion
    #[default]
    Range,
    /// k-nearest incremental expansion
    Nearest,
}

/// Loop-avoidance context threaded through collaboration calls.
#[derive(Debug, Clone)]
pub struct SearchTrace {
    /// Opaque id correlating one user query across agents
    pub trace_id: Uuid,
    /// Domains that have already answered on this trace
    pub visited: HashSet<DomainId>,
}

impl SearchTrace {
    pub fn new() -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            visited: HashSet::new(),
        }
    }
}

impl Default for SearchTrace {
    fn default() -> Self {
        Self::new()
    }
}

/// Where an agent's answer came from.
#[derive(Debug, Clone)]
pub struct AgentProvenance {
    pub domain_id: DomainId,
    /// Quality of the local (pre-collaboration) result
    pub quality: f32,
    /// True when at least one neighbor contributed hits
    pub neighbor_contribution: bool,
    /// Neighbors actually consulted on this call
    pub consulted: Vec<DomainId>,
}

/// An agent's answer: merged hits plus provenance.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub hits: Vec<Hit>,
    pub provenance: AgentProvenance,
}

/// Quality of a local result: weighted mean relevance plus a count score
/// that saturates at five hits.
pub fn quality_score(hits: &[Hit]) -> f32 {
    if hits.is_empty() {
        return 0.0;
    }
    let mean: f32 = hits.iter().map(|h| h.relevance).sum::<f32>() / hits.len() as f32;
    let count_score = (hits.len() as f32 / 5.0).min(1.0);
    0.7 * mean + 0.3 * count_score
}

/// One retrieval worker scoped to a domain.
pub struct DomainAgent {
    domain_id: DomainId,
    node_ids: HashSet<UnitId>,
    neighbors: Vec<DomainId>,
    store: Arc<dyn GraphStore>,
    embedder: Arc<dyn Embedder>,
    config: LexGraphConfig,
    algorithm: AgentAlgorithm,
}

impl DomainAgent {
    pub fn domain_id(&self) -> &DomainId {
        &self.domain_id
    }

    pub fn neighbors(&self) -> &[DomainId] {
        &self.neighbors
    }

    /// Scoped retrieval only; no collaboration.
    async fn search_local(&self, query_text: &str) -> RetrievalResult<Vec<Hit>> {
        let mut hits = match self.algorithm {
            AgentAlgorithm::Range => {
                RangeQuery::new(self.config.rne_default_threshold)
                    .with_initial_k(self.config.rne_initial_k)
                    .with_max_results(self.config.agent_hit_limit)
                    .with_scope(self.node_ids.clone())
                    .execute(self.store.as_ref(), self.embedder.as_ref(), query_text)
                    .await?
            }
            AgentAlgorithm::Nearest => {
                NearestQuery::new(self.config.agent_hit_limit)
                    .with_scope(self.node_ids.clone())
                    .execute(self.store.as_ref(), self.embedder.as_ref(), query_text)
                    .await?
            }
        };
        hits.truncate(self.config.agent_hit_limit);
        Ok(hits)
    }

    /// Full search: scoped retrieval, quality evaluation, conditional
    /// collaboration with neighbor agents.
    ///
    /// Boxed because collaboration recurses through neighbor agents; the
    /// recursion is bounded by the visited set growing on every hop.
    pub fn search(
        self: Arc<Self>,
        registry: Arc<AgentRegistry>,
        query_text: &str,
        mut trace: SearchTrace,
    ) -> Pin<Box<dyn Future<Output = RetrievalResult<AgentResponse>> + Send>> {
        let agent = self;
        let query = query_text.to_string();

        Box::pin(async move {
            let local = agent.search_local(&query).await?;
            let quality = quality_score(&local);

            let mut provenance = AgentProvenance {
                domain_id: agent.domain_id.clone(),
                quality,
                neighbor_contribution: false,
                consulted: Vec::new(),
            };

            // Already visited on this trace: answer from own scope only
            if trace.visited.contains(&agent.domain_id)
                || quality >= agent.config.collab_quality_threshold
            {
                return Ok(AgentResponse {
                    hits: local,
                    provenance,
                });
            }

            trace.visited.insert(agent.domain_id.clone());
            let targets: Vec<DomainId> = agent
                .neighbors
                .iter()
                .filter(|n| !trace.visited.contains(*n))
                .take(agent.config.max_neighbors_consulted)
                .cloned()
                .collect();
            if targets.is_empty() {
                return Ok(AgentResponse {
                    hits: local,
                    provenance,
                });
            }
            debug!(
                trace = %trace.trace_id,
                domain = %agent.domain_id,
                quality,
                neighbors = targets.len(),
                "collaborating with neighbor domains"
            );

            let timeout = Duration::from_millis(agent.config.collaboration_timeout_ms);
            let mut join_set = tokio::task::JoinSet::new();
            for target in &targets {
                let registry = Arc::clone(&registry);
                let target = target.clone();
                let query = query.clone();
                let trace = trace.clone();
                join_set.spawn(async move {
                    tokio::time::timeout(timeout, registry.search(&target, &query, trace)).await
                });
            }
            provenance.consulted = targets;

            let mut contributions: Vec<Vec<Hit>> = vec![local];
            while let Some(joined) = join_set.join_next().await {
                match joined {
                    Ok(Ok(Ok(Some(response)))) => {
                        if !response.hits.is_empty() {
                            provenance.neighbor_contribution = true;
                            contributions.push(response.hits);
                        }
                    }
                    // Timeouts and neighbor errors are empty contributions
                    Ok(Err(_elapsed)) => {
                        warn!(trace = %trace.trace_id, "neighbor collaboration timed out");
                    }
                    Ok(Ok(Err(err))) => {
                        warn!(trace = %trace.trace_id, error = %err, "neighbor collaboration failed");
                    }
                    Ok(Ok(Ok(None))) => {}
                    Err(join_err) => {
                        warn!(trace = %trace.trace_id, error = %join_err, "collaboration task aborted");
                    }
                }
            }

            let mut hits = merge_hits(contributions);
            hits.truncate(agent.config.agent_hit_limit);
            Ok(AgentResponse { hits, provenance })
        })
    }
}

/// The set of live agents, one per domain in the active partition.
pub struct AgentRegistry {
    agents: DashMap<DomainId, Arc<DomainAgent>>,
    store: Arc<dyn GraphStore>,
    embedder: Arc<dyn Embedder>,
    config: LexGraphConfig,
    algorithm: AgentAlgorithm,
}

impl AgentRegistry {
    pub fn new(
        store: Arc<dyn GraphStore>,
        embedder: Arc<dyn Embedder>,
        config: LexGraphConfig,
    ) -> Self {
        Self {
            agents: DashMap::new(),
            store,
            embedder,
            config,
            algorithm: AgentAlgorithm::default(),
        }
    }

    /// Choose the in-scope retrieval algorithm agents run.
    pub fn with_algorithm(mut self, algorithm: AgentAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Rebuild the agent set from a partition snapshot. Called after
    /// assignment batches and rebalances.
    pub fn sync_with(&self, snapshot: &DomainMap) {
        let live: HashSet<DomainId> = snapshot.domains().map(|d| d.id.clone()).collect();
        self.agents.retain(|id, _| live.contains(id));

        for domain in snapshot.domains() {
            let mut neighbors: Vec<DomainId> = domain.neighbors.iter().cloned().collect();
            neighbors.sort();
            let agent = DomainAgent {
                domain_id: domain.id.clone(),
                node_ids: domain.node_ids.clone(),
                neighbors,
                store: Arc::clone(&self.store),
                embedder: Arc::clone(&self.embedder),
                config: self.config.clone(),
                algorithm: self.algorithm,
            };
            self.agents.insert(domain.id.clone(), Arc::new(agent));
        }
    }

    pub fn get(&self, id: &DomainId) -> Option<Arc<DomainAgent>> {
        self.agents.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn domain_ids(&self) -> Vec<DomainId> {
        let mut ids: Vec<DomainId> = self.agents.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Search one domain. `None` when no agent exists for the id — callers
    /// treat a stale neighbor as an empty contribution.
    pub async fn search(
        self: Arc<Self>,
        domain: &DomainId,
        query_text: &str,
        trace: SearchTrace,
    ) -> RetrievalResult<Option<AgentResponse>> {
        let Some(agent) = self.get(domain) else {
            return Ok(None);
        };
        let response = agent.search(self, query_text, trace).await?;
        Ok(Some(response))
    }
}
