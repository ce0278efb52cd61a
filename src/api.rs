//! Transport-independent API layer.
//!
//! `LexGraphApi` is the single entry point for all consumer-facing
//! operations. Transports (CLI, RPC, direct embedding) call these methods
//! and never reach into the clusterer, coordinator, or orchestrator
//! directly. Construction validates configuration and provider dimensions;
//! a mismatch fails here, at startup, never per query.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::agent::{AgentAlgorithm, AgentRegistry};
use crate::cluster::{DomainClusterer, DomainMap, DomainNamer, RebalanceReport};
use crate::config::LexGraphConfig;
use crate::coordinator::{QueryCoordinator, RouteMode, SearchOutcome};
use crate::embedding::EmbeddingProviders;
use crate::error::RetrievalResult;
use crate::graph::{Document, DomainPhase};
use crate::ingest::{IngestReport, IngestionOrchestrator};
use crate::retrieve::{Hit, NearestQuery, RangeQuery, RelationHit, RelationQuery};
use crate::store::GraphStore;

/// Parameters of a direct (unrouted) search.
#[derive(Debug, Clone)]
pub enum SearchRequest {
    /// Threshold-bounded range expansion
    Rne {
        threshold: Option<f32>,
        initial_k: Option<usize>,
        max_results: Option<usize>,
    },
    /// k-nearest incremental expansion
    Ine { k: usize, initial_k: Option<usize> },
}

/// Aggregate engine statistics.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub store: crate::store::StoreStats,
    pub domains: usize,
    pub nascent_domains: usize,
    pub stable_domains: usize,
    pub oversized_domains: usize,
}

/// Single entry point for all consumer-facing operations.
#[derive(Clone)]
pub struct LexGraphApi {
    config: LexGraphConfig,
    store: Arc<dyn GraphStore>,
    providers: EmbeddingProviders,
    clusterer: Arc<DomainClusterer>,
    registry: Arc<AgentRegistry>,
    coordinator: Arc<QueryCoordinator>,
    orchestrator: Arc<IngestionOrchestrator>,
}

impl LexGraphApi {
    /// Wire the engine together. Fails with `ConfigInvalid` on bad
    /// configuration or provider dimension mismatch.
    ///
    /// When the store already carries a mirrored partition from a previous
    /// process, it is re-hydrated here, so routing state survives restarts.
    pub async fn new(
        config: LexGraphConfig,
        store: Arc<dyn GraphStore>,
        providers: EmbeddingProviders,
        namer: Arc<dyn DomainNamer>,
    ) -> RetrievalResult<Self> {
        Self::with_algorithm(config, store, providers, namer, AgentAlgorithm::default()).await
    }

    /// Like [`LexGraphApi::new`], choosing the in-scope algorithm agents run.
    pub async fn with_algorithm(
        config: LexGraphConfig,
        store: Arc<dyn GraphStore>,
        providers: EmbeddingProviders,
        namer: Arc<dyn DomainNamer>,
        algorithm: AgentAlgorithm,
    ) -> RetrievalResult<Self> {
        config.validate()?;
        providers.validate(&config)?;

        let clusterer = Arc::new(DomainClusterer::new(
            Arc::clone(&store),
            namer,
            config.clone(),
        ));
        let registry = Arc::new(
            AgentRegistry::new(
                Arc::clone(&store),
                Arc::clone(&providers.node),
                config.clone(),
            )
            .with_algorithm(algorithm),
        );
        let coordinator = Arc::new(QueryCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&clusterer),
            Arc::clone(&registry),
            Arc::clone(&providers.node),
            config.clone(),
        ));
        let orchestrator = Arc::new(IngestionOrchestrator::new(
            Arc::clone(&store),
            providers.clone(),
            Arc::clone(&clusterer),
            config.clone(),
        ));

        let api = Self {
            config,
            store,
            providers,
            clusterer,
            registry,
            coordinator,
            orchestrator,
        };

        // Re-hydrate the partition a previous process mirrored into the
        // store; without this a restart would re-cluster over it and orphan
        // the persisted domain rows
        let mirrored = api.store.load_domains().await?;
        if !mirrored.is_empty() {
            api.clusterer.install(DomainMap::from_domains(mirrored));
            api.registry.sync_with(&api.clusterer.snapshot());
        }

        Ok(api)
    }

    // --- Write ---

    /// The single write endpoint: ingest one parsed document and refresh the
    /// agent set to the resulting partition.
    pub async fn ingest(&self, document: Document) -> RetrievalResult<IngestReport> {
        let report = self.orchestrator.process_new_document(document).await?;
        self.registry.sync_with(&self.clusterer.snapshot());
        Ok(report)
    }

    // --- Reads ---

    /// Direct (unrouted) search over the whole corpus.
    pub async fn search(
        &self,
        query_text: &str,
        request: SearchRequest,
    ) -> RetrievalResult<Vec<Hit>> {
        match request {
            SearchRequest::Rne {
                threshold,
                initial_k,
                max_results,
            } => {
                let mut query =
                    RangeQuery::new(threshold.unwrap_or(self.config.rne_default_threshold))
                        .with_initial_k(initial_k.unwrap_or(self.config.rne_initial_k));
                if let Some(max) = max_results {
                    query = query.with_max_results(max);
                }
                query
                    .execute(
                        self.store.as_ref(),
                        self.providers.node.as_ref(),
                        query_text,
                    )
                    .await
            }
            SearchRequest::Ine { k, initial_k } => {
                let mut query = NearestQuery::new(k);
                if let Some(seed_breadth) = initial_k {
                    query = query.with_initial_k(seed_breadth);
                }
                query
                    .execute(
                        self.store.as_ref(),
                        self.providers.node.as_ref(),
                        query_text,
                    )
                    .await
            }
        }
    }

    /// Domain-routed search: run agents in parallel and merge.
    pub async fn search_routed(
        &self,
        query_text: &str,
        mode: RouteMode,
        limit: usize,
        deadline: Option<Duration>,
    ) -> RetrievalResult<SearchOutcome> {
        self.coordinator
            .search(query_text, mode, limit, deadline)
            .await
    }

    /// Pure vector search over relation contexts.
    pub async fn search_relations(
        &self,
        query_text: &str,
        top_k: usize,
    ) -> RetrievalResult<Vec<RelationHit>> {
        RelationQuery::new(top_k)
            .execute(
                self.store.as_ref(),
                self.providers.relation.as_ref(),
                query_text,
            )
            .await
    }

    // --- Administrative ---

    /// Bulk-initialize the partition when none exists yet.
    pub async fn bootstrap(&self) -> RetrievalResult<usize> {
        let domains = self.clusterer.bootstrap().await?;
        self.registry.sync_with(&self.clusterer.snapshot());
        Ok(domains)
    }

    /// Split/merge/relink the partition and refresh the agent set.
    pub async fn rebalance(&self) -> RetrievalResult<RebalanceReport> {
        let report = self.clusterer.rebalance_all_domains().await?;
        self.registry.sync_with(&self.clusterer.snapshot());
        Ok(report)
    }

    /// Aggregate statistics over the store and the partition.
    pub async fn stats(&self) -> RetrievalResult<EngineStats> {
        let store = self.store.stats().await?;
        let snapshot = self.clusterer.snapshot();
        let phase = |p: DomainPhase| {
            snapshot
                .domains()
                .filter(|d| {
                    d.phase(self.config.min_agent_size, self.config.max_agent_size) == p
                })
                .count()
        };
        Ok(EngineStats {
            store,
            domains: snapshot.len(),
            nascent_domains: phase(DomainPhase::Nascent),
            stable_domains: phase(DomainPhase::Stable),
            oversized_domains: phase(DomainPhase::Oversized),
        })
    }

    /// The live partition owner, for observability.
    pub fn clusterer(&self) -> &Arc<DomainClusterer> {
        &self.clusterer
    }
}
