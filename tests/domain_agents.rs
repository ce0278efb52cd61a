//! Domain agent and coordinator scenarios
//!
//! Partition for these tests: domain 1 holds the statute paragraph and the
//! decree's procedure paragraph, domain 2 holds the rule paragraph and the
//! decree's unrelated sibling, with a neighbor link between the two.

mod common;

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use common::*;
use lexgraph::{
    AgentRegistry, Document, Domain, DomainClusterer, DomainId, DomainMap, GraphStore,
    LexGraphConfig, NeighborEdge, NoopNamer, ParagraphInfo, QueryCoordinator, RelationMatch,
    RetrievalError, RouteMode, SearchTrace, SqliteStore, StoreResult, StoreStats, UnitId,
};

/// A query embedded identically to the rule paragraph, so the rule scores
/// 1.0 and everything else scores below the agent threshold.
const RULE_QUERY: &str = "용도변경 신청서 제출 서식";
/// A query orthogonal to every fixture paragraph.
const BLANK_QUERY: &str = "선박 등기 절차";

fn agent_vectors() -> HashMap<String, Vec<f32>> {
    let mut vectors = fixture_vectors();
    vectors.insert(RULE_QUERY.to_string(), vec_with_sim(0.72, 3));
    let mut blank = vec![0.0; DIM];
    blank[DIM - 1] = 1.0;
    vectors.insert(BLANK_QUERY.to_string(), blank);
    vectors
}

fn mean(vectors: &[Vec<f32>]) -> Vec<f32> {
    let mut out = vec![0.0; vectors[0].len()];
    for v in vectors {
        for (o, x) in out.iter_mut().zip(v.iter()) {
            *o += x;
        }
    }
    for o in out.iter_mut() {
        *o /= vectors.len() as f32;
    }
    out
}

/// The two-domain partition with a bidirectional neighbor link.
fn fixture_partition() -> (Domain, Domain) {
    let statute = vec_with_sim(0.80, 2);
    let decree_1 = vec_with_sim(0.88, 1);
    let rule = vec_with_sim(0.72, 3);
    let decree_2 = vec_with_sim(0.55, 4);

    let mut d1 = Domain::with_centroid(mean(&[statute, decree_1]));
    d1.node_ids = [UnitId::from(P_STATUTE), UnitId::from(P_DECREE_1)]
        .into_iter()
        .collect();
    let mut d2 = Domain::with_centroid(mean(&[rule, decree_2]));
    d2.node_ids = [UnitId::from(P_RULE), UnitId::from(P_DECREE_2)]
        .into_iter()
        .collect();

    d1.neighbors.insert(d2.id.clone());
    d2.neighbors.insert(d1.id.clone());
    (d1, d2)
}

fn config() -> LexGraphConfig {
    LexGraphConfig {
        node_embedding_dim: DIM,
        relation_embedding_dim: DIM,
        min_agent_size: 1,
        max_agent_size: 100,
        ..Default::default()
    }
}

async fn registry_with_partition(
    store: Arc<dyn GraphStore>,
) -> (Arc<AgentRegistry>, DomainId, DomainId) {
    let embedder = Arc::new(StaticEmbedder::new(DIM, agent_vectors()));
    let registry = Arc::new(AgentRegistry::new(store, embedder, config()));
    let (d1, d2) = fixture_partition();
    let (id1, id2) = (d1.id.clone(), d2.id.clone());
    registry.sync_with(&DomainMap::from_domains(vec![d1, d2]));
    (registry, id1, id2)
}

// === Scenario: good local quality means no neighbor is consulted ===

#[tokio::test]
async fn confident_agent_answers_from_its_own_scope() {
    let store = fixture_store().await;
    let (registry, d1, _) = registry_with_partition(store).await;

    let response = Arc::clone(&registry)
        .search(&d1, QUERY, SearchTrace::new())
        .await
        .unwrap()
        .unwrap();

    let ids: Vec<&str> = response.hits.iter().map(|h| h.paragraph_id.as_str()).collect();
    assert_eq!(ids, vec![P_DECREE_1, P_STATUTE]);
    // Mean relevance 0.84 and two hits: quality 0.7*0.84 + 0.3*0.4
    assert!((response.provenance.quality - 0.708).abs() < 1e-3);
    assert!(response.provenance.consulted.is_empty());
    assert!(!response.provenance.neighbor_contribution);
}

// === Scenario: poor local quality triggers neighbor collaboration ===

#[tokio::test]
async fn struggling_agent_consults_its_neighbor() {
    let store = fixture_store().await;
    let (registry, d1, d2) = registry_with_partition(store).await;

    let response = Arc::clone(&registry)
        .search(&d1, RULE_QUERY, SearchTrace::new())
        .await
        .unwrap()
        .unwrap();

    // Nothing in domain 1 clears the radius for this query
    assert!(response.provenance.quality < 0.6);
    assert_eq!(response.provenance.consulted, vec![d2]);
    assert!(response.provenance.neighbor_contribution);
    // The rule paragraph, found by the neighbor, tops the merged result
    assert_eq!(response.hits[0].paragraph_id.as_str(), P_RULE);
}

// === Scenario: visited agents answer locally, so collaboration terminates ===

#[tokio::test]
async fn mutual_neighbors_never_loop() {
    let store = fixture_store().await;
    let (registry, d1, d2) = registry_with_partition(store).await;

    // Nothing matches anywhere: both agents have quality 0 and would keep
    // consulting each other without the visited set
    let response = Arc::clone(&registry)
        .search(&d1, BLANK_QUERY, SearchTrace::new())
        .await
        .unwrap()
        .unwrap();

    assert!(response.hits.is_empty());
    assert_eq!(response.provenance.consulted, vec![d2]);
    assert!(!response.provenance.neighbor_contribution);
}

#[tokio::test]
async fn agent_already_on_the_trace_skips_collaboration() {
    let store = fixture_store().await;
    let (registry, d1, _) = registry_with_partition(store).await;

    let mut trace = SearchTrace::new();
    trace.visited.insert(d1.clone());

    let response = Arc::clone(&registry)
        .search(&d1, RULE_QUERY, trace)
        .await
        .unwrap()
        .unwrap();

    // Quality is poor, but the agent sees itself in the visited set
    assert!(response.provenance.consulted.is_empty());
    assert!(response.hits.is_empty());
}

// === Scenario: agents can run k-nearest instead of range expansion ===

#[tokio::test]
async fn nearest_algorithm_returns_scoped_hits_regardless_of_radius() {
    let store = fixture_store().await;
    let embedder = Arc::new(StaticEmbedder::new(DIM, agent_vectors()));
    let registry = Arc::new(
        AgentRegistry::new(store, embedder, config())
            .with_algorithm(lexgraph::AgentAlgorithm::Nearest),
    );
    let (d1, d2) = fixture_partition();
    let id2 = d2.id.clone();
    registry.sync_with(&DomainMap::from_domains(vec![d1, d2]));

    // Under range expansion this query finds nothing in domain 2; k-nearest
    // surfaces both scoped paragraphs, and their middling quality still
    // pulls in the neighbor's answer
    let response = Arc::clone(&registry)
        .search(&id2, QUERY, SearchTrace::new())
        .await
        .unwrap()
        .unwrap();

    let ids: Vec<&str> = response.hits.iter().map(|h| h.paragraph_id.as_str()).collect();
    assert_eq!(ids, vec![P_DECREE_1, P_STATUTE, P_RULE, P_DECREE_2]);
    assert!(response.provenance.neighbor_contribution);
}

// === Scenario: collaboration timeouts degrade to empty contributions ===

/// Store decorator that slows vector search down enough to trip the
/// collaboration timeout.
struct SlowStore {
    inner: Arc<SqliteStore>,
    delay: Duration,
}

#[async_trait]
impl GraphStore for SlowStore {
    async fn vector_search_paragraphs(
        &self,
        query: &[f32],
        top_k: usize,
        scope: Option<&HashSet<UnitId>>,
    ) -> StoreResult<Vec<(UnitId, f32)>> {
        tokio::time::sleep(self.delay).await;
        self.inner.vector_search_paragraphs(query, top_k, scope).await
    }

    async fn neighbors(&self, id: &UnitId) -> StoreResult<Vec<(UnitId, NeighborEdge)>> {
        self.inner.neighbors(id).await
    }

    async fn paragraph_info(&self, id: &UnitId) -> StoreResult<Option<ParagraphInfo>> {
        self.inner.paragraph_info(id).await
    }

    async fn vector_search_relations(
        &self,
        query: &[f32],
        top_k: usize,
    ) -> StoreResult<Vec<RelationMatch>> {
        self.inner.vector_search_relations(query, top_k).await
    }

    async fn upsert_domain(&self, domain: &Domain) -> StoreResult<()> {
        self.inner.upsert_domain(domain).await
    }

    async fn assign_paragraph_to_domain(
        &self,
        paragraph: &UnitId,
        domain: &DomainId,
        similarity: f32,
    ) -> StoreResult<()> {
        self.inner
            .assign_paragraph_to_domain(paragraph, domain, similarity)
            .await
    }

    async fn delete_domain(&self, domain: &DomainId) -> StoreResult<()> {
        self.inner.delete_domain(domain).await
    }

    async fn load_domains(&self) -> StoreResult<Vec<Domain>> {
        self.inner.load_domains().await
    }

    async fn insert_document(&self, document: &Document) -> StoreResult<()> {
        self.inner.insert_document(document).await
    }

    async fn link_implements(&self, implementing: &str, implemented: &str) -> StoreResult<()> {
        self.inner.link_implements(implementing, implemented).await
    }

    async fn set_paragraph_embedding(&self, id: &UnitId, embedding: &[f32]) -> StoreResult<()> {
        self.inner.set_paragraph_embedding(id, embedding).await
    }

    async fn set_relation_context(
        &self,
        parent: &UnitId,
        child: &UnitId,
        context_text: &str,
        embedding: &[f32],
    ) -> StoreResult<()> {
        self.inner
            .set_relation_context(parent, child, context_text, embedding)
            .await
    }

    async fn paragraph_embeddings(&self) -> StoreResult<Vec<(UnitId, Vec<f32>)>> {
        self.inner.paragraph_embeddings().await
    }

    async fn paragraph_laws(&self) -> StoreResult<HashMap<UnitId, String>> {
        self.inner.paragraph_laws().await
    }

    async fn linked_law_pairs(&self) -> StoreResult<Vec<(String, String)>> {
        self.inner.linked_law_pairs().await
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        self.inner.stats().await
    }
}

#[tokio::test]
async fn timed_out_neighbor_contributes_nothing() {
    let slow = Arc::new(SlowStore {
        inner: fixture_store().await,
        delay: Duration::from_millis(100),
    });
    let embedder = Arc::new(StaticEmbedder::new(DIM, agent_vectors()));
    let registry = Arc::new(AgentRegistry::new(
        slow,
        embedder,
        LexGraphConfig {
            collaboration_timeout_ms: 10,
            ..config()
        },
    ));
    let (d1, d2) = fixture_partition();
    let (id1, _id2) = (d1.id.clone(), d2.id.clone());
    registry.sync_with(&DomainMap::from_domains(vec![d1, d2]));

    let response = Arc::clone(&registry)
        .search(&id1, RULE_QUERY, SearchTrace::new())
        .await
        .unwrap()
        .unwrap();

    // The neighbor was consulted but could not answer in time; local hits
    // (none, for this query) are returned as-is
    assert_eq!(response.provenance.consulted.len(), 1);
    assert!(!response.provenance.neighbor_contribution);
    assert!(response.hits.is_empty());
}

// === Coordinator routing ===

async fn coordinator_with_partition(
    store: Arc<SqliteStore>,
    install: bool,
) -> (QueryCoordinator, DomainId, DomainId) {
    let embedder = Arc::new(StaticEmbedder::new(DIM, agent_vectors()));
    let clusterer = Arc::new(DomainClusterer::new(
        store.clone(),
        Arc::new(NoopNamer),
        config(),
    ));
    let registry = Arc::new(AgentRegistry::new(store.clone(), embedder.clone(), config()));
    let (d1, d2) = fixture_partition();
    let (id1, id2) = (d1.id.clone(), d2.id.clone());
    if install {
        let map = DomainMap::from_domains(vec![d1, d2]);
        registry.sync_with(&map);
        clusterer.install(map);
    }
    let coordinator = QueryCoordinator::new(store, clusterer, registry, embedder, config());
    (coordinator, id1, id2)
}

#[tokio::test]
async fn broadcast_merges_all_domains_by_max_relevance() {
    let store = fixture_store().await;
    let (coordinator, _, _) = coordinator_with_partition(store, true).await;

    let outcome = coordinator
        .search(QUERY, RouteMode::Broadcast, 10, None)
        .await
        .unwrap();

    assert!(!outcome.truncated);
    assert_eq!(outcome.routed_domains.len(), 2);
    let ids: Vec<&str> = outcome.hits.iter().map(|h| h.paragraph_id.as_str()).collect();
    assert_eq!(ids, vec![P_DECREE_1, P_STATUTE]);
}

#[tokio::test]
async fn centroid_route_selects_the_closest_domain() {
    let store = fixture_store().await;
    let (coordinator, d1, _) = coordinator_with_partition(store, true).await;

    let outcome = coordinator
        .search(QUERY, RouteMode::Centroid { top_r: 1 }, 10, None)
        .await
        .unwrap();

    assert_eq!(outcome.routed_domains, vec![d1]);
    let ids: Vec<&str> = outcome.hits.iter().map(|h| h.paragraph_id.as_str()).collect();
    assert_eq!(ids, vec![P_DECREE_1, P_STATUTE]);
}

#[tokio::test]
async fn zero_deadline_is_cancelled_up_front() {
    let store = fixture_store().await;
    let (coordinator, _, _) = coordinator_with_partition(store, true).await;

    let err = coordinator
        .search(QUERY, RouteMode::Broadcast, 10, Some(Duration::ZERO))
        .await
        .unwrap_err();
    assert!(matches!(err, RetrievalError::Cancelled { .. }));
}

#[tokio::test]
async fn empty_partition_falls_back_to_global_search() {
    let store = fixture_store().await;
    let (coordinator, _, _) = coordinator_with_partition(store, false).await;

    let outcome = coordinator
        .search(QUERY, RouteMode::Broadcast, 10, None)
        .await
        .unwrap();

    assert!(outcome.routed_domains.is_empty());
    let ids: Vec<&str> = outcome.hits.iter().map(|h| h.paragraph_id.as_str()).collect();
    assert_eq!(ids, vec![P_DECREE_1, P_STATUTE]);
}
