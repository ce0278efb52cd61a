//! Graph store contract
//!
//! The minimum surface the retrieval core needs from the underlying graph
//! store. Implementations are the only place aware of the store's query
//! language. All operations are reads except the domain mirror and the
//! ingestion writes; reads never fail on unknown ids — they return empty.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

use crate::graph::{Document, Domain, DomainId, NeighborEdge, ParagraphInfo, RelationMatch, UnitId};

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The store is temporarily unreachable; retried at the adapter boundary
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Persisted data that cannot be decoded
    #[error("corrupt store data: {0}")]
    Corrupt(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Aggregate counts reported by `GraphStore::stats`.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct StoreStats {
    pub laws: usize,
    pub units: usize,
    pub paragraphs: usize,
    pub embedded_paragraphs: usize,
    pub relation_contexts: usize,
    pub domains: usize,
}

/// Read/write contract against the knowledge graph.
///
/// Implementations must be thread-safe (Send + Sync); every call may cross a
/// process boundary and therefore suspend.
#[async_trait]
pub trait GraphStore: Send + Sync {
    // === Retrieval reads ===

    /// Top-k embedded units by cosine similarity to `query`, descending.
    ///
    /// `scope` restricts the candidates to the given unit ids; an empty scope
    /// yields an empty result. Ties break on unit id for determinism.
    async fn vector_search_paragraphs(
        &self,
        query: &[f32],
        top_k: usize,
        scope: Option<&HashSet<UnitId>>,
    ) -> StoreResult<Vec<(UnitId, f32)>>;

    /// Paragraph-level adjacency of one embedded unit.
    ///
    /// Cross-law entries are derived lazily from the `IMPLEMENTS` chain
    /// (length <= 2, walked in both directions) and are never materialized.
    /// Unknown or inert ids yield an empty list.
    async fn neighbors(&self, id: &UnitId) -> StoreResult<Vec<(UnitId, NeighborEdge)>>;

    /// Resolve a unit id to its paragraph record, or `None` if absent.
    async fn paragraph_info(&self, id: &UnitId) -> StoreResult<Option<ParagraphInfo>>;

    /// Top-k relation contexts by cosine similarity to `query`, descending.
    async fn vector_search_relations(
        &self,
        query: &[f32],
        top_k: usize,
    ) -> StoreResult<Vec<RelationMatch>>;

    // === Domain mirror (idempotent writes) ===

    /// Create or replace a domain record, including its neighbor set.
    async fn upsert_domain(&self, domain: &Domain) -> StoreResult<()>;

    /// Record a paragraph's membership with its assignment-time similarity.
    async fn assign_paragraph_to_domain(
        &self,
        paragraph: &UnitId,
        domain: &DomainId,
        similarity: f32,
    ) -> StoreResult<()>;

    /// Delete a domain and its membership/neighbor records.
    async fn delete_domain(&self, domain: &DomainId) -> StoreResult<()>;

    /// Load every mirrored domain with its members and neighbors, so a new
    /// process can re-hydrate the partition a previous one persisted.
    async fn load_domains(&self) -> StoreResult<Vec<Domain>>;

    // === Ingestion writes (idempotent) ===

    /// Persist a document's units and structural edges.
    async fn insert_document(&self, document: &Document) -> StoreResult<()>;

    /// Record that `implementing` implements `implemented` (law -> law).
    async fn link_implements(&self, implementing: &str, implemented: &str) -> StoreResult<()>;

    /// Attach a node embedding to a unit.
    async fn set_paragraph_embedding(&self, id: &UnitId, embedding: &[f32]) -> StoreResult<()>;

    /// Attach a context string and its embedding to a containment edge.
    async fn set_relation_context(
        &self,
        parent: &UnitId,
        child: &UnitId,
        context_text: &str,
        embedding: &[f32],
    ) -> StoreResult<()>;

    // === Clusterer reads ===

    /// All embedded units with their embeddings.
    async fn paragraph_embeddings(&self) -> StoreResult<Vec<(UnitId, Vec<f32>)>>;

    /// Containing law per embedded unit.
    async fn paragraph_laws(&self) -> StoreResult<HashMap<UnitId, String>>;

    /// Distinct undirected law pairs connected by `IMPLEMENTS` chains of
    /// length <= 2.
    async fn linked_law_pairs(&self) -> StoreResult<Vec<(String, String)>>;

    /// Aggregate counts for observability.
    async fn stats(&self) -> StoreResult<StoreStats>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: GraphStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StoreResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StoreResult<Self>;
}
