//! LexGraph: hybrid graph/vector retrieval over hierarchical statutes
//!
//! Answers natural-language queries over a corpus of Korean statutory
//! documents (a statute, its enforcement decree, its enforcement rule) by
//! combining dense vector retrieval with graph-aware expansion that follows
//! legal cross-references.
//!
//! # Core Concepts
//!
//! - **Paragraphs**: the atomic retrievable units, vector-embedded
//! - **Cross-law links**: derived edges between paragraphs whose laws are
//!   connected through the `IMPLEMENTS` chain; free to traverse
//! - **Domains**: self-organizing clusters of paragraphs, each served by a
//!   retrieval agent that can consult its neighbors
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use lexgraph::{LexGraphApi, LexGraphConfig, NoopNamer, OpenStore, SqliteStore};
//!
//! # fn providers() -> lexgraph::EmbeddingProviders { unimplemented!() }
//! # #[tokio::main]
//! # async fn main() -> Result<(), lexgraph::RetrievalError> {
//! let store = Arc::new(SqliteStore::open_in_memory()?);
//! let api = LexGraphApi::new(
//!     LexGraphConfig::default(),
//!     store,
//!     providers(),
//!     Arc::new(NoopNamer),
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod api;
pub mod cluster;
pub mod config;
pub mod coordinator;
pub mod embedding;
pub mod error;
mod graph;
pub mod ingest;
pub mod retrieve;
pub mod store;

pub use agent::{quality_score, AgentAlgorithm, AgentRegistry, AgentResponse, SearchTrace};
pub use api::{EngineStats, LexGraphApi, SearchRequest};
pub use cluster::{
    AssignmentReport, DomainClusterer, DomainMap, DomainNamer, NamingError, NoopNamer,
    RebalanceReport,
};
pub use config::LexGraphConfig;
pub use coordinator::{QueryCoordinator, RouteMode, SearchOutcome};
pub use embedding::{
    cosine_similarity, normalize, Embedder, EmbeddingError, EmbeddingProviders,
};
#[cfg(feature = "embeddings")]
pub use embedding::FastEmbedEmbedder;
pub use error::{RetrievalError, RetrievalResult};
pub use graph::{
    Document, Domain, DomainId, DomainPhase, NeighborEdge, NeighborKind, NodeKind, ParagraphInfo,
    RelationMatch, Unit, UnitId,
};
pub use ingest::{IngestReport, IngestionOrchestrator};
pub use retrieve::{merge_hits, Hit, HitSource, NearestQuery, RangeQuery, RelationHit, RelationQuery};
pub use store::{GraphStore, OpenStore, RetryingStore, SqliteStore, StoreError, StoreResult, StoreStats};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
