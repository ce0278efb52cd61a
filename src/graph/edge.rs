//! Edge metadata surfaced by the store adapter
//!
//! The store persists structural edges (`CONTAINS`, `NEXT`, `IMPLEMENTS`) and
//! cluster edges (`BELONGS_TO_DOMAIN`, `NEIGHBOR_DOMAIN`). Retrieval never
//! sees those directly; it sees paragraph-level adjacency through
//! `GraphStore::neighbors`, where cross-law links are derived lazily from the
//! `IMPLEMENTS` chain and never materialized.

use serde::{Deserialize, Serialize};

use super::unit::UnitId;

/// Kind of a paragraph-level adjacency entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborKind {
    /// Containing retrievable unit
    Parent,
    /// Retrievable unit under the same containing article
    Sibling,
    /// Contained retrievable unit
    Child,
    /// Paragraph of a law linked through the `IMPLEMENTS` chain
    CrossLaw,
}

/// One adjacency entry returned by `GraphStore::neighbors`.
///
/// Sibling and cross-law entries carry the neighbor's node embedding so the
/// expansion can price the hop without a second store round-trip.
#[derive(Debug, Clone)]
pub struct NeighborEdge {
    pub kind: NeighborKind,
    pub embedding: Option<Vec<f32>>,
}

impl NeighborEdge {
    pub fn structural(kind: NeighborKind) -> Self {
        Self {
            kind,
            embedding: None,
        }
    }

    pub fn embedded(kind: NeighborKind, embedding: Vec<f32>) -> Self {
        Self {
            kind,
            embedding: Some(embedding),
        }
    }
}

/// A relation-context match returned by `GraphStore::vector_search_relations`.
#[derive(Debug, Clone)]
pub struct RelationMatch {
    /// Source unit of the containment edge
    pub from_id: UnitId,
    /// Target unit of the containment edge
    pub to_id: UnitId,
    /// The bounded context string the relation embedding was computed from
    pub context_text: String,
    /// Cosine similarity to the query vector
    pub similarity: f32,
}
