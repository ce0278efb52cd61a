//! Retrieval result structures

use serde::{Deserialize, Serialize};

use crate::graph::UnitId;

/// How a hit entered the result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HitSource {
    /// Chosen by the initial vector search
    Seed,
    /// Reached through graph expansion
    Expansion,
}

/// A ranked paragraph hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hit {
    /// Id of the paragraph
    pub paragraph_id: UnitId,
    /// Stable `<law>::<article>::<marker>` form
    pub full_id: String,
    /// Containing law
    pub law: String,
    /// Containing article
    pub article: String,
    /// Statutory text
    pub content: String,
    /// 1 − semantic cost; higher is closer to the query
    pub relevance: f32,
    /// Seed or expansion provenance
    pub source: HitSource,
}

/// A relation-contextualized hit from pure vector search over containment
/// contexts. No type-based filtering is ever applied to these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationHit {
    pub from_id: UnitId,
    pub to_id: UnitId,
    /// The bounded context string the relation was embedded from
    pub context_text: String,
    pub similarity: f32,
}

/// Merge hit lists, deduplicating by paragraph id and keeping the maximum
/// relevance per paragraph. The result is sorted by relevance descending,
/// ties broken by paragraph id.
pub fn merge_hits(lists: impl IntoIterator<Item = Vec<Hit>>) -> Vec<Hit> {
    let mut best: std::collections::HashMap<UnitId, Hit> = std::collections::HashMap::new();
    for hits in lists {
        for hit in hits {
            match best.get(&hit.paragraph_id) {
                Some(existing) if existing.relevance >= hit.relevance => {}
                _ => {
                    best.insert(hit.paragraph_id.clone(), hit);
                }
            }
        }
    }
    let mut merged: Vec<Hit> = best.into_values().collect();
    merged.sort_by(|a, b| {
        b.relevance
            .total_cmp(&a.relevance)
            .then_with(|| a.paragraph_id.cmp(&b.paragraph_id))
    });
    merged
}
