//! Priority-queue graph expansion
//!
//! Single-source Dijkstra variant over semantic cost: a `dist` map closes
//! visited paragraphs and a min-heap orders frontiers. Structural and
//! cross-law edges are free; sibling hops are charged the neighbor's full
//! similarity cost, because sibling paragraphs within one article are
//! sometimes unrelated. A free edge never lifts a paragraph above its own
//! query similarity — cross-law hops clamp to `1 − cos(q, neighbor)`.
//!
//! The same paragraph can be reached by structural and cross-law paths, so
//! finalization deduplicates by paragraph id.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use tracing::{debug, warn};

use super::types::{Hit, HitSource};
use crate::embedding::cosine_similarity;
use crate::graph::{NeighborKind, UnitId};
use crate::store::{GraphStore, StoreResult};

/// When the expansion loop stops finalizing.
#[derive(Debug, Clone, Copy)]
pub(crate) enum StopRule {
    /// Stop at the first frontier whose relevance falls below the threshold;
    /// optionally cap the number of finalized paragraphs.
    Threshold {
        threshold: f32,
        max_results: Option<usize>,
    },
    /// Stop once `k` paragraphs are finalized, regardless of relevance.
    Count { k: usize },
}

/// A finalized paragraph with its semantic cost.
#[derive(Debug, Clone)]
pub(crate) struct Finalized {
    pub id: UnitId,
    pub cost: f32,
    pub source: HitSource,
}

/// Frontier entry; equal costs order by paragraph id for determinism.
#[derive(Debug, Clone, PartialEq)]
struct Frontier {
    cost: f32,
    id: UnitId,
}

impl Eq for Frontier {}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost
            .total_cmp(&other.cost)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Run the expansion from vector-search seeds.
///
/// The loop suspends only on store calls; everything between pops is
/// synchronous. Results come back in finalization (ascending cost) order.
pub(crate) async fn expand(
    store: &dyn GraphStore,
    query: &[f32],
    initial_k: usize,
    scope: Option<&HashSet<UnitId>>,
    stop: StopRule,
) -> StoreResult<Vec<Finalized>> {
    let threshold = match stop {
        StopRule::Threshold { threshold, .. } => Some(threshold),
        StopRule::Count { .. } => None,
    };
    let limit = match stop {
        StopRule::Threshold { max_results, .. } => max_results,
        StopRule::Count { k } => Some(k),
    };

    let mut dist: HashMap<UnitId, f32> = HashMap::new();
    let mut heap: BinaryHeap<std::cmp::Reverse<Frontier>> = BinaryHeap::new();
    let mut seeds: HashSet<UnitId> = HashSet::new();

    // Seed: duplicate ids from the store keep their best cost via `dist`.
    for (id, sim) in store
        .vector_search_paragraphs(query, initial_k, scope)
        .await?
    {
        let cost = 1.0 - sim;
        if dist.get(&id).map_or(true, |&d| cost < d) {
            dist.insert(id.clone(), cost);
            seeds.insert(id.clone());
            heap.push(std::cmp::Reverse(Frontier { cost, id }));
        }
    }
    debug!(seeds = seeds.len(), "expansion seeded");

    let mut closed: HashSet<UnitId> = HashSet::new();
    let mut finalized: Vec<Finalized> = Vec::new();

    while let Some(std::cmp::Reverse(Frontier { cost: d, id: u })) = heap.pop() {
        if closed.contains(&u) {
            continue;
        }
        // Stale entry superseded by a cheaper path
        if dist.get(&u).is_some_and(|&best| d > best) {
            continue;
        }
        if let Some(t) = threshold {
            // Minimum-cost frontier is below the radius: so is everything left
            if 1.0 - d < t {
                break;
            }
        }

        closed.insert(u.clone());
        finalized.push(Finalized {
            id: u.clone(),
            cost: d,
            source: if seeds.contains(&u) {
                HitSource::Seed
            } else {
                HitSource::Expansion
            },
        });
        if limit.is_some_and(|max| finalized.len() >= max) {
            break;
        }

        for (v, edge) in store.neighbors(&u).await? {
            if closed.contains(&v) {
                continue;
            }
            if scope.is_some_and(|s| !s.contains(&v)) {
                continue;
            }
            let alt = match edge.kind {
                NeighborKind::Parent | NeighborKind::Child => d,
                NeighborKind::CrossLaw => {
                    let Some(sim) = edge
                        .embedding
                        .as_deref()
                        .and_then(|e| cosine_similarity(query, e))
                    else {
                        // Degenerate or missing vector: the edge is skipped
                        continue;
                    };
                    d.max(1.0 - sim)
                }
                NeighborKind::Sibling => {
                    let Some(sim) = edge
                        .embedding
                        .as_deref()
                        .and_then(|e| cosine_similarity(query, e))
                    else {
                        continue;
                    };
                    d + (1.0 - sim)
                }
            };
            if dist.get(&v).map_or(true, |&best| alt < best)
                && threshold.map_or(true, |t| 1.0 - alt >= t)
            {
                dist.insert(v.clone(), alt);
                heap.push(std::cmp::Reverse(Frontier { cost: alt, id: v }));
            }
        }
    }

    debug!(finalized = finalized.len(), "expansion complete");
    Ok(finalized)
}

/// Resolve finalized ids into hit records, preserving order.
///
/// A finalized id with no paragraph record is inconsistent graph state:
/// logged and skipped, never fatal.
pub(crate) async fn materialize(
    store: &dyn GraphStore,
    finalized: Vec<Finalized>,
) -> StoreResult<Vec<Hit>> {
    let mut hits = Vec::with_capacity(finalized.len());
    for f in finalized {
        let Some(info) = store.paragraph_info(&f.id).await? else {
            warn!(target: "lexgraph::data_integrity", id = %f.id, "finalized paragraph has no record, skipping");
            continue;
        };
        hits.push(Hit {
            paragraph_id: f.id,
            full_id: info.full_id.as_str().to_string(),
            law: info.law,
            article: info.article,
            content: info.content,
            relevance: 1.0 - f.cost,
            source: f.source,
        });
    }
    Ok(hits)
}
