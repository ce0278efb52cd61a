//! Ingestion orchestration
//!
//! On new-document arrival: validate the parsed units, persist structure,
//! generate node and relation embeddings, assign paragraphs to domains, and
//! trigger a rebalance when the partition drifted out of bounds. Ingestion
//! is serialized through a single owner and is not latency-critical; it may
//! be batched and run offline.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

use crate::cluster::DomainClusterer;
use crate::config::LexGraphConfig;
use crate::embedding::{normalize, EmbeddingProviders};
use crate::error::{RetrievalError, RetrievalResult};
use crate::graph::{Document, NodeKind, Unit, UnitId};
use crate::store::GraphStore;

/// Characters taken from each side of a containment edge when building the
/// relation-context string.
const CONTEXT_SPAN: usize = 100;

/// What one document ingestion did.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub law_name: String,
    pub units_stored: usize,
    pub paragraphs_embedded: usize,
    pub relations_embedded: usize,
    pub new_domains: usize,
    pub rebalanced: bool,
}

/// Serializes document ingestion and drives the persist/embed/assign steps.
pub struct IngestionOrchestrator {
    store: Arc<dyn GraphStore>,
    providers: EmbeddingProviders,
    clusterer: Arc<DomainClusterer>,
    config: LexGraphConfig,
    /// Single ingestion owner; concurrent documents queue here
    owner: tokio::sync::Mutex<()>,
}

impl IngestionOrchestrator {
    pub fn new(
        store: Arc<dyn GraphStore>,
        providers: EmbeddingProviders,
        clusterer: Arc<DomainClusterer>,
        config: LexGraphConfig,
    ) -> Self {
        Self {
            store,
            providers,
            clusterer,
            config,
            owner: tokio::sync::Mutex::new(()),
        }
    }

    /// Ingest one parsed document end to end.
    ///
    /// Validation failures reject the document before anything is persisted.
    /// The whole pipeline is idempotent: re-ingesting a document leaves the
    /// store and the domain partition unchanged.
    pub async fn process_new_document(&self, document: Document) -> RetrievalResult<IngestReport> {
        let _owner = self.owner.lock().await;
        validate_document(&document)?;

        let mut report = IngestReport {
            law_name: document.law_name.clone(),
            units_stored: document.units.len(),
            ..Default::default()
        };

        // 1. Structure first, so embeddings always attach to existing rows
        self.store.insert_document(&document).await?;
        if let Some(implemented) = implemented_law(&document.law_name) {
            self.store
                .link_implements(&document.law_name, &implemented)
                .await?;
        }

        // 2. Node embeddings for every paragraph
        let paragraphs: Vec<&Unit> = document
            .units
            .iter()
            .filter(|u| u.kind == NodeKind::Paragraph)
            .collect();
        if !paragraphs.is_empty() {
            let texts: Vec<&str> = paragraphs
                .iter()
                .map(|u| u.content.as_deref().unwrap_or_default())
                .collect();
            let vectors = self.providers.node.embed_batch(&texts).await?;
            for (unit, mut vector) in paragraphs.iter().zip(vectors.into_iter()) {
                normalize(&mut vector);
                self.store
                    .set_paragraph_embedding(&unit.full_id, &vector)
                    .await?;
                report.paragraphs_embedded += 1;
            }
        }

        // 3. Relation contexts for every containment edge
        let by_id: HashMap<&UnitId, &Unit> = document
            .units
            .iter()
            .map(|u| (&u.full_id, u))
            .collect();
        let mut edges: Vec<(&Unit, &Unit)> = Vec::new();
        for unit in &document.units {
            if let Some(ref parent_id) = unit.parent_full_id {
                match by_id.get(parent_id) {
                    Some(parent) => edges.push((parent, unit)),
                    None => {
                        // Validation guarantees in-document parents; belt for
                        // documents persisted by older writers
                        warn!(target: "lexgraph::data_integrity", unit = %unit.full_id, "containment parent missing, edge skipped");
                    }
                }
            }
        }
        if !edges.is_empty() {
            let contexts: Vec<String> = edges
                .iter()
                .map(|(parent, child)| relation_context(parent, child))
                .collect();
            let texts: Vec<&str> = contexts.iter().map(String::as_str).collect();
            let vectors = self.providers.relation.embed_batch(&texts).await?;
            for ((&(parent, child), context), mut vector) in
                edges.iter().zip(contexts.iter()).zip(vectors.into_iter())
            {
                normalize(&mut vector);
                self.store
                    .set_relation_context(&parent.full_id, &child.full_id, context, &vector)
                    .await?;
                report.relations_embedded += 1;
            }
        }

        // 4. Domain assignment; bulk-initialize when the corpus already
        //    carries many paragraphs but no partition exists yet
        let embedded = self.store.paragraph_embeddings().await?;
        if self.clusterer.snapshot().is_empty() && embedded.len() >= self.config.min_agent_size {
            self.clusterer.bootstrap().await?;
        }
        let assignment = self.clusterer.assign_batch(embedded).await?;
        report.new_domains = assignment.new_domains;

        // 5. Rebalance on batch completion, not per paragraph
        if self.clusterer.needs_rebalance() {
            self.clusterer.rebalance_all_domains().await?;
            report.rebalanced = true;
        }

        info!(
            law = %report.law_name,
            units = report.units_stored,
            embedded = report.paragraphs_embedded,
            relations = report.relations_embedded,
            rebalanced = report.rebalanced,
            "document ingested"
        );
        Ok(report)
    }
}

/// Infer the implemented law from Korean statutory naming: an enforcement
/// rule (시행규칙) implements the enforcement decree, an enforcement decree
/// (시행령) implements the statute.
pub(crate) fn implemented_law(law_name: &str) -> Option<String> {
    let trimmed = law_name.trim();
    if let Some(base) = trimmed.strip_suffix("시행규칙") {
        return Some(format!("{}시행령", base));
    }
    if let Some(base) = trimmed.strip_suffix("시행령") {
        let base = base.trim_end();
        (!base.is_empty()).then(|| base.to_string())
    } else {
        None
    }
}

fn reject(unit: &Unit, reason: impl Into<String>) -> RetrievalError {
    RetrievalError::IngestionRejected {
        unit: unit.full_id.as_str().to_string(),
        reason: reason.into(),
    }
}

/// Structural validation of a parsed document. Nothing is persisted when
/// this fails.
fn validate_document(document: &Document) -> RetrievalResult<()> {
    if document.law_name.trim().is_empty() {
        return Err(RetrievalError::IngestionRejected {
            unit: String::new(),
            reason: "document has an empty law_name".into(),
        });
    }

    let mut seen: HashSet<&UnitId> = HashSet::new();
    for unit in &document.units {
        if unit.full_id.as_str().trim().is_empty() {
            return Err(reject(unit, "unit has an empty full_id"));
        }
        if !seen.insert(&unit.full_id) {
            return Err(reject(unit, "duplicate full_id within the document"));
        }
        match unit.kind {
            NodeKind::Paragraph => {
                if unit.content.as_deref().map_or(true, |c| c.trim().is_empty()) {
                    return Err(reject(unit, "paragraph without content"));
                }
            }
            _ => {
                if unit.content.is_some() {
                    return Err(reject(unit, "content on a non-paragraph unit"));
                }
            }
        }
    }

    // Parents must be in-document; containment must stay a tree
    let ids: HashSet<&UnitId> = document.units.iter().map(|u| &u.full_id).collect();
    let parent_of: HashMap<&UnitId, &UnitId> = document
        .units
        .iter()
        .filter_map(|u| u.parent_full_id.as_ref().map(|p| (&u.full_id, p)))
        .collect();
    for unit in &document.units {
        if let Some(ref parent) = unit.parent_full_id {
            if !ids.contains(parent) {
                return Err(reject(unit, "parent_full_id not present in the document"));
            }
        }
        let mut cursor = &unit.full_id;
        let mut walked: HashSet<&UnitId> = HashSet::new();
        while let Some(parent) = parent_of.get(cursor) {
            if !walked.insert(cursor) {
                return Err(reject(unit, "containment cycle"));
            }
            cursor = parent;
        }
    }

    Ok(())
}

/// Bounded context string for a containment edge: the parent's tail, a
/// connector, the child's head. A side without text falls back to the
/// unit's title, then its id.
pub(crate) fn relation_context(parent: &Unit, child: &Unit) -> String {
    let parent_side: String = match parent.content.as_deref() {
        Some(content) => {
            let chars: Vec<char> = content.chars().collect();
            let start = chars.len().saturating_sub(CONTEXT_SPAN);
            chars[start..].iter().collect()
        }
        None => parent
            .title
            .clone()
            .unwrap_or_else(|| parent.full_id.as_str().to_string()),
    };
    let child_side: String = match child.content.as_deref() {
        Some(content) => content.chars().take(CONTEXT_SPAN).collect(),
        None => child
            .title
            .clone()
            .unwrap_or_else(|| child.full_id.as_str().to_string()),
    };
    format!("{} → {}", parent_side, child_side)
}
