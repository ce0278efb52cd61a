//! Shared fixtures for the integration suites
//!
//! Builds the three-tier reference corpus — a statute, its enforcement
//! decree, its enforcement rule — with embeddings engineered so the
//! reference query has known similarities to each paragraph, and provides a
//! deterministic mock embedder in place of a real model.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use lexgraph::{
    Document, Embedder, EmbeddingError, EmbeddingProviders, GraphStore, NodeKind, OpenStore,
    SqliteStore, Unit, UnitId,
};

/// Embedding dimension used across the fixtures.
pub const DIM: usize = 8;

/// The reference query: most similar to the decree paragraph, then the
/// statute, then the rule, then the decree's unrelated sibling.
pub const QUERY: &str = "건축물 용도변경 절차";

pub const STATUTE: &str = "건축법";
pub const DECREE: &str = "건축법 시행령";
pub const RULE: &str = "건축법 시행규칙";

pub const P_STATUTE: &str = "건축법::제12조::①";
pub const P_DECREE_1: &str = "건축법 시행령::제15조::①";
pub const P_DECREE_2: &str = "건축법 시행령::제15조::②";
pub const P_RULE: &str = "건축법 시행규칙::제8조::①";

const C_STATUTE: &str = "건축물의 용도를 변경하려는 자는 허가권자의 허가를 받거나 신고하여야 한다.";
const C_DECREE_1: &str = "법 제12조에 따른 용도변경의 절차는 다음 각 호와 같다.";
const C_DECREE_2: &str = "제1항에 따른 시설군의 분류는 별표 1과 같다.";
const C_RULE: &str = "영 제15조에 따라 용도변경 신청서를 제출하여야 한다.";

/// A unit vector whose cosine similarity to the query axis is exactly `sim`,
/// with the remainder on a distinct axis so fixture paragraphs stay mutually
/// dissimilar.
pub fn vec_with_sim(sim: f32, axis: usize) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    v[0] = sim;
    v[axis.clamp(1, DIM - 1)] = (1.0 - sim * sim).sqrt();
    v
}

/// Deterministic mock embedder: known texts come from a table, anything else
/// gets a stable pseudo-vector derived from its bytes.
pub struct StaticEmbedder {
    dimension: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl StaticEmbedder {
    pub fn new(dimension: usize, vectors: HashMap<String, Vec<f32>>) -> Self {
        Self { dimension, vectors }
    }

    fn derive(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimension];
        let mut acc: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in text.bytes() {
            acc ^= byte as u64;
            acc = acc.wrapping_mul(0x1000_0000_01b3);
        }
        for slot in v.iter_mut() {
            acc ^= acc >> 33;
            acc = acc.wrapping_mul(0xff51_afd7_ed55_8ccd);
            *slot = ((acc % 1000) as f32 / 1000.0) - 0.5;
        }
        v
    }
}

#[async_trait]
impl Embedder for StaticEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|t| self.vectors.get(*t).cloned().unwrap_or_else(|| self.derive(t)))
            .collect())
    }
}

/// The fixture vector table: query on the first axis, paragraphs at their
/// reference similarities.
pub fn fixture_vectors() -> HashMap<String, Vec<f32>> {
    let mut q = vec![0.0; DIM];
    q[0] = 1.0;
    let mut m = HashMap::new();
    m.insert(QUERY.to_string(), q);
    m.insert(C_DECREE_1.to_string(), vec_with_sim(0.88, 1));
    m.insert(C_STATUTE.to_string(), vec_with_sim(0.80, 2));
    m.insert(C_RULE.to_string(), vec_with_sim(0.72, 3));
    m.insert(C_DECREE_2.to_string(), vec_with_sim(0.55, 4));
    m
}

/// Embedder pair for the fixture corpus (same table for both roles).
pub fn fixture_providers() -> EmbeddingProviders {
    let embedder = Arc::new(StaticEmbedder::new(DIM, fixture_vectors()));
    EmbeddingProviders::new(embedder.clone(), embedder)
}

fn law_unit(law: &str) -> Unit {
    Unit::new(NodeKind::Law, law).with_title(law)
}

fn article_unit(law: &str, article: &str, title: &str) -> Unit {
    Unit::new(NodeKind::Article, format!("{law}::{article}"))
        .with_parent(law)
        .with_title(title)
}

fn paragraph_unit(full_id: &str, parent: &str, order: i64, content: &str) -> Unit {
    Unit::new(NodeKind::Paragraph, full_id)
        .with_parent(parent)
        .with_order(order)
        .with_content(content)
}

/// The three parsed documents of the reference corpus.
pub fn fixture_documents() -> Vec<Document> {
    vec![
        Document::new(
            STATUTE,
            vec![
                law_unit(STATUTE),
                article_unit(STATUTE, "제12조", "용도변경"),
                paragraph_unit(P_STATUTE, "건축법::제12조", 1, C_STATUTE),
            ],
        ),
        Document::new(
            DECREE,
            vec![
                law_unit(DECREE),
                article_unit(DECREE, "제15조", "용도변경의 절차"),
                paragraph_unit(P_DECREE_1, "건축법 시행령::제15조", 1, C_DECREE_1),
                paragraph_unit(P_DECREE_2, "건축법 시행령::제15조", 2, C_DECREE_2),
            ],
        ),
        Document::new(
            RULE,
            vec![
                law_unit(RULE),
                article_unit(RULE, "제8조", "용도변경 신청"),
                paragraph_unit(P_RULE, "건축법 시행규칙::제8조", 1, C_RULE),
            ],
        ),
    ]
}

/// Store seeded with the reference corpus, embeddings written directly
/// (without going through the ingestion pipeline).
pub async fn fixture_store() -> Arc<SqliteStore> {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    for document in fixture_documents() {
        store.insert_document(&document).await.unwrap();
    }
    store.link_implements(DECREE, STATUTE).await.unwrap();
    store.link_implements(RULE, DECREE).await.unwrap();

    let vectors = fixture_vectors();
    for (id, content) in [
        (P_STATUTE, C_STATUTE),
        (P_DECREE_1, C_DECREE_1),
        (P_DECREE_2, C_DECREE_2),
        (P_RULE, C_RULE),
    ] {
        store
            .set_paragraph_embedding(&UnitId::from(id), &vectors[content])
            .await
            .unwrap();
    }
    store
}
