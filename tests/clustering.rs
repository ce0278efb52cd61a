//! Partition lifecycle under synthetic load

mod common;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;

use common::*;
use lexgraph::{
    cosine_similarity, Document, DomainClusterer, GraphStore, LexGraphConfig, NodeKind, NoopNamer,
    OpenStore, SqliteStore, Unit, UnitId,
};

/// 1200 paragraphs in one law, drawn from two latent directions.
async fn synthetic_load(n: usize) -> (Arc<SqliteStore>, Vec<(UnitId, Vec<f32>)>) {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let mut units = vec![
        Unit::new(NodeKind::Law, "국토계획법"),
        Unit::new(NodeKind::Article, "국토계획법::제1조").with_parent("국토계획법"),
    ];
    for i in 0..n {
        units.push(
            Unit::new(NodeKind::Paragraph, format!("국토계획법::제1조::{i}"))
                .with_parent("국토계획법::제1조")
                .with_order(i as i64)
                .with_content(format!("제1조 {i}항 내용")),
        );
    }
    store
        .insert_document(&Document::new("국토계획법", units))
        .await
        .unwrap();

    let mut rng = StdRng::seed_from_u64(91);
    let mut embeddings = Vec::with_capacity(n);
    for i in 0..n {
        let jitter: f32 = rng.gen_range(0.0..0.05);
        let v = if i % 2 == 0 {
            vec![1.0, jitter, rng.gen_range(0.0..0.05), 0.0]
        } else {
            vec![jitter, 1.0, 0.0, rng.gen_range(0.0..0.05)]
        };
        let id = UnitId::from(format!("국토계획법::제1조::{i}"));
        store.set_paragraph_embedding(&id, &v).await.unwrap();
        embeddings.push((id, v));
    }
    (store, embeddings)
}

fn load_config() -> LexGraphConfig {
    LexGraphConfig {
        node_embedding_dim: 4,
        relation_embedding_dim: 4,
        // Everything lands in one over-admitting domain, split bounds chosen
        // so one k=2 split settles the partition
        domain_similarity_threshold: 0.0,
        min_agent_size: 50,
        max_agent_size: 1000,
        ..Default::default()
    }
}

// === Scenario: 1200 paragraphs split exactly once, then stay put ===

#[tokio::test]
async fn synthetic_load_splits_once_and_stabilizes() {
    let (store, embeddings) = synthetic_load(1200).await;
    let clusterer = DomainClusterer::new(store, Arc::new(NoopNamer), load_config());

    clusterer.assign_batch(embeddings.clone()).await.unwrap();
    assert_eq!(clusterer.snapshot().len(), 1);
    assert!(clusterer.needs_rebalance());

    let first = clusterer.rebalance_all_domains().await.unwrap();
    assert_eq!(first.splits, 1);
    assert_eq!(first.merges, 0);

    let snapshot = clusterer.snapshot();
    assert_eq!(snapshot.len(), 2);
    for domain in snapshot.domains() {
        assert!(domain.size() >= 50 && domain.size() <= 1000);
    }
    assert!(!clusterer.needs_rebalance());

    // Second rebalance with no ingestion in between is a no-op
    let second = clusterer.rebalance_all_domains().await.unwrap();
    assert_eq!(second.splits, 0);
    assert_eq!(second.merges, 0);
}

// === Invariant: every embedded paragraph sits in exactly one domain ===

#[tokio::test]
async fn partition_covers_every_paragraph_exactly_once() {
    let (store, embeddings) = synthetic_load(300).await;
    let clusterer = DomainClusterer::new(store, Arc::new(NoopNamer), load_config());
    clusterer.assign_batch(embeddings.clone()).await.unwrap();
    clusterer.rebalance_all_domains().await.unwrap();

    let snapshot = clusterer.snapshot();
    let mut seen: HashMap<UnitId, usize> = HashMap::new();
    for domain in snapshot.domains() {
        for member in &domain.node_ids {
            *seen.entry(member.clone()).or_default() += 1;
        }
    }
    assert_eq!(seen.len(), embeddings.len());
    assert!(seen.values().all(|&count| count == 1));
    // Membership index agrees with the domain sets
    for (id, _) in &embeddings {
        assert!(snapshot.domain_of(id).is_some());
    }
}

// === Invariant: centroids track the member mean through the lifecycle ===

#[tokio::test]
async fn centroids_stay_member_means_after_rebalance() {
    let (store, embeddings) = synthetic_load(400).await;
    let by_id: HashMap<UnitId, Vec<f32>> = embeddings.iter().cloned().collect();
    let clusterer = DomainClusterer::new(store, Arc::new(NoopNamer), load_config());
    clusterer.assign_batch(embeddings).await.unwrap();
    clusterer.rebalance_all_domains().await.unwrap();

    for domain in clusterer.snapshot().domains() {
        let mut mean = vec![0.0f32; 4];
        for member in &domain.node_ids {
            for (m, x) in mean.iter_mut().zip(by_id[member].iter()) {
                *m += x;
            }
        }
        for m in mean.iter_mut() {
            *m /= domain.size() as f32;
        }
        for (c, m) in domain.centroid.iter().zip(mean.iter()) {
            assert!((c - m).abs() < 1e-3, "centroid drifted from member mean");
        }
        // And the centroid points where its members point
        for member in domain.node_ids.iter().take(5) {
            let sim = cosine_similarity(&by_id[member], &domain.centroid).unwrap();
            assert!(sim > 0.5);
        }
    }
}

// === Scenario: split respects the two latent directions ===

#[tokio::test]
async fn split_separates_the_latent_directions() {
    let (store, embeddings) = synthetic_load(200).await;
    let clusterer = DomainClusterer::new(
        store,
        Arc::new(NoopNamer),
        LexGraphConfig {
            max_agent_size: 150,
            min_agent_size: 10,
            ..load_config()
        },
    );
    clusterer.assign_batch(embeddings).await.unwrap();
    clusterer.rebalance_all_domains().await.unwrap();

    let snapshot = clusterer.snapshot();
    assert_eq!(snapshot.len(), 2);
    for domain in snapshot.domains() {
        // Members of one half all share a dominant axis
        let axis: Vec<usize> = domain
            .node_ids
            .iter()
            .map(|id| {
                let suffix: usize = id
                    .as_str()
                    .rsplit("::")
                    .next()
                    .unwrap()
                    .parse()
                    .unwrap();
                suffix % 2
            })
            .collect();
        assert!(
            axis.iter().all(|&a| a == axis[0]),
            "split mixed the latent directions"
        );
    }
}
