//! Self-organizing domain clustering
//!
//! Partitions embedded paragraphs into domains with mean-embedding centroids.
//! The domain map is published as an immutable snapshot behind a read lock:
//! readers clone the `Arc` and never block writers; mutators build a new map
//! off to the side and swap it in atomically, so concurrent queries observe
//! either the pre- or post-rebalance partition, never a half-rebalanced one.
//! Every mutation is mirrored into the graph store for observability.

mod kmeans;
mod naming;

pub use naming::{DomainNamer, NamingError, NoopNamer};

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

use crate::config::LexGraphConfig;
use crate::embedding::cosine_similarity;
use crate::error::RetrievalResult;
use crate::graph::{Domain, DomainId, UnitId};
use crate::store::GraphStore;
use kmeans::{kmeans, sweep_k};

/// Fixed seed so repeated bootstraps over the same corpus agree.
const CLUSTER_SEED: u64 = 0x5eed;
const KMEANS_MAX_ITERS: usize = 50;
/// Sample texts handed to the naming collaborator per domain.
const NAMING_SAMPLES: usize = 5;

/// Immutable snapshot of the domain partition.
#[derive(Debug, Clone, Default)]
pub struct DomainMap {
    domains: HashMap<DomainId, Domain>,
    members: HashMap<UnitId, DomainId>,
}

impl DomainMap {
    /// Build a snapshot from externally managed domains, e.g. re-hydrated
    /// from the store mirror at startup.
    pub fn from_domains(domains: Vec<Domain>) -> Self {
        let mut map = Self::default();
        for domain in domains {
            map.insert_domain(domain);
        }
        map
    }

    pub fn domains(&self) -> impl Iterator<Item = &Domain> {
        self.domains.values()
    }

    pub fn get(&self, id: &DomainId) -> Option<&Domain> {
        self.domains.get(id)
    }

    /// The domain a paragraph belongs to, if any.
    pub fn domain_of(&self, unit: &UnitId) -> Option<&DomainId> {
        self.members.get(unit)
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Domain ids in sorted order, for deterministic iteration.
    fn sorted_ids(&self) -> Vec<DomainId> {
        let mut ids: Vec<DomainId> = self.domains.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn insert_domain(&mut self, domain: Domain) {
        for member in &domain.node_ids {
            self.members.insert(member.clone(), domain.id.clone());
        }
        self.domains.insert(domain.id.clone(), domain);
    }

    fn remove_domain(&mut self, id: &DomainId) -> Option<Domain> {
        let domain = self.domains.remove(id)?;
        for member in &domain.node_ids {
            self.members.remove(member);
        }
        Some(domain)
    }

    fn add_member(&mut self, domain_id: &DomainId, unit: UnitId, embedding: &[f32]) {
        if let Some(domain) = self.domains.get_mut(domain_id) {
            domain.fold_into_centroid(embedding);
            domain.node_ids.insert(unit.clone());
            self.members.insert(unit, domain_id.clone());
        }
    }
}

/// Outcome of an assignment batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssignmentReport {
    pub assigned: usize,
    pub new_domains: usize,
}

/// Outcome of a full rebalance pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct RebalanceReport {
    pub splits: usize,
    pub merges: usize,
    pub neighbor_pairs: usize,
}

/// Owns the domain partition and its lifecycle.
pub struct DomainClusterer {
    store: Arc<dyn GraphStore>,
    namer: Arc<dyn DomainNamer>,
    config: LexGraphConfig,
    map: RwLock<Arc<DomainMap>>,
    /// Serializes mutators; readers never take it.
    mutate: tokio::sync::Mutex<()>,
    /// Assignments queued or in flight; rebalance yields above the threshold.
    pending_assignments: AtomicUsize,
}

impl DomainClusterer {
    pub fn new(
        store: Arc<dyn GraphStore>,
        namer: Arc<dyn DomainNamer>,
        config: LexGraphConfig,
    ) -> Self {
        Self {
            store,
            namer,
            config,
            map: RwLock::new(Arc::new(DomainMap::default())),
            mutate: tokio::sync::Mutex::new(()),
            pending_assignments: AtomicUsize::new(0),
        }
    }

    /// The current partition snapshot. Cheap; never blocks on mutators
    /// beyond the swap itself.
    pub fn snapshot(&self) -> Arc<DomainMap> {
        self.map.read().unwrap().clone()
    }

    /// Adopt an externally built partition, replacing the current one.
    /// Used to restore the store-mirrored partition at startup.
    pub fn install(&self, map: DomainMap) {
        self.publish(map);
    }

    fn publish(&self, map: DomainMap) {
        *self.map.write().unwrap() = Arc::new(map);
    }

    /// True when any domain sits outside its size bounds.
    pub fn needs_rebalance(&self) -> bool {
        let snapshot = self.snapshot();
        let result = snapshot.domains().any(|d| {
            d.phase(self.config.min_agent_size, self.config.max_agent_size)
                != crate::graph::DomainPhase::Stable
        });
        result
    }

    async fn yield_to_assignments(&self) {
        if self.pending_assignments.load(Ordering::Relaxed) > self.config.rebalance_yield_threshold
        {
            tokio::task::yield_now().await;
        }
    }

    /// Up to `NAMING_SAMPLES` member texts, centroid-nearest first when
    /// embeddings are at hand, in id order otherwise.
    async fn sample_contents(
        &self,
        domain: &Domain,
        embeddings: Option<&HashMap<UnitId, Vec<f32>>>,
    ) -> Vec<String> {
        let mut ranked: Vec<&UnitId> = domain.node_ids.iter().collect();
        match embeddings {
            Some(map) => ranked.sort_by(|a, b| {
                let sim = |id: &UnitId| {
                    map.get(id)
                        .and_then(|e| cosine_similarity(e, &domain.centroid))
                        .unwrap_or(-1.0)
                };
                sim(b).total_cmp(&sim(a)).then_with(|| a.cmp(b))
            }),
            None => ranked.sort(),
        }
        let mut samples = Vec::new();
        for id in ranked.into_iter().take(NAMING_SAMPLES) {
            match self.store.paragraph_info(id).await {
                Ok(Some(info)) => samples.push(info.content),
                Ok(None) => {}
                // Naming is advisory; a store hiccup must not fail clustering
                Err(err) => {
                    debug!(error = %err, "skipping naming sample");
                    break;
                }
            }
        }
        samples
    }

    /// Ask the naming collaborator; keep the uuid-derived name on failure.
    async fn advisory_name(
        &self,
        domain: &mut Domain,
        embeddings: Option<&HashMap<UnitId, Vec<f32>>>,
    ) {
        let samples = self.sample_contents(domain, embeddings).await;
        if let Ok(name) = self.namer.name_domain(&samples).await {
            if !name.trim().is_empty() {
                domain.name = name;
            }
        }
    }

    /// Assign one newly embedded paragraph, creating a domain if nothing is
    /// similar enough. Returns the domain it landed in.
    pub async fn assign_paragraph(
        &self,
        id: UnitId,
        embedding: Vec<f32>,
    ) -> RetrievalResult<DomainId> {
        let unit = id.clone();
        self.assign_batch(vec![(id, embedding)]).await?;
        let snapshot = self.snapshot();
        snapshot
            .domain_of(&unit)
            .cloned()
            .ok_or_else(|| crate::error::RetrievalError::ConfigInvalid(
                "paragraph embedding was degenerate and could not be assigned".into(),
            ))
    }

    /// Assign a batch of newly embedded paragraphs.
    ///
    /// Already-assigned paragraphs are skipped, so re-ingesting a document
    /// leaves the partition unchanged. Mirror writes are batched per domain.
    pub async fn assign_batch(
        &self,
        paragraphs: Vec<(UnitId, Vec<f32>)>,
    ) -> RetrievalResult<AssignmentReport> {
        if paragraphs.is_empty() {
            return Ok(AssignmentReport::default());
        }
        let batch = paragraphs.len();
        self.pending_assignments.fetch_add(batch, Ordering::Relaxed);
        let result = self.assign_batch_inner(paragraphs).await;
        self.pending_assignments.fetch_sub(batch, Ordering::Relaxed);
        result
    }

    async fn assign_batch_inner(
        &self,
        paragraphs: Vec<(UnitId, Vec<f32>)>,
    ) -> RetrievalResult<AssignmentReport> {
        let _guard = self.mutate.lock().await;
        let mut working = (*self.snapshot()).clone();
        let mut report = AssignmentReport::default();
        // Mirror writes collected and flushed after the new map is built
        let mut assignments: Vec<(UnitId, DomainId, f32)> = Vec::new();
        let mut touched: HashSet<DomainId> = HashSet::new();
        let mut created: Vec<DomainId> = Vec::new();

        for (id, embedding) in paragraphs {
            if working.domain_of(&id).is_some() {
                continue;
            }
            if cosine_similarity(&embedding, &embedding).is_none() {
                warn!(target: "lexgraph::data_integrity", id = %id, "degenerate embedding, paragraph left inert");
                continue;
            }

            let mut best: Option<(DomainId, f32)> = None;
            for domain_id in working.sorted_ids() {
                let domain = working.get(&domain_id).unwrap();
                let Some(sim) = cosine_similarity(&embedding, &domain.centroid) else {
                    continue;
                };
                if best.as_ref().map_or(true, |(_, s)| sim > *s) {
                    best = Some((domain_id, sim));
                }
            }

            match best {
                Some((domain_id, sim)) if sim >= self.config.domain_similarity_threshold => {
                    working.add_member(&domain_id, id.clone(), &embedding);
                    assignments.push((id, domain_id.clone(), sim));
                    touched.insert(domain_id);
                }
                _ => {
                    let domain = Domain::seeded(id.clone(), embedding);
                    let domain_id = domain.id.clone();
                    working.insert_domain(domain);
                    assignments.push((id, domain_id.clone(), 1.0));
                    touched.insert(domain_id.clone());
                    created.push(domain_id);
                    report.new_domains += 1;
                }
            }
            report.assigned += 1;
        }

        // Advisory naming for new domains, before the mirror write
        for domain_id in &created {
            if let Some(domain) = working.domains.get(domain_id) {
                let mut named = domain.clone();
                self.advisory_name(&mut named, None).await;
                working.domains.insert(domain_id.clone(), named);
            }
        }

        self.publish(working.clone());

        for domain_id in &touched {
            if let Some(domain) = working.get(domain_id) {
                self.store.upsert_domain(domain).await?;
            }
        }
        for (unit, domain_id, sim) in &assignments {
            self.store
                .assign_paragraph_to_domain(unit, domain_id, *sim)
                .await?;
        }

        debug!(
            assigned = report.assigned,
            new_domains = report.new_domains,
            "assignment batch complete"
        );
        Ok(report)
    }

    /// Bulk initialization: k-means over every embedded paragraph with a
    /// one-pass silhouette sweep over a small k range. Returns the number of
    /// domains created.
    ///
    /// A no-op when domains already exist — in memory or in the store
    /// mirror. A mirror left by a previous process is adopted, never
    /// re-clustered over: re-clustering would mint fresh domain ids and
    /// orphan the persisted rows.
    pub async fn bootstrap(&self) -> RetrievalResult<usize> {
        let _guard = self.mutate.lock().await;
        if !self.snapshot().is_empty() {
            return Ok(0);
        }
        let mirrored = self.store.load_domains().await?;
        if !mirrored.is_empty() {
            info!(domains = mirrored.len(), "adopting mirrored partition from the store");
            self.publish(DomainMap::from_domains(mirrored));
            return Ok(0);
        }
        let embeddings = self.store.paragraph_embeddings().await?;
        if embeddings.is_empty() {
            return Ok(0);
        }

        let by_id: HashMap<UnitId, Vec<f32>> = embeddings.iter().cloned().collect();
        let (ids, vectors): (Vec<UnitId>, Vec<Vec<f32>>) = embeddings.into_iter().unzip();
        let (k_min, k_max) = (self.config.bootstrap_k_min, self.config.bootstrap_k_max);
        let outcome = tokio::task::spawn_blocking(move || {
            sweep_k(&vectors, k_min, k_max, KMEANS_MAX_ITERS, CLUSTER_SEED)
        })
        .await
        .expect("clustering task panicked");

        let mut working = DomainMap::default();
        let mut per_cluster: HashMap<usize, Vec<UnitId>> = HashMap::new();
        for (i, cluster) in outcome.assignments.iter().enumerate() {
            per_cluster.entry(*cluster).or_default().push(ids[i].clone());
        }

        let mut clusters: Vec<(usize, Vec<UnitId>)> = per_cluster.into_iter().collect();
        clusters.sort_by_key(|(c, _)| *c);
        for (cluster, members) in clusters {
            if members.is_empty() {
                continue;
            }
            let mut domain = Domain::with_centroid(outcome.centroids[cluster].clone());
            domain.node_ids = members.into_iter().collect();
            self.advisory_name(&mut domain, Some(&by_id)).await;
            working.insert_domain(domain);
        }
        let count = working.len();

        self.publish(working.clone());
        self.mirror_partition(&working, &by_id).await?;
        info!(domains = count, "bootstrap clustering complete");
        Ok(count)
    }

    /// Mirror every domain and membership of a partition into the store.
    async fn mirror_partition(
        &self,
        map: &DomainMap,
        embeddings: &HashMap<UnitId, Vec<f32>>,
    ) -> RetrievalResult<()> {
        for domain_id in map.sorted_ids() {
            let domain = map.get(&domain_id).unwrap();
            self.store.upsert_domain(domain).await?;
            for member in &domain.node_ids {
                let sim = embeddings
                    .get(member)
                    .and_then(|e| cosine_similarity(e, &domain.centroid))
                    .unwrap_or(0.0);
                self.store
                    .assign_paragraph_to_domain(member, &domain.id, sim)
                    .await?;
            }
        }
        Ok(())
    }

    /// Split oversized domains, merge undersized ones, rebuild adjacency.
    ///
    /// Expensive; meant for batch-completion or administrative invocation,
    /// not per query. Publishes the new partition atomically at the end.
    pub async fn rebalance_all_domains(&self) -> RetrievalResult<RebalanceReport> {
        let _guard = self.mutate.lock().await;
        let mut working = (*self.snapshot()).clone();
        let mut report = RebalanceReport::default();
        let embeddings: HashMap<UnitId, Vec<f32>> = self
            .store
            .paragraph_embeddings()
            .await?
            .into_iter()
            .collect();

        self.split_oversized(&mut working, &embeddings, &mut report)
            .await?;
        self.merge_undersized(&mut working, &embeddings, &mut report)
            .await?;
        report.neighbor_pairs = self.rebuild_adjacency(&mut working).await?;

        for domain_id in working.sorted_ids() {
            self.store
                .upsert_domain(working.get(&domain_id).unwrap())
                .await?;
        }
        self.publish(working);
        info!(
            splits = report.splits,
            merges = report.merges,
            neighbor_pairs = report.neighbor_pairs,
            "rebalance complete"
        );
        Ok(report)
    }

    async fn split_oversized(
        &self,
        working: &mut DomainMap,
        embeddings: &HashMap<UnitId, Vec<f32>>,
        report: &mut RebalanceReport,
    ) -> RetrievalResult<()> {
        let mut oversized: Vec<DomainId> = working
            .domains()
            .filter(|d| d.size() > self.config.max_agent_size)
            .map(|d| d.id.clone())
            .collect();
        oversized.sort();

        for domain_id in oversized {
            self.yield_to_assignments().await;
            let Some(old) = working.remove_domain(&domain_id) else {
                continue;
            };

            let mut members: Vec<UnitId> = old.node_ids.iter().cloned().collect();
            members.sort();
            let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(members.len());
            let mut kept: Vec<UnitId> = Vec::with_capacity(members.len());
            for member in members {
                match embeddings.get(&member) {
                    Some(v) => {
                        vectors.push(v.clone());
                        kept.push(member);
                    }
                    None => {
                        warn!(target: "lexgraph::data_integrity", id = %member, "member without embedding dropped during split");
                    }
                }
            }

            let outcome = tokio::task::spawn_blocking(move || {
                kmeans(&vectors, 2, KMEANS_MAX_ITERS, CLUSTER_SEED)
            })
            .await
            .expect("clustering task panicked");

            let mut halves = [
                Domain::with_centroid(outcome.centroids[0].clone()),
                Domain::with_centroid(outcome.centroids.get(1).cloned().unwrap_or_else(|| {
                    outcome.centroids[0].clone()
                })),
            ];
            for (member, cluster) in kept.into_iter().zip(outcome.assignments.iter()) {
                halves[(*cluster).min(1)].node_ids.insert(member);
            }

            self.store.delete_domain(&old.id).await?;
            for mut half in halves {
                if half.node_ids.is_empty() {
                    continue;
                }
                self.advisory_name(&mut half, Some(embeddings)).await;
                self.store.upsert_domain(&half).await?;
                for member in &half.node_ids {
                    let sim = embeddings
                        .get(member)
                        .and_then(|e| cosine_similarity(e, &half.centroid))
                        .unwrap_or(0.0);
                    self.store
                        .assign_paragraph_to_domain(member, &half.id, sim)
                        .await?;
                }
                working.insert_domain(half);
            }
            report.splits += 1;
            debug!(domain = %old.id, size = old.size(), "split oversized domain");
        }
        Ok(())
    }

    async fn merge_undersized(
        &self,
        working: &mut DomainMap,
        embeddings: &HashMap<UnitId, Vec<f32>>,
        report: &mut RebalanceReport,
    ) -> RetrievalResult<()> {
        loop {
            self.yield_to_assignments().await;
            let Some(smallest) = working
                .domains()
                .filter(|d| d.size() < self.config.min_agent_size)
                .min_by(|a, b| a.size().cmp(&b.size()).then_with(|| a.id.cmp(&b.id)))
                .map(|d| d.id.clone())
            else {
                break;
            };
            let source = working.get(&smallest).unwrap().clone();

            let mut target: Option<(DomainId, f32)> = None;
            for candidate_id in working.sorted_ids() {
                if candidate_id == smallest {
                    continue;
                }
                let candidate = working.get(&candidate_id).unwrap();
                if source.size() + candidate.size() > self.config.max_agent_size {
                    continue;
                }
                let Some(sim) = cosine_similarity(&source.centroid, &candidate.centroid) else {
                    continue;
                };
                if target.as_ref().map_or(true, |(_, s)| sim > *s) {
                    target = Some((candidate_id, sim));
                }
            }

            // No candidate keeps the merged size within bounds: stop merging
            let Some((target_id, _)) = target else { break };

            working.remove_domain(&smallest);
            let target_domain = working.domains.get_mut(&target_id).unwrap();
            let (n_t, n_s) = (target_domain.size() as f32, source.size() as f32);
            for (c, s) in target_domain
                .centroid
                .iter_mut()
                .zip(source.centroid.iter())
            {
                *c = (*c * n_t + s * n_s) / (n_t + n_s);
            }
            for member in &source.node_ids {
                target_domain.node_ids.insert(member.clone());
                working
                    .members
                    .insert(member.clone(), target_id.clone());
            }

            let merged = working.get(&target_id).unwrap().clone();
            self.store.delete_domain(&smallest).await?;
            self.store.upsert_domain(&merged).await?;
            for member in &source.node_ids {
                let sim = embeddings
                    .get(member)
                    .and_then(|e| cosine_similarity(e, &merged.centroid))
                    .unwrap_or(0.0);
                self.store
                    .assign_paragraph_to_domain(member, &target_id, sim)
                    .await?;
            }
            report.merges += 1;
            debug!(source = %smallest, target = %target_id, "merged undersized domain");
        }
        Ok(())
    }

    /// Count derived cross-law links between every domain pair; pairs at or
    /// above the neighbor threshold become bidirectional neighbors.
    async fn rebuild_adjacency(&self, working: &mut DomainMap) -> RetrievalResult<usize> {
        let laws = self.store.paragraph_laws().await?;
        let linked = self.store.linked_law_pairs().await?;

        // Per-domain histogram of member laws
        let ids = working.sorted_ids();
        let mut histograms: HashMap<DomainId, HashMap<&str, usize>> = HashMap::new();
        for id in &ids {
            let domain = working.get(id).unwrap();
            let mut hist: HashMap<&str, usize> = HashMap::new();
            for member in &domain.node_ids {
                if let Some(law) = laws.get(member) {
                    *hist.entry(law.as_str()).or_default() += 1;
                }
            }
            histograms.insert(id.clone(), hist);
        }

        for domain in working.domains.values_mut() {
            domain.neighbors.clear();
        }

        let mut pairs = 0usize;
        for (i, a) in ids.iter().enumerate() {
            for b in ids.iter().skip(i + 1) {
                let (ha, hb) = (&histograms[a], &histograms[b]);
                let mut count = 0usize;
                for (law_x, law_y) in &linked {
                    count += ha.get(law_x.as_str()).unwrap_or(&0)
                        * hb.get(law_y.as_str()).unwrap_or(&0);
                    count += ha.get(law_y.as_str()).unwrap_or(&0)
                        * hb.get(law_x.as_str()).unwrap_or(&0);
                }
                if count >= self.config.neighbor_threshold {
                    working
                        .domains
                        .get_mut(a)
                        .unwrap()
                        .neighbors
                        .insert(b.clone());
                    working
                        .domains
                        .get_mut(b)
                        .unwrap()
                        .neighbors
                        .insert(a.clone());
                    pairs += 1;
                }
            }
        }
        Ok(pairs)
    }
}
