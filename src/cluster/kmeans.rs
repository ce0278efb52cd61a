//! Spherical k-means over paragraph embeddings
//!
//! Assignment is by maximum cosine similarity; centroids stay arithmetic
//! means so the mean-of-members invariant holds for every published domain.
//! Runs on the blocking pool — callers wrap it in `spawn_blocking`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::embedding::cosine_similarity;

/// Clustering outcome: per-vector cluster index plus the cluster means.
#[derive(Debug, Clone)]
pub(crate) struct KMeansOutcome {
    pub centroids: Vec<Vec<f32>>,
    pub assignments: Vec<usize>,
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    // Degenerate vectors are maximally distant rather than NaN
    cosine_similarity(a, b).map_or(1.0, |sim| (1.0 - sim).max(0.0))
}

fn mean_of(vectors: &[Vec<f32>], members: &[usize], dimension: usize) -> Vec<f32> {
    let mut mean = vec![0.0; dimension];
    if members.is_empty() {
        return mean;
    }
    for &i in members {
        for (m, x) in mean.iter_mut().zip(vectors[i].iter()) {
            *m += x;
        }
    }
    let n = members.len() as f32;
    for m in mean.iter_mut() {
        *m /= n;
    }
    mean
}

/// k-means++ seeding: spread initial centroids by squared cosine distance.
fn seed_centroids(vectors: &[Vec<f32>], k: usize, rng: &mut StdRng) -> Vec<Vec<f32>> {
    let mut centroids: Vec<Vec<f32>> = Vec::with_capacity(k);
    centroids.push(vectors[rng.gen_range(0..vectors.len())].clone());

    while centroids.len() < k {
        let weights: Vec<f32> = vectors
            .iter()
            .map(|v| {
                centroids
                    .iter()
                    .map(|c| cosine_distance(v, c))
                    .fold(f32::MAX, f32::min)
                    .powi(2)
            })
            .collect();
        let total: f32 = weights.iter().sum();
        if total <= f32::EPSILON {
            // All points coincide with a centroid; fill arbitrarily
            centroids.push(vectors[rng.gen_range(0..vectors.len())].clone());
            continue;
        }
        let mut draw = rng.gen_range(0.0..total);
        let mut chosen = vectors.len() - 1;
        for (i, w) in weights.iter().enumerate() {
            if draw < *w {
                chosen = i;
                break;
            }
            draw -= w;
        }
        centroids.push(vectors[chosen].clone());
    }
    centroids
}

/// Cluster `vectors` into (at most) `k` groups.
///
/// `k` is clamped to the vector count. Deterministic for a given seed.
pub(crate) fn kmeans(vectors: &[Vec<f32>], k: usize, max_iters: usize, seed: u64) -> KMeansOutcome {
    assert!(!vectors.is_empty(), "kmeans requires at least one vector");
    let k = k.clamp(1, vectors.len());
    let dimension = vectors[0].len();
    let mut rng = StdRng::seed_from_u64(seed);

    let mut centroids = seed_centroids(vectors, k, &mut rng);
    let mut assignments = vec![0usize; vectors.len()];

    for _ in 0..max_iters {
        let mut changed = false;
        for (i, v) in vectors.iter().enumerate() {
            let mut best = 0usize;
            let mut best_distance = f32::MAX;
            for (c, centroid) in centroids.iter().enumerate() {
                let d = cosine_distance(v, centroid);
                if d < best_distance {
                    best_distance = d;
                    best = c;
                }
            }
            if assignments[i] != best {
                assignments[i] = best;
                changed = true;
            }
        }

        let mut members: Vec<Vec<usize>> = vec![Vec::new(); k];
        for (i, &c) in assignments.iter().enumerate() {
            members[c].push(i);
        }
        // Reseed empty clusters with the point farthest from its centroid
        for c in 0..k {
            if members[c].is_empty() {
                let (farthest, _) = assignments
                    .iter()
                    .enumerate()
                    .map(|(i, &a)| (i, cosine_distance(&vectors[i], &centroids[a])))
                    .max_by(|a, b| a.1.total_cmp(&b.1))
                    .unwrap_or((0, 0.0));
                let previous = assignments[farthest];
                members[previous].retain(|&i| i != farthest);
                assignments[farthest] = c;
                members[c].push(farthest);
                changed = true;
            }
        }
        for c in 0..k {
            centroids[c] = mean_of(vectors, &members[c], dimension);
        }

        if !changed {
            break;
        }
    }

    KMeansOutcome {
        centroids,
        assignments,
    }
}

/// Centroid-based silhouette: one pass over the vectors, no pairwise matrix.
///
/// `a` is the distance to the own centroid, `b` the distance to the nearest
/// other centroid. Returns 0 for a single cluster.
pub(crate) fn centroid_silhouette(vectors: &[Vec<f32>], outcome: &KMeansOutcome) -> f32 {
    let k = outcome.centroids.len();
    if k < 2 || vectors.is_empty() {
        return 0.0;
    }
    let mut total = 0.0;
    for (i, v) in vectors.iter().enumerate() {
        let own = outcome.assignments[i];
        let a = cosine_distance(v, &outcome.centroids[own]);
        let b = outcome
            .centroids
            .iter()
            .enumerate()
            .filter(|(c, _)| *c != own)
            .map(|(_, centroid)| cosine_distance(v, centroid))
            .fold(f32::MAX, f32::min);
        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }
    total / vectors.len() as f32
}

/// Sweep k over an inclusive range and keep the best-silhouette outcome.
pub(crate) fn sweep_k(
    vectors: &[Vec<f32>],
    k_min: usize,
    k_max: usize,
    max_iters: usize,
    seed: u64,
) -> KMeansOutcome {
    let k_max = k_max.min(vectors.len()).max(1);
    let k_min = k_min.min(k_max).max(1);

    let mut best: Option<(f32, KMeansOutcome)> = None;
    for k in k_min..=k_max {
        let outcome = kmeans(vectors, k, max_iters, seed);
        let score = centroid_silhouette(vectors, &outcome);
        if best.as_ref().map_or(true, |(s, _)| score > *s) {
            best = Some((score, outcome));
        }
    }
    best.map(|(_, outcome)| outcome)
        .unwrap_or_else(|| kmeans(vectors, 1, max_iters, seed))
}
