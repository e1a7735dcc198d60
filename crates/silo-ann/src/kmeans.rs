//! Seeded k-means clustering used for coarse centroids and PQ codebooks.
//!
//! Initialization is k-means++ (distance-weighted sampling of initial
//! centroids), followed by Lloyd iterations: assign every vector to its
//! nearest centroid, then recompute each centroid as the mean of its bucket.
//! A fixed seed makes training deterministic, which the tests rely on.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::distance::l2_squared;
use crate::error::{AnnError, AnnResult};

/// Default number of Lloyd iterations.
pub const DEFAULT_MAX_ITERATIONS: usize = 25;

/// Configuration for a k-means training run.
#[derive(Debug, Clone)]
pub struct KMeansConfig {
    /// Number of centroids to produce.
    pub clusters: usize,
    /// Number of Lloyd iterations.
    pub max_iterations: usize,
    /// Seed for centroid initialization.
    pub seed: u64,
}

impl KMeansConfig {
    /// Create a configuration with the given cluster count.
    #[must_use]
    pub fn new(clusters: usize) -> Self {
        Self {
            clusters,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            seed: 0,
        }
    }

    /// Set the number of Lloyd iterations.
    #[must_use]
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Set the initialization seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Index of the centroid nearest to `vector`, with its squared distance.
///
/// Returns `None` when `centroids` is empty.
pub fn nearest_centroid(centroids: &[Vec<f32>], vector: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, centroid) in centroids.iter().enumerate() {
        let dist = l2_squared(centroid, vector);
        match best {
            Some((_, d)) if dist >= d => {}
            _ => best = Some((idx, dist)),
        }
    }
    best
}

/// Train `config.clusters` centroids over `vectors`.
///
/// The effective cluster count is clamped to the number of training vectors;
/// fewer distinct vectors than clusters is not an error, the surplus
/// centroids simply never materialize.
pub fn train_centroids(vectors: &[&[f32]], config: &KMeansConfig) -> AnnResult<Vec<Vec<f32>>> {
    if vectors.is_empty() {
        return Err(AnnError::training("cannot train on an empty batch"));
    }
    if config.clusters == 0 {
        return Err(AnnError::config("cluster count must be > 0"));
    }

    let k = config.clusters.min(vectors.len());
    let mut centroids = init_kmeans_pp(vectors, k, config.seed);

    for _ in 0..config.max_iterations.max(1) {
        // Assignment step.
        let mut buckets: Vec<Vec<&[f32]>> = vec![Vec::new(); centroids.len()];
        for vec in vectors {
            if let Some((idx, _)) = nearest_centroid(&centroids, vec) {
                buckets[idx].push(vec);
            }
        }

        // Update step. An empty bucket keeps its previous centroid.
        for (idx, bucket) in buckets.iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }
            let mut mean = vec![0.0f32; centroids[idx].len()];
            for vec in bucket {
                for (dst, &src) in mean.iter_mut().zip(vec.iter()) {
                    *dst += src;
                }
            }
            let inv = 1.0f32 / bucket.len() as f32;
            for value in mean.iter_mut() {
                *value *= inv;
            }
            centroids[idx] = mean;
        }
    }

    Ok(centroids)
}

/// k-means++ initialization: first centroid uniform, the rest sampled with
/// probability proportional to squared distance from the nearest chosen one.
fn init_kmeans_pp(vectors: &[&[f32]], k: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut centroids: Vec<Vec<f32>> = Vec::with_capacity(k);

    let first = rng.gen_range(0..vectors.len());
    centroids.push(vectors[first].to_vec());

    while centroids.len() < k {
        let mut weights = Vec::with_capacity(vectors.len());
        let mut total = 0.0f32;
        for vec in vectors {
            let mut best = f32::MAX;
            for centroid in &centroids {
                best = best.min(l2_squared(centroid, vec));
            }
            weights.push(best);
            total += best;
        }
        if total <= f32::EPSILON {
            // All remaining vectors coincide with chosen centroids.
            break;
        }
        let mut target = rng.gen::<f32>() * total;
        let mut chosen = vectors.len() - 1;
        for (idx, weight) in weights.iter().enumerate() {
            target -= *weight;
            if target <= 0.0 {
                chosen = idx;
                break;
            }
        }
        centroids.push(vectors[chosen].to_vec());
    }

    centroids
}

// ============================================================================
// Tests
// ============================================================================
