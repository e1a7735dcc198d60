//! Cluster-quantization engine: coarse partitioning + product quantization.
//!
//! Training learns `clusters` coarse centroids over the batch, then one
//! 256-entry codebook per PQ segment over the residuals (vector minus its
//! assigned centroid). Committed vectors live in per-centroid inverted lists
//! as (identifier, PQ code) pairs. Search probes the lists whose centroids
//! are nearest the query and ranks candidates by asymmetric distance: the
//! exact query residual against each code through a precomputed table.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::config::{BackendConfig, BackendKind};
use crate::distance::l2_squared;
use crate::error::{AnnError, AnnResult};
use crate::kmeans::{nearest_centroid, train_centroids, KMeansConfig};
use crate::traits::{SearchHit, VectorBackend};

/// Maximum centroids per PQ codebook (codes are single bytes).
const PQ_CODEBOOK_SIZE: usize = 256;

/// Number of inverted lists probed per search.
const DEFAULT_NPROBE: usize = 8;

/// Seed for the coarse and codebook k-means runs.
const TRAIN_SEED: u64 = 0xDEAD_BEEF;

// ============================================================================
// IvfPqIndex
// ============================================================================

/// One inverted list: identifiers and PQ codes of the vectors assigned to a
/// coarse centroid, in commit order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Encode, Decode)]
struct InvertedList {
    ids: Vec<u64>,
    codes: Vec<Vec<u8>>,
}

/// The cluster-quantization engine.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct IvfPqIndex {
    dimension: usize,
    clusters: usize,
    sub_vectors: usize,
    nprobe: usize,
    trained: bool,
    coarse_centroids: Vec<Vec<f32>>,
    /// `codebooks[segment][code]` = residual sub-space centroid.
    codebooks: Vec<Vec<Vec<f32>>>,
    /// Parallel to `coarse_centroids`.
    lists: Vec<InvertedList>,
    count: u64,
}

impl IvfPqIndex {
    /// Create an untrained engine.
    ///
    /// `sub_vectors` must divide `dimension` evenly.
    pub fn new(dimension: usize, clusters: usize, sub_vectors: usize) -> AnnResult<Self> {
        BackendConfig::IvfPq {
            clusters,
            sub_vectors,
        }
        .validate(dimension)?;

        Ok(Self {
            dimension,
            clusters,
            sub_vectors,
            nprobe: DEFAULT_NPROBE,
            trained: false,
            coarse_centroids: Vec::new(),
            codebooks: Vec::new(),
            lists: Vec::new(),
            count: 0,
        })
    }

    /// Set the number of inverted lists probed per search.
    pub fn with_nprobe(mut self, nprobe: usize) -> Self {
        self.nprobe = nprobe.max(1);
        self
    }

    /// Coarse centroid count actually trained.
    ///
    /// Lower than the configured cluster count when the training batch was
    /// undersized and the count was corrected.
    pub fn coarse_cluster_count(&self) -> usize {
        self.coarse_centroids.len()
    }

    fn sub_dim(&self) -> usize {
        self.dimension / self.sub_vectors
    }

    fn check_batch(&self, batch: &[Vec<f32>]) -> AnnResult<()> {
        for vector in batch {
            if vector.len() != self.dimension {
                return Err(AnnError::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
        }
        Ok(())
    }

    /// Encode a residual as one codebook index per segment.
    fn encode_residual(&self, residual: &[f32]) -> AnnResult<Vec<u8>> {
        let sub = self.sub_dim();
        let mut code = Vec::with_capacity(self.sub_vectors);
        for (segment, codebook) in self.codebooks.iter().enumerate() {
            let start = segment * sub;
            let slice = &residual[start..start + sub];
            let (idx, _) = nearest_centroid(codebook, slice)
                .ok_or_else(|| AnnError::internal("trained index has an empty codebook"))?;
            code.push(idx as u8);
        }
        Ok(code)
    }

    /// Distances from each residual segment to every codebook entry.
    ///
    /// `table[segment][code]` = squared distance; summing one entry per
    /// segment gives the asymmetric distance to a stored code.
    fn distance_table(&self, residual: &[f32]) -> Vec<Vec<f32>> {
        let sub = self.sub_dim();
        let mut table = Vec::with_capacity(self.codebooks.len());
        for (segment, codebook) in self.codebooks.iter().enumerate() {
            let start = segment * sub;
            let slice = &residual[start..start + sub];
            table.push(codebook.iter().map(|c| l2_squared(c, slice)).collect());
        }
        table
    }
}

/// Element-wise `vector − centroid`.
fn residual(vector: &[f32], centroid: &[f32]) -> Vec<f32> {
    vector.iter().zip(centroid.iter()).map(|(v, c)| v - c).collect()
}

impl VectorBackend for IvfPqIndex {
    fn kind(&self) -> BackendKind {
        BackendKind::IvfPq
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn is_trained(&self) -> bool {
        self.trained
    }

    fn train(&mut self, batch: &[Vec<f32>]) -> AnnResult<()> {
        if self.trained {
            debug!("index already trained; skipping training run");
            return Ok(());
        }
        if batch.is_empty() {
            return Err(AnnError::training("cannot train on an empty batch"));
        }
        self.check_batch(batch)?;

        // Undersized batches train fewer, coarser clusters instead of failing.
        let mut clusters = self.clusters;
        if batch.len() < clusters {
            clusters = ((batch.len() as f64).sqrt().floor() as usize).max(1);
            info!(
                configured = self.clusters,
                effective = clusters,
                batch = batch.len(),
                "adjusting cluster count for undersized training batch"
            );
        }

        let refs: Vec<&[f32]> = batch.iter().map(|v| v.as_slice()).collect();
        let coarse = train_centroids(&refs, &KMeansConfig::new(clusters).with_seed(TRAIN_SEED))?;

        // Codebooks are trained on residuals against the assigned centroid.
        let mut residuals = Vec::with_capacity(batch.len());
        for vector in batch {
            let (idx, _) = nearest_centroid(&coarse, vector)
                .ok_or_else(|| AnnError::training("coarse training produced no centroids"))?;
            residuals.push(residual(vector, &coarse[idx]));
        }

        let sub = self.sub_dim();
        let mut codebooks = Vec::with_capacity(self.sub_vectors);
        for segment in 0..self.sub_vectors {
            let start = segment * sub;
            let slices: Vec<&[f32]> = residuals.iter().map(|r| &r[start..start + sub]).collect();
            let k = PQ_CODEBOOK_SIZE.min(slices.len());
            let codebook = train_centroids(
                &slices,
                &KMeansConfig::new(k).with_seed(TRAIN_SEED + 1 + segment as u64),
            )?;
            codebooks.push(codebook);
        }

        self.lists = vec![InvertedList::default(); coarse.len()];
        self.coarse_centroids = coarse;
        self.codebooks = codebooks;
        self.trained = true;
        info!(
            clusters = self.coarse_centroids.len(),
            segments = self.sub_vectors,
            "cluster-quantization index trained"
        );
        Ok(())
    }

    fn add(&mut self, batch: &[Vec<f32>]) -> AnnResult<()> {
        if !self.trained {
            return Err(AnnError::UntrainedIndex);
        }
        if batch.is_empty() {
            return Err(AnnError::add("cannot add an empty batch"));
        }
        self.check_batch(batch)?;

        for vector in batch {
            let (list_idx, _) = nearest_centroid(&self.coarse_centroids, vector)
                .ok_or_else(|| AnnError::internal("trained index has no coarse centroids"))?;
            let code = self.encode_residual(&residual(vector, &self.coarse_centroids[list_idx]))?;
            let id = self.count;
            self.lists[list_idx].ids.push(id);
            self.lists[list_idx].codes.push(code);
            self.count += 1;
        }
        trace!(
            added = batch.len(),
            total = self.count,
            "committed batch to inverted lists"
        );
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> AnnResult<Vec<SearchHit>> {
        if self.count == 0 {
            return Err(AnnError::EmptyIndex);
        }
        if query.len() != self.dimension {
            return Err(AnnError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        // Probe the lists whose centroids are nearest the query.
        let mut ranked: Vec<(usize, f32)> = self
            .coarse_centroids
            .iter()
            .enumerate()
            .map(|(idx, c)| (idx, l2_squared(c, query)))
            .collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        let nprobe = self.nprobe.min(ranked.len());

        let mut hits: Vec<SearchHit> = Vec::new();
        for &(list_idx, _) in ranked.iter().take(nprobe) {
            let list = &self.lists[list_idx];
            if list.ids.is_empty() {
                continue;
            }
            let table = self.distance_table(&residual(query, &self.coarse_centroids[list_idx]));
            for (id, code) in list.ids.iter().zip(list.codes.iter()) {
                let mut dist = 0.0f32;
                for (segment, &c) in code.iter().enumerate() {
                    dist += table[segment][c as usize];
                }
                hits.push(SearchHit::new(*id, dist));
            }
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }

    fn item_count(&self) -> u64 {
        self.count
    }

    fn reset(&mut self) {
        self.trained = false;
        self.coarse_centroids.clear();
        self.codebooks.clear();
        self.lists.clear();
        self.count = 0;
        debug!("cluster-quantization index reset");
    }

    fn serialize(&self) -> AnnResult<Vec<u8>> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| AnnError::codec(format!("failed to encode index state: {}", e)))
    }

    fn deserialize(&mut self, bytes: &[u8]) -> AnnResult<()> {
        let (decoded, _): (IvfPqIndex, usize) =
            bincode::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| AnnError::codec(format!("failed to decode index state: {}", e)))?;
        if decoded.dimension != self.dimension {
            return Err(AnnError::codec(format!(
                "artifact dimension {} does not match configured dimension {}",
                decoded.dimension, self.dimension
            )));
        }
        *self = decoded;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
